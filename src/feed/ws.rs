use futures_util::{StreamExt, future, stream};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info};

use crate::error::FeedError;
use crate::feed::decode::decode_price;
use crate::feed::{PriceFeed, TickStream};
use crate::types::Asset;

/// Websocket trade stream, one connection per `open`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsFeed;

impl PriceFeed for WsFeed {
    fn open(&self, asset: Asset, endpoint: &str) -> TickStream {
        let endpoint = endpoint.to_string();
        stream::once(async move {
            let res = connect_async(endpoint.as_str()).await;
            match res {
                Ok((ws, _resp)) => {
                    info!(asset = %asset, endpoint = %endpoint, "feed connected");
                    ws.filter_map(move |msg| future::ready(classify(asset, msg)))
                        .boxed()
                }
                Err(e) => stream::once(future::ready(Err(FeedError::Connect {
                    endpoint,
                    reason: e.to_string(),
                })))
                .boxed(),
            }
        })
        .flatten()
        .boxed()
    }
}

// Control frames are answered by tungstenite itself; we only surface data
// and the conditions that end the stream.
fn classify(asset: Asset, msg: Result<Message, tungstenite::Error>) -> Option<Result<f64, FeedError>> {
    match msg {
        Ok(Message::Text(text)) => {
            debug!(asset = %asset, raw = %text.as_str(), "feed message");
            Some(decode_price(&text))
        }
        Ok(Message::Close(frame)) => {
            debug!(asset = %asset, ?frame, "feed close frame");
            Some(Err(FeedError::Closed))
        }
        Ok(_) => None,
        Err(e) => Some(Err(FeedError::Transport(e.to_string()))),
    }
}
