use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};
use tracing::{info, warn};

use crate::feed::PriceFeed;
use crate::types::{Asset, Tick};

/// Read one asset's feed forever, posting every decoded price to `tx`.
///
/// Malformed messages are skipped. A failed or finished stream is reopened
/// after `backoff`. Returns only once the dispatcher has hung up.
pub async fn run_reader(
    feed: Arc<dyn PriceFeed>,
    asset: Asset,
    endpoint: String,
    backoff: Duration,
    tx: mpsc::Sender<Tick>,
) {
    loop {
        let mut ticks = feed.open(asset, &endpoint);
        let mut failed = false;

        while let Some(item) = ticks.next().await {
            match item {
                Ok(price) => {
                    // Blocks while the dispatcher is busy: this is the backpressure.
                    if tx.send(Tick::now(asset, price)).await.is_err() {
                        info!(asset = %asset, "dispatcher gone, reader stopping");
                        return;
                    }
                }
                Err(e) if !e.is_terminal() => {
                    warn!(asset = %asset, error = %e, "skipping malformed tick");
                }
                Err(e) => {
                    warn!(asset = %asset, error = %e, "feed failed (reconnect)");
                    failed = true;
                    break;
                }
            }
        }
        if !failed {
            info!(asset = %asset, "feed ended (reconnect)");
        }

        tokio::select! {
            _ = sleep(backoff) => {}
            _ = tx.closed() => {
                info!(asset = %asset, "dispatcher gone, reader stopping");
                return;
            }
        }
    }
}
