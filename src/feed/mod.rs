pub mod decode;
pub mod task;
pub mod ws;

use futures_util::stream::BoxStream;

use crate::error::FeedError;
use crate::types::Asset;

pub use ws::WsFeed;

/// Decoded prices for one asset. Items that are `Err` and terminal end the
/// stream; decode errors are reported in-line and reading continues.
pub type TickStream = BoxStream<'static, Result<f64, FeedError>>;

/// Source of price ticks. Each `open` is a fresh, non-restartable stream.
pub trait PriceFeed: Send + Sync + 'static {
    fn open(&self, asset: Asset, endpoint: &str) -> TickStream;
}
