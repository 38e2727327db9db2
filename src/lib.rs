pub mod config;
pub mod error;
pub mod feed;
pub mod observer;
pub mod report;
pub mod signals;
pub mod snapshot;
pub mod state;
pub mod subject;
pub mod subscription;
pub mod types;

pub use observer::{Observer, PriceObserver};
pub use subject::Subject;
pub use types::{Asset, PriceUpdate, Tick};
