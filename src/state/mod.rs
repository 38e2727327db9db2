pub mod history;
pub mod shutdown;

pub use history::{PriceHistory, Sample};
pub use shutdown::{DrainState, OpGuard, ShutdownCoordinator};
