use tracing::info;

use crate::state::{DrainState, PriceHistory};
use crate::subject::Subject;
use crate::types::Asset;

/// One line per asset: last cached price and how many samples made it
/// into the persisted history.
pub async fn log_summary(subject: &Subject, history: &PriceHistory, drain: DrainState) {
    info!(
        observers = subject.observer_count().await,
        active_ops = drain.active_ops,
        shutting_down = drain.shutting_down,
        "shutdown summary"
    );
    for asset in Asset::ALL {
        info!(
            asset = %asset,
            last_price = ?subject.price(asset),
            samples = history.len(asset),
            "series snapshot"
        );
    }
}
