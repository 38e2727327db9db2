use dashmap::DashMap;
use std::collections::BTreeSet;
use tracing::info;

use crate::snapshot::SnapshotWriter;
use crate::subscription::ObserverSpec;
use crate::types::{Asset, PriceUpdate};

/// What the subject needs from a subscriber.
pub trait Observer: Send + Sync {
    /// Called by the subject only. Must not block on I/O.
    fn update(&self, update: &PriceUpdate);

    fn id(&self) -> &str;

    fn is_subscribed(&self, asset: Asset) -> bool;

    fn last_price(&self, asset: Asset) -> Option<f64>;

    /// True when at least one asset carried by `update` is subscribed.
    fn wants(&self, update: &PriceUpdate) -> bool {
        update.changed().any(|(asset, _)| self.is_subscribed(asset))
    }
}

/// The production subscriber: caches the latest prices and schedules a
/// chart snapshot for every subscribed asset that moved.
pub struct PriceObserver {
    id: String,
    subscriptions: BTreeSet<Asset>,
    last_prices: DashMap<Asset, f64>,
    writer: SnapshotWriter,
}

impl PriceObserver {
    pub fn new(id: impl Into<String>, subscriptions: BTreeSet<Asset>, writer: SnapshotWriter) -> Self {
        Self {
            id: id.into(),
            subscriptions,
            last_prices: DashMap::new(),
            writer,
        }
    }

    pub fn from_spec(spec: ObserverSpec, writer: SnapshotWriter) -> Self {
        Self::new(spec.id, spec.assets, writer)
    }

    pub fn subscriptions(&self) -> &BTreeSet<Asset> {
        &self.subscriptions
    }
}

impl Observer for PriceObserver {
    fn update(&self, update: &PriceUpdate) {
        for (asset, price) in update.changed() {
            self.last_prices.insert(asset, price);
        }

        for (asset, price) in update.changed() {
            if !self.is_subscribed(asset) {
                continue;
            }
            info!(observer = %self.id, asset = %asset, price, "price update");
            self.writer.schedule(asset, price, &self.id);
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn is_subscribed(&self, asset: Asset) -> bool {
        self.subscriptions.contains(&asset)
    }

    fn last_price(&self, asset: Asset) -> Option<f64> {
        self.last_prices.get(&asset).map(|p| *p)
    }
}
