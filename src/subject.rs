//! The fan-out core: observer registry, price cache and the dispatcher
//! that merges the per-asset feeds into one ordered notification sequence.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinSet;
use tokio::time::Duration;
use tracing::{debug, info};

use crate::config::Endpoints;
use crate::feed::PriceFeed;
use crate::feed::task::run_reader;
use crate::observer::Observer;
use crate::types::{Asset, PriceUpdate, Tick};

pub struct Subject {
    // Insertion order is notification order.
    registry: RwLock<Vec<Arc<dyn Observer>>>,
    price_cache: DashMap<Asset, f64>,
    endpoints: Endpoints,
    reconnect_backoff: Duration,
}

impl Subject {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            registry: RwLock::new(Vec::new()),
            price_cache: DashMap::new(),
            endpoints,
            reconnect_backoff: Duration::from_millis(500),
        }
    }

    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    /// Always succeeds. Duplicate ids are not rejected.
    pub async fn attach(&self, observer: Arc<dyn Observer>) {
        let mut reg = self.registry.write().await;
        info!(observer = %observer.id(), position = reg.len(), "observer attached");
        reg.push(observer);
    }

    /// Removes the first observer with the same id; `false` if none matched.
    pub async fn detach(&self, observer: &dyn Observer) -> bool {
        self.detach_id(observer.id()).await
    }

    pub async fn detach_id(&self, id: &str) -> bool {
        let mut reg = self.registry.write().await;
        match reg.iter().position(|o| o.id() == id) {
            Some(i) => {
                reg.remove(i);
                info!(observer = %id, "observer detached");
                true
            }
            None => {
                debug!(observer = %id, "detach: observer not found");
                false
            }
        }
    }

    pub async fn observer_ids(&self) -> Vec<String> {
        self.registry
            .read()
            .await
            .iter()
            .map(|o| o.id().to_string())
            .collect()
    }

    pub async fn observer_count(&self) -> usize {
        self.registry.read().await.len()
    }

    pub fn price(&self, asset: Asset) -> Option<f64> {
        self.price_cache.get(&asset).map(|p| *p)
    }

    /// Deliver `update` to every observer subscribed to at least one of the
    /// assets it carries, in registry order. Returns how many were called.
    ///
    /// Returns once every `update` call has returned; writes those calls
    /// scheduled may still be running.
    pub async fn notify(&self, update: PriceUpdate) -> usize {
        let reg = self.registry.read().await;
        let mut notified = 0;
        for observer in reg.iter() {
            if observer.wants(&update) {
                observer.update(&update);
                notified += 1;
            }
        }
        notified
    }

    async fn dispatch(&self, tick: Tick) {
        self.price_cache.insert(tick.asset, tick.price);
        let notified = self.notify(PriceUpdate::single(tick.asset, tick.price)).await;
        debug!(
            asset = %tick.asset,
            price = tick.price,
            received_at = %tick.received_at,
            notified,
            "tick dispatched"
        );
    }

    /// Spawn one reader per asset and run the dispatcher on the current task.
    ///
    /// Each reader posts into its own single-slot channel; the dispatcher
    /// takes whichever is ready (`select!` picks randomly among ready
    /// branches, so no live feed starves). A slow `notify` stalls every
    /// reader once its slot is full.
    ///
    /// Returns when all readers have stopped. Dropping the future aborts
    /// the readers.
    pub async fn start_listening(self: Arc<Self>, feed: Arc<dyn PriceFeed>) {
        let (btc_tx, mut btc_rx) = mpsc::channel::<Tick>(1);
        let (eth_tx, mut eth_rx) = mpsc::channel::<Tick>(1);
        let (ada_tx, mut ada_rx) = mpsc::channel::<Tick>(1);

        let mut readers = JoinSet::new();
        for (asset, tx) in [(Asset::Btc, btc_tx), (Asset::Eth, eth_tx), (Asset::Ada, ada_tx)] {
            let feed = Arc::clone(&feed);
            let endpoint = self.endpoints.get(asset).to_string();
            let backoff = self.reconnect_backoff;
            readers.spawn(run_reader(feed, asset, endpoint, backoff, tx));
        }
        info!(feeds = readers.len(), "listening");

        loop {
            let tick = tokio::select! {
                Some(t) = btc_rx.recv() => t,
                Some(t) = eth_rx.recv() => t,
                Some(t) = ada_rx.recv() => t,
                else => break,
            };
            self.dispatch(tick).await;
        }

        while readers.join_next().await.is_some() {}
        info!("all feeds closed, dispatcher stopped");
    }
}
