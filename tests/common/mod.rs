#![allow(dead_code)]

use dashmap::DashMap;
use futures_util::{StreamExt, stream};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use tick_fanout::config::Endpoints;
use tick_fanout::error::{FeedError, RenderError};
use tick_fanout::feed::{PriceFeed, TickStream};
use tick_fanout::snapshot::{ChartRequest, Renderer, SnapshotWriter};
use tick_fanout::state::{PriceHistory, ShutdownCoordinator};
use tick_fanout::{Asset, Observer, PriceUpdate};

pub fn assets(list: &[Asset]) -> BTreeSet<Asset> {
    list.iter().copied().collect()
}

pub fn test_endpoints() -> Endpoints {
    Endpoints::new(HashMap::from([
        (Asset::Btc, "test://btc".to_string()),
        (Asset::Eth, "test://eth".to_string()),
        (Asset::Ada, "test://ada".to_string()),
    ]))
    .unwrap()
}

/// Poll `cond` until it holds, failing the test after two seconds.
pub async fn eventually<F: FnMut() -> bool>(what: &str, mut cond: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// == observers ==

pub struct RecordingObserver {
    id: String,
    subs: BTreeSet<Asset>,
    calls: Mutex<Vec<PriceUpdate>>,
    last: DashMap<Asset, f64>,
    order_log: Option<Arc<Mutex<Vec<String>>>>,
}

impl RecordingObserver {
    pub fn new(id: &str, subs: &[Asset]) -> Arc<Self> {
        Arc::new(Self::build(id, subs, None))
    }

    pub fn logging(id: &str, subs: &[Asset], log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self::build(id, subs, Some(log)))
    }

    fn build(id: &str, subs: &[Asset], order_log: Option<Arc<Mutex<Vec<String>>>>) -> Self {
        Self {
            id: id.to_string(),
            subs: assets(subs),
            calls: Mutex::new(Vec::new()),
            last: DashMap::new(),
            order_log,
        }
    }

    pub fn calls(&self) -> Vec<PriceUpdate> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Prices this observer saw for one asset, in delivery order.
    pub fn seen(&self, asset: Asset) -> Vec<f64> {
        self.calls().iter().filter_map(|u| u.get(asset)).collect()
    }
}

impl Observer for RecordingObserver {
    fn update(&self, update: &PriceUpdate) {
        for (asset, price) in update.changed() {
            self.last.insert(asset, price);
        }
        self.calls.lock().unwrap().push(*update);
        if let Some(log) = &self.order_log {
            log.lock().unwrap().push(self.id.clone());
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn is_subscribed(&self, asset: Asset) -> bool {
        self.subs.contains(&asset)
    }

    fn last_price(&self, asset: Asset) -> Option<f64> {
        self.last.get(&asset).map(|p| *p)
    }
}

/// Subscribed to everything; every `update` blocks its thread until the
/// gate is opened. Needs a multi-thread runtime.
pub struct GatedObserver {
    inner: RecordingObserver,
    entered: mpsc::UnboundedSender<PriceUpdate>,
    open: Arc<(Mutex<bool>, Condvar)>,
}

pub struct ObserverGate {
    pub entered: mpsc::UnboundedReceiver<PriceUpdate>,
    open: Arc<(Mutex<bool>, Condvar)>,
}

impl ObserverGate {
    pub fn open(&self) {
        let (lock, cvar) = &*self.open;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }
}

impl GatedObserver {
    pub fn new(id: &str) -> (Arc<Self>, ObserverGate) {
        let (entered_tx, entered_rx) = mpsc::unbounded_channel();
        let open = Arc::new((Mutex::new(false), Condvar::new()));
        let o = Arc::new(Self {
            inner: RecordingObserver::build(id, &Asset::ALL, None),
            entered: entered_tx,
            open: open.clone(),
        });
        (
            o,
            ObserverGate {
                entered: entered_rx,
                open,
            },
        )
    }

    pub fn calls(&self) -> Vec<PriceUpdate> {
        self.inner.calls()
    }

    pub fn call_count(&self) -> usize {
        self.inner.call_count()
    }

    pub fn seen(&self, asset: Asset) -> Vec<f64> {
        self.inner.seen(asset)
    }
}

impl Observer for GatedObserver {
    fn update(&self, update: &PriceUpdate) {
        self.inner.update(update);
        let _ = self.entered.send(*update);
        let (lock, cvar) = &*self.open;
        let mut open = lock.lock().unwrap();
        while !*open {
            open = cvar.wait(open).unwrap();
        }
    }

    fn id(&self) -> &str {
        self.inner.id()
    }

    fn is_subscribed(&self, asset: Asset) -> bool {
        self.inner.is_subscribed(asset)
    }

    fn last_price(&self, asset: Asset) -> Option<f64> {
        self.inner.last_price(asset)
    }
}

// == feeds ==

type Script = mpsc::UnboundedReceiver<Result<f64, FeedError>>;

/// Feed driven by the test: every asset gets one scripted stream. Reopening
/// an asset after its stream ended yields a stream that never produces.
pub struct ChannelFeed {
    scripts: Mutex<HashMap<Asset, Script>>,
    opens: Mutex<HashMap<Asset, usize>>,
    // Items each reader has taken off its script so far.
    pulled: Arc<DashMap<Asset, usize>>,
}

pub struct FeedHandles {
    senders: HashMap<Asset, mpsc::UnboundedSender<Result<f64, FeedError>>>,
}

impl FeedHandles {
    pub fn tick(&self, asset: Asset, price: f64) {
        self.senders[&asset].send(Ok(price)).unwrap();
    }

    pub fn fail(&self, asset: Asset, err: FeedError) {
        self.senders[&asset].send(Err(err)).unwrap();
    }
}

impl ChannelFeed {
    pub fn new() -> (Arc<Self>, FeedHandles) {
        let mut scripts = HashMap::new();
        let mut senders = HashMap::new();
        for asset in Asset::ALL {
            let (tx, rx) = mpsc::unbounded_channel();
            scripts.insert(asset, rx);
            senders.insert(asset, tx);
        }
        let feed = Arc::new(Self {
            scripts: Mutex::new(scripts),
            opens: Mutex::new(HashMap::new()),
            pulled: Arc::new(DashMap::new()),
        });
        (feed, FeedHandles { senders })
    }

    pub fn opens(&self, asset: Asset) -> usize {
        self.opens.lock().unwrap().get(&asset).copied().unwrap_or(0)
    }

    pub fn pulled(&self, asset: Asset) -> usize {
        self.pulled.get(&asset).map(|n| *n).unwrap_or(0)
    }
}

impl PriceFeed for ChannelFeed {
    fn open(&self, asset: Asset, _endpoint: &str) -> TickStream {
        *self.opens.lock().unwrap().entry(asset).or_default() += 1;
        let pulled = Arc::clone(&self.pulled);
        match self.scripts.lock().unwrap().remove(&asset) {
            Some(rx) => stream::unfold(rx, move |mut rx| {
                let pulled = Arc::clone(&pulled);
                async move {
                    rx.recv().await.map(|item| {
                        *pulled.entry(asset).or_default() += 1;
                        (item, rx)
                    })
                }
            })
            .boxed(),
            None => stream::pending::<Result<f64, FeedError>>().boxed(),
        }
    }
}

// == renderers ==

#[derive(Default)]
pub struct RecordingRenderer {
    charts: Mutex<Vec<ChartRequest>>,
    fail: bool,
}

impl RecordingRenderer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn charts(&self) -> Vec<ChartRequest> {
        self.charts.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.charts.lock().unwrap().len()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&self, chart: &ChartRequest) -> Result<(), RenderError> {
        if self.fail {
            return Err(RenderError::Io(std::io::Error::other("disk full")));
        }
        self.charts.lock().unwrap().push(chart.clone());
        Ok(())
    }
}

/// Blocks every render until the test releases it, announcing each entry.
pub struct GateRenderer {
    entered: mpsc::UnboundedSender<Asset>,
    release: Mutex<mpsc::UnboundedReceiver<()>>,
    pub inner: RecordingRenderer,
}

pub struct Gate {
    pub entered: mpsc::UnboundedReceiver<Asset>,
    release: mpsc::UnboundedSender<()>,
}

impl Gate {
    pub fn release_one(&self) {
        self.release.send(()).unwrap();
    }
}

impl GateRenderer {
    pub fn new() -> (Arc<Self>, Gate) {
        let (entered_tx, entered_rx) = mpsc::unbounded_channel();
        let (release_tx, release_rx) = mpsc::unbounded_channel();
        let r = Arc::new(Self {
            entered: entered_tx,
            release: Mutex::new(release_rx),
            inner: RecordingRenderer::default(),
        });
        (
            r,
            Gate {
                entered: entered_rx,
                release: release_tx,
            },
        )
    }
}

impl Renderer for GateRenderer {
    fn render(&self, chart: &ChartRequest) -> Result<(), RenderError> {
        let _ = self.entered.send(chart.asset);
        // Runs on the blocking pool, so a blocking receive is fine here.
        self.release.lock().unwrap().blocking_recv();
        self.inner.render(chart)
    }
}

// == wiring ==

pub struct Harness {
    pub writer: SnapshotWriter,
    pub history: Arc<PriceHistory>,
    pub shutdown: Arc<ShutdownCoordinator>,
}

pub fn harness(renderer: Arc<dyn Renderer>, workers: usize) -> Harness {
    let history = Arc::new(PriceHistory::new());
    let shutdown = Arc::new(ShutdownCoordinator::new());
    let writer = SnapshotWriter::new(
        history.clone(),
        shutdown.clone(),
        renderer,
        PathBuf::from("Results"),
        workers,
    );
    Harness {
        writer,
        history,
        shutdown,
    }
}
