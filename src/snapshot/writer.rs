use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::snapshot::render::{AxisBounds, ChartRequest, Renderer, chart_path, chart_title};
use crate::state::{OpGuard, PriceHistory, ShutdownCoordinator};
use crate::types::Asset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Rendered,
    // Refused at admission: shutdown already requested.
    Skipped,
    // Appended to history, but the render failed (already logged).
    Failed,
}

/// Appends prices to the shared history and hands snapshots to the
/// renderer. Cheap to clone; every observer holds one.
#[derive(Clone)]
pub struct SnapshotWriter {
    history: Arc<PriceHistory>,
    shutdown: Arc<ShutdownCoordinator>,
    renderer: Arc<dyn Renderer>,
    results_dir: PathBuf,
    permits: Arc<Semaphore>,
    // One lane per chart file: append and render for the same destination
    // run one at a time, so a chart is never replaced by a shorter one.
    lanes: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl SnapshotWriter {
    pub fn new(
        history: Arc<PriceHistory>,
        shutdown: Arc<ShutdownCoordinator>,
        renderer: Arc<dyn Renderer>,
        results_dir: PathBuf,
        workers: usize,
    ) -> Self {
        Self {
            history,
            shutdown,
            renderer,
            results_dir,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            lanes: Arc::new(DashMap::new()),
        }
    }

    /// Fire-and-forget write. Admission is decided now, on the caller's
    /// thread; the append and render run later on the write pool.
    /// Returns whether the write was admitted.
    pub fn schedule(&self, asset: Asset, price: f64, observer_id: &str) -> bool {
        let Some(guard) = self.admit(asset, price, observer_id) else {
            return false;
        };
        let this = self.clone();
        let observer_id = observer_id.to_string();
        tokio::spawn(async move {
            this.write(guard, asset, price, &observer_id).await;
        });
        true
    }

    /// Admit, append and render, waiting for the render to finish.
    pub async fn append_and_render(&self, asset: Asset, price: f64, observer_id: &str) -> WriteOutcome {
        match self.admit(asset, price, observer_id) {
            Some(guard) => self.write(guard, asset, price, observer_id).await,
            None => WriteOutcome::Skipped,
        }
    }

    fn admit(&self, asset: Asset, price: f64, observer_id: &str) -> Option<OpGuard> {
        let guard = self.shutdown.begin_op();
        if guard.is_none() {
            debug!(asset = %asset, observer = %observer_id, price, "shutting down, snapshot write dropped");
        }
        guard
    }

    // `_guard` keeps the op counted until this returns, on every path.
    async fn write(&self, _guard: OpGuard, asset: Asset, price: f64, observer_id: &str) -> WriteOutcome {
        let destination = chart_path(&self.results_dir, asset, observer_id);
        // Waiting for the lane does not tie up a pool slot.
        let lane = self.lanes.entry(destination.clone()).or_default().clone();
        let _turn = lane.lock().await;

        let Ok(_permit) = self.permits.acquire().await else {
            warn!(asset = %asset, observer = %observer_id, "write pool closed, snapshot dropped");
            return WriteOutcome::Failed;
        };

        let op = Uuid::new_v4();
        let points = self.history.append(asset, price);
        let chart = ChartRequest {
            asset,
            title: chart_title(asset, observer_id),
            bounds: AxisBounds::for_series(&points).unwrap_or_default(),
            destination,
            points,
        };
        let samples = chart.points.len();

        let renderer = Arc::clone(&self.renderer);
        match tokio::task::spawn_blocking(move || renderer.render(&chart)).await {
            Ok(Ok(())) => {
                debug!(%op, asset = %asset, observer = %observer_id, samples, "snapshot rendered");
                WriteOutcome::Rendered
            }
            Ok(Err(e)) => {
                warn!(%op, asset = %asset, observer = %observer_id, error = %e, "snapshot render failed");
                WriteOutcome::Failed
            }
            Err(e) => {
                warn!(%op, asset = %asset, observer = %observer_id, error = %e, "snapshot render task aborted");
                WriteOutcome::Failed
            }
        }
    }
}
