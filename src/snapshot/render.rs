use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::RenderError;
use crate::state::Sample;
use crate::types::Asset;

pub const X_LABEL: &str = "Time (samples)";
pub const Y_LABEL: &str = "Price (USDT)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AxisBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl AxisBounds {
    /// Y spans min..max padded by 0.1% of the range; X spans 0..3*len so
    /// the line sits in the left third of the chart.
    pub fn for_series(points: &[Sample]) -> Option<Self> {
        let first = points.first()?;
        let (mut lo, mut hi) = (first.price, first.price);
        for p in points {
            lo = lo.min(p.price);
            hi = hi.max(p.price);
        }
        let pad = (hi - lo) * 0.001;
        Some(Self {
            x_min: 0.0,
            x_max: (points.len() * 3) as f64,
            y_min: lo - pad,
            y_max: hi + pad,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub asset: Asset,
    pub title: String,
    pub points: Vec<Sample>,
    pub bounds: AxisBounds,
    pub destination: PathBuf,
}

/// Sink for chart snapshots. Called from the blocking pool, never while
/// the history lock is held.
pub trait Renderer: Send + Sync {
    fn render(&self, chart: &ChartRequest) -> Result<(), RenderError>;
}

/// Writes each chart as a JSON document (title, axes, bounds, points).
///
/// The file is written next to its destination and renamed into place, so
/// readers never observe a half-written chart.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonChartRenderer;

#[derive(Serialize)]
struct ChartDocument<'a> {
    title: &'a str,
    asset: Asset,
    x_label: &'static str,
    y_label: &'static str,
    bounds: AxisBounds,
    points: &'a [Sample],
    generated_at: String,
}

impl Renderer for JsonChartRenderer {
    fn render(&self, chart: &ChartRequest) -> Result<(), RenderError> {
        if chart.points.is_empty() {
            return Err(RenderError::EmptySeries(chart.asset));
        }
        if let Some(dir) = chart.destination.parent() {
            fs::create_dir_all(dir)?;
        }

        let doc = ChartDocument {
            title: &chart.title,
            asset: chart.asset,
            x_label: X_LABEL,
            y_label: Y_LABEL,
            bounds: chart.bounds,
            points: &chart.points,
            generated_at: Utc::now().to_rfc3339(),
        };
        let body = serde_json::to_vec_pretty(&doc)?;

        let tmp = temp_path(&chart.destination);
        if let Err(e) = fs::write(&tmp, &body).and_then(|_| fs::rename(&tmp, &chart.destination)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

// Unique per write: several tasks may target the same chart at once.
fn temp_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4()))
}

pub fn chart_title(asset: Asset, observer_id: &str) -> String {
    format!("{asset} Price Chart - Observer {observer_id}")
}

/// `<dir>/<ASSET>_chart_<observer>.json`, with the id reduced to a safe
/// file-name alphabet.
pub fn chart_path(dir: &Path, asset: Asset, observer_id: &str) -> PathBuf {
    let safe: String = observer_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    dir.join(format!("{asset}_chart_{safe}.json"))
}
