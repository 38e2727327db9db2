pub mod render;
pub mod writer;

pub use render::{AxisBounds, ChartRequest, JsonChartRenderer, Renderer};
pub use writer::{SnapshotWriter, WriteOutcome};
