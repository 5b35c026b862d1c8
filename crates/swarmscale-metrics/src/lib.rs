//! swarmscale-metrics: latency ingestion and autoscaler observability.
//!
//! Worker instances report one latency per completed request. Reports
//! land in a [`SampleBuffer`]; once per monitoring interval the control
//! loop takes a [`WindowSnapshot`], reduces it with [`aggregate::mean`],
//! and appends the outcome of the cycle to the [`TelemetryLog`].
//!
//! # Architecture
//!
//! ```text
//! SampleBuffer
//!   ├── record()         ← POST /time (many concurrent callers)
//!   └── drain_snapshot() → control loop (one caller per interval)
//!
//! aggregate::mean()      → window statistic (0.0 when empty)
//!
//! TelemetryLog
//!   ├── append()         ← control loop, one point per cycle
//!   └── points()         → GET /plots
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics endpoint
//! ```

pub mod aggregate;
pub mod buffer;
pub mod prometheus;
pub mod telemetry;

pub use aggregate::{EMPTY_WINDOW_MEAN, mean};
pub use buffer::{InvalidSample, LatencySample, SampleBuffer, WindowSnapshot};
pub use prometheus::render_prometheus;
pub use telemetry::{PlotPoint, TelemetryLog};
