//! Append-only record of decision cycles, read by an external plotter.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

/// Outcome of one successful decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotPoint {
    /// Seconds since the control loop started.
    pub elapsed_secs: f64,
    pub average_latency_secs: f64,
    /// Latency reports per second during the window.
    pub workload_rate: f64,
    /// Replica count after the cycle (the target if a scale was issued).
    pub replicas: u32,
}

/// Shared, append-only telemetry sequence.
///
/// The control loop is the only writer. Readers get copies; nothing in
/// the decision path reads it back.
#[derive(Clone, Default)]
pub struct TelemetryLog {
    points: Arc<RwLock<Vec<PlotPoint>>>,
}

impl TelemetryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, point: PlotPoint) {
        self.points.write().await.push(point);
    }

    pub async fn points(&self) -> Vec<PlotPoint> {
        self.points.read().await.clone()
    }

    pub async fn latest(&self) -> Option<PlotPoint> {
        self.points.read().await.last().copied()
    }

    pub async fn len(&self) -> usize {
        self.points.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.points.read().await.is_empty()
    }
}
