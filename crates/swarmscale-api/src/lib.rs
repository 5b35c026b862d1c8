//! swarmscale-api: HTTP surface of the autoscaler.
//!
//! Worker instances report request latencies here; the plotting
//! component and Prometheus read the autoscaler's telemetry.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/time` | Report one latency in seconds (`text/plain` body) |
//! | GET | `/plots` | Telemetry points, one per decision cycle |
//! | GET | `/metrics` | Prometheus exposition |
//! | GET | `/healthz` | Liveness |

pub mod handlers;

use axum::Router;
use axum::routing::{get, post};
use swarmscale_metrics::{SampleBuffer, TelemetryLog};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub buffer: SampleBuffer,
    pub telemetry: TelemetryLog,
}

/// Build the complete API router.
pub fn build_router(buffer: SampleBuffer, telemetry: TelemetryLog) -> Router {
    let state = ApiState { buffer, telemetry };

    Router::new()
        .route("/time", post(handlers::record_time))
        .route("/plots", get(handlers::plots))
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}
