//! HTTP handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

use swarmscale_metrics::{InvalidSample, LatencySample};

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
        })
    }
}

/// A latency report that was rejected at the boundary.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("body is not valid UTF-8")]
    NotUtf8,

    #[error(transparent)]
    Malformed(#[from] InvalidSample),
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        debug!(error = %self, "latency report rejected");
        StatusCode::BAD_REQUEST.into_response()
    }
}

// ── Ingestion ──────────────────────────────────────────────────

/// POST /time
///
/// Body is a single non-negative number of seconds.
pub async fn record_time(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<StatusCode, IngestError> {
    let text = std::str::from_utf8(&body).map_err(|_| IngestError::NotUtf8)?;
    let sample: LatencySample = text.parse()?;
    state.buffer.record(sample).await;
    Ok(StatusCode::OK)
}

// ── Telemetry ──────────────────────────────────────────────────

/// GET /plots
pub async fn plots(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.telemetry.points().await)
}

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let points = state.telemetry.points().await;
    let body = swarmscale_metrics::render_prometheus(points.last(), points.len());
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use swarmscale_metrics::{PlotPoint, SampleBuffer, TelemetryLog};

    fn test_state() -> ApiState {
        ApiState {
            buffer: SampleBuffer::draining(),
            telemetry: TelemetryLog::new(),
        }
    }

    async fn status_of(state: &ApiState, body: &'static [u8]) -> StatusCode {
        record_time(State(state.clone()), Bytes::from_static(body))
            .await
            .into_response()
            .status()
    }

    #[tokio::test]
    async fn accepts_numeric_body() {
        let state = test_state();
        assert_eq!(status_of(&state, b"0.42").await, StatusCode::OK);
        assert_eq!(status_of(&state, b"3\n").await, StatusCode::OK);

        let snap = state.buffer.drain_snapshot().await;
        assert_eq!(snap.samples, vec![0.42, 3.0]);
    }

    #[tokio::test]
    async fn rejects_malformed_without_touching_buffer() {
        let state = test_state();
        let bodies: [&'static [u8]; 5] = [b"abc", b"-1", b"", b"NaN", b"\xff\xfe"];
        for body in bodies {
            let resp = record_time(State(state.clone()), Bytes::from_static(body))
                .await
                .into_response();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {body:?}");
            let bytes = resp.into_body().collect().await.unwrap().to_bytes();
            assert!(bytes.is_empty());
        }
        assert!(state.buffer.is_empty().await);
    }

    #[tokio::test]
    async fn plots_returns_points() {
        let state = test_state();
        state
            .telemetry
            .append(PlotPoint {
                elapsed_secs: 10.0,
                average_latency_secs: 0.9,
                workload_rate: 0.5,
                replicas: 2,
            })
            .await;

        let resp = plots(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
        assert_eq!(json["data"][0]["replicas"], 2);
        assert_eq!(json["data"][0]["average_latency_secs"], 0.9);
    }

    #[tokio::test]
    async fn prometheus_endpoint_returns_text() {
        let state = test_state();
        let resp = prometheus_metrics(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.contains("text/plain"));
    }
}
