//! HTTP handlers for the health listener

use tracing::instrument;

/// Liveness probe
#[instrument]
pub async fn healthcheck() -> &'static str {
    "OK"
}

/// Prometheus text exposition of the agent's metrics
#[cfg(feature = "metrics")]
pub async fn metrics() -> axum::response::Response {
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;
    use prometheus_client::encoding::text::encode;

    let mut buffer = String::new();
    match encode(&mut buffer, &crate::metrics::REGISTRY) {
        Ok(()) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "application/openmetrics-text; version=1.0.0; charset=utf-8",
            )],
            buffer,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
