//! Axum HTTP server for the health listener

use std::net::SocketAddr;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;
use crate::{Error, Result};

pub fn router() -> Router {
    let router = Router::new().route("/healthcheck", get(handlers::healthcheck));

    #[cfg(feature = "metrics")]
    let router = router.route("/metrics", get(handlers::metrics));

    router.layer(TraceLayer::new_for_http())
}

/// Bind all interfaces on `port` and serve until the listener fails
pub async fn run_server(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::ConfigError(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("Health check listening on {}", addr);
    serve(listener).await
}

pub async fn serve(listener: TcpListener) -> Result<()> {
    axum::serve(listener, router())
        .await
        .map_err(|e| Error::ConfigError(format!("Server error: {}", e)))
}
