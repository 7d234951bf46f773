//! Tracing subscriber setup with optional OpenTelemetry export
//!
//! Traces are exported over OTLP only when `OTEL_EXPORTER_OTLP_ENDPOINT` is
//! set. Log lines go to stdout as text, or as JSON with `--log-json`.

use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace, Resource};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{Error, Result};

pub const SERVICE_NAME: &str = "fleet-agent";

const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_telemetry(log_json: bool) -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let (text_layer, json_layer) = if log_json {
        (None, Some(fmt::layer().json().with_target(true)))
    } else {
        (Some(fmt::layer().with_target(true)), None)
    };

    let endpoint = std::env::var(OTLP_ENDPOINT_ENV).ok();
    let otel_layer = match endpoint.as_deref() {
        Some(endpoint) => {
            let tracer = init_tracer(endpoint)?;
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| Error::ConfigError(format!("Failed to initialize tracing: {}", e)))?;

    match endpoint {
        Some(endpoint) => info!("OpenTelemetry tracing exporting to {}", endpoint),
        None => info!("OpenTelemetry tracing disabled ({} not set)", OTLP_ENDPOINT_ENV),
    }
    Ok(())
}

fn init_tracer(endpoint: &str) -> Result<trace::Tracer> {
    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(trace::config().with_resource(Resource::new(vec![
            KeyValue::new("service.name", SERVICE_NAME),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])))
        .install_batch(runtime::Tokio)
        .map_err(|e| Error::ConfigError(format!("Failed to initialize OTLP exporter: {}", e)))
}

/// Flush pending spans. A no-op when export is disabled.
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}
