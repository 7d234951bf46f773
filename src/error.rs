//! Error types for the fleet agent

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Kubeconfig error: {0}")]
    KubeconfigError(#[from] kube::config::KubeconfigError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown resource kind: {0}")]
    UnknownResourceKind(String),

    /// An observed object lacks a metadata field required for addressing
    #[error("Object is missing required metadata: {0}")]
    MissingMetadata(String),

    #[error("Fleet API rejected request with status {status}: {body}")]
    PublishRejected { status: u16, body: String },

    #[error("Failed to update node {hostname} after {attempts} attempts")]
    RetriesExhausted { hostname: String, attempts: u32 },

    #[error("Failed to drain node {hostname}: {reason}")]
    DrainFailed { hostname: String, reason: String },

    #[error("Draining node {hostname} did not finish within {timeout:?}")]
    DrainTimeout { hostname: String, timeout: Duration },
}

impl Error {
    /// Short category used as a metric label
    pub fn metric_label(&self) -> &'static str {
        match self {
            Error::KubeError(_) | Error::KubeconfigError(_) => "kube",
            Error::HttpError(_) | Error::PublishRejected { .. } => "fleet",
            Error::SerializationError(_) => "serialization",
            Error::IoError(_) => "io",
            Error::ConfigError(_) | Error::UnknownResourceKind(_) => "config",
            Error::MissingMetadata(_) => "metadata",
            Error::RetriesExhausted { .. } => "retries_exhausted",
            Error::DrainFailed { .. } | Error::DrainTimeout { .. } => "drain",
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
