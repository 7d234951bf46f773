//! Fleet agent: keeps a Kubernetes cluster and a fleet management platform
//! in step.
//!
//! Cluster resource changes are watched, translated and published to the
//! fleet platform. Host states declared by the fleet platform are applied to
//! the cluster's nodes as cordon, uncordon and drain.

pub mod cluster;
pub mod config;
pub mod controller;
pub mod error;
pub mod fleet;
pub mod retry;
pub mod telemetry;
pub mod watch;

#[cfg(feature = "metrics")]
pub mod metrics;

#[cfg(feature = "rest-api")]
pub mod rest_api;

pub use crate::error::{Error, Result};
