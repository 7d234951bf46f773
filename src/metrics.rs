//! Prometheus metrics for the fleet agent
//!
//! # Exported metrics
//! - `fleet_agent_events_published_total` (counter): events accepted by the fleet API, by kind and event type.
//! - `fleet_agent_event_failures_total` (counter): translation or publish failures, by kind and error category.
//! - `fleet_agent_node_reconciliations_total` (counter): cordon/uncordon outcomes, by action and result.
//! - `fleet_agent_drains_total` (counter): drain outcomes, by result.
//! - `fleet_agent_host_sync_ticks_total` (counter): host sync ticks, by outcome.

use std::sync::atomic::AtomicU64;

use once_cell::sync::Lazy;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct EventLabels {
    /// Watched resource kind, e.g. "services"
    pub kind: String,
    pub event_type: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct FailureLabels {
    pub kind: String,
    /// Error category from `Error::metric_label`
    pub error: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ReconcileLabels {
    /// "cordon" or "uncordon"
    pub action: String,
    /// "unchanged", "updated" or "failed"
    pub result: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ResultLabels {
    pub result: String,
}

pub static EVENTS_PUBLISHED_TOTAL: Lazy<Family<EventLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

pub static EVENT_FAILURES_TOTAL: Lazy<Family<FailureLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

pub static NODE_RECONCILIATIONS_TOTAL: Lazy<Family<ReconcileLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

pub static DRAINS_TOTAL: Lazy<Family<ResultLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

pub static HOST_SYNC_TICKS_TOTAL: Lazy<Family<ResultLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

/// Global registry served on `/metrics`
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let mut registry = Registry::with_prefix("fleet_agent");
    registry.register(
        "events_published",
        "Events accepted by the fleet API",
        EVENTS_PUBLISHED_TOTAL.clone(),
    );
    registry.register(
        "event_failures",
        "Resource events that failed translation or publishing",
        EVENT_FAILURES_TOTAL.clone(),
    );
    registry.register(
        "node_reconciliations",
        "Node schedulability reconciliation outcomes",
        NODE_RECONCILIATIONS_TOTAL.clone(),
    );
    registry.register("drains", "Node drain outcomes", DRAINS_TOTAL.clone());
    registry.register(
        "host_sync_ticks",
        "Host lifecycle sync ticks",
        HOST_SYNC_TICKS_TOTAL.clone(),
    );
    registry
});

pub fn record_event_published(kind: &str, event_type: &str) {
    EVENTS_PUBLISHED_TOTAL
        .get_or_create(&EventLabels {
            kind: kind.to_string(),
            event_type: event_type.to_string(),
        })
        .inc();
}

pub fn record_event_failure(kind: &str, error: &str) {
    EVENT_FAILURES_TOTAL
        .get_or_create(&FailureLabels {
            kind: kind.to_string(),
            error: error.to_string(),
        })
        .inc();
}

pub fn record_node_reconciliation(action: &str, result: &str) {
    NODE_RECONCILIATIONS_TOTAL
        .get_or_create(&ReconcileLabels {
            action: action.to_string(),
            result: result.to_string(),
        })
        .inc();
}

pub fn record_drain(result: &str) {
    DRAINS_TOTAL
        .get_or_create(&ResultLabels {
            result: result.to_string(),
        })
        .inc();
}

pub fn record_host_sync_tick(result: &str) {
    HOST_SYNC_TICKS_TOTAL
        .get_or_create(&ResultLabels {
            result: result.to_string(),
        })
        .inc();
}
