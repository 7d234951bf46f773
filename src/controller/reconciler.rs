//! Node scheduling reconciliation
//!
//! Cordon and uncordon are optimistic read-modify-write cycles against the
//! node object, repeated up to the configured attempt budget. Drain runs the
//! external drain procedure once per eviction and records completion in a
//! node label, which is checked before any further drain.

use std::sync::Arc;

use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;
use tracing::{debug, info, instrument, warn};

use crate::cluster::{DrainCommand, NodeClient};
use crate::error::{Error, Result};
use crate::retry::{retry, RetryPolicy};

/// Label marking a node whose drain has completed
pub const DRAIN_LABEL_KEY: &str = "io.rancher.host.state";
pub const DRAIN_LABEL_VALUE: &str = "evacuated";

/// Applies declared host intent onto node scheduling state
pub struct NodeScheduleReconciler {
    nodes: Arc<dyn NodeClient>,
    drain: Arc<dyn DrainCommand>,
    retry: RetryPolicy,
}

impl NodeScheduleReconciler {
    pub fn new(
        nodes: Arc<dyn NodeClient>,
        drain: Arc<dyn DrainCommand>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            nodes,
            drain,
            retry,
        }
    }

    /// Make the node's `unschedulable` flag equal `desired`.
    ///
    /// Returns `true` when a write was made and `false` when the node was
    /// already in the desired state. A write also clears the drain label.
    #[instrument(skip_all, fields(hostname = %hostname, desired = desired))]
    pub async fn set_unschedulable(&self, hostname: &str, desired: bool) -> Result<bool> {
        let action = if desired { "cordon" } else { "uncordon" };

        let result = retry(&self.retry, action, |attempt| {
            self.apply_schedule(hostname, desired, attempt)
        })
        .await;

        match result {
            Ok(changed) => {
                if changed {
                    info!("Set unschedulable={} on node {}", desired, hostname);
                }
                #[cfg(feature = "metrics")]
                crate::metrics::record_node_reconciliation(
                    action,
                    if changed { "updated" } else { "unchanged" },
                );
                Ok(changed)
            }
            Err(e) => {
                warn!("Giving up on node {}: {}", hostname, e);
                #[cfg(feature = "metrics")]
                crate::metrics::record_node_reconciliation(action, "failed");
                Err(Error::RetriesExhausted {
                    hostname: hostname.to_string(),
                    attempts: self.retry.max_attempts.max(1),
                })
            }
        }
    }

    /// One fetch/compare/write cycle
    async fn apply_schedule(&self, hostname: &str, desired: bool, attempt: u32) -> Result<bool> {
        let mut node = self.nodes.get(hostname).await?;
        if is_unschedulable(&node) == desired {
            debug!("Node {} already has unschedulable={}", hostname, desired);
            return Ok(false);
        }

        debug!(attempt, "Setting unschedulable={} on node {}", desired, hostname);
        node.spec.get_or_insert_with(Default::default).unschedulable = Some(desired);
        node.labels_mut().remove(DRAIN_LABEL_KEY);
        self.nodes.replace(&node).await?;
        Ok(true)
    }

    /// Drain the node unless a completed drain is already recorded.
    ///
    /// Returns `true` when the drain procedure ran. A failed drain leaves the
    /// label unset so the next call starts over.
    #[instrument(skip_all, fields(hostname = %hostname))]
    pub async fn drain(&self, hostname: &str) -> Result<bool> {
        let node = self.nodes.get(hostname).await?;
        if is_drained(&node) {
            debug!("Node {} is already drained", hostname);
            #[cfg(feature = "metrics")]
            crate::metrics::record_drain("skipped");
            return Ok(false);
        }

        info!("Draining node {}", hostname);
        if let Err(e) = self.drain.drain(hostname).await {
            #[cfg(feature = "metrics")]
            crate::metrics::record_drain("failed");
            return Err(e);
        }
        #[cfg(feature = "metrics")]
        crate::metrics::record_drain("succeeded");

        // Fresh read, the drain itself cordoned the node
        let mut node = self.nodes.get(hostname).await?;
        node.labels_mut()
            .insert(DRAIN_LABEL_KEY.to_string(), DRAIN_LABEL_VALUE.to_string());
        self.nodes.replace(&node).await?;

        info!("Node {} drained", hostname);
        Ok(true)
    }
}

fn is_unschedulable(node: &Node) -> bool {
    node.spec
        .as_ref()
        .and_then(|spec| spec.unschedulable)
        .unwrap_or(false)
}

fn is_drained(node: &Node) -> bool {
    node.labels().get(DRAIN_LABEL_KEY).map(String::as_str) == Some(DRAIN_LABEL_VALUE)
}
