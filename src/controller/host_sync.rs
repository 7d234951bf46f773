//! Host lifecycle synchronization
//!
//! Every tick fetches the full host snapshot and reconciles each host
//! independently. Nothing is cached between ticks; repeated reconciliation of
//! an unchanged host is a read with no writes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::reconciler::NodeScheduleReconciler;
use crate::error::Result;
use crate::fleet::{HostRecord, HostSource, HostState};

/// Node scheduling action implied by a declared host state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostAction {
    Uncordon,
    Cordon,
    Drain,
    Ignore,
}

impl From<&HostState> for HostAction {
    fn from(state: &HostState) -> Self {
        match state {
            HostState::Active => HostAction::Uncordon,
            HostState::Inactive => HostAction::Cordon,
            HostState::Evicted => HostAction::Drain,
            HostState::Other(_) => HostAction::Ignore,
        }
    }
}

/// Per-host results of one sync pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Hosts whose node was written to or drained
    pub changed: Vec<String>,
    /// Hosts already in the declared state, or with a state that needs no action
    pub unchanged: Vec<String>,
    /// Hosts whose reconciliation failed
    pub failed: Vec<String>,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.changed.len() + self.unchanged.len() + self.failed.len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Completed(SyncReport),
    /// A previous tick was still running
    Skipped,
}

pub struct HostLifecycleSynchronizer {
    hosts: Arc<dyn HostSource>,
    reconciler: NodeScheduleReconciler,
    in_flight: Mutex<()>,
}

impl HostLifecycleSynchronizer {
    pub fn new(hosts: Arc<dyn HostSource>, reconciler: NodeScheduleReconciler) -> Self {
        Self {
            hosts,
            reconciler,
            in_flight: Mutex::new(()),
        }
    }

    /// Reconcile every host in the snapshot.
    ///
    /// Failures are logged and collected; they never stop the pass.
    pub async fn sync(&self, hosts: &[HostRecord]) -> SyncReport {
        let mut report = SyncReport::default();

        for host in hosts {
            let action = HostAction::from(&host.state);
            debug!(
                hostname = %host.hostname,
                state = %host.state,
                ?action,
                "Reconciling host"
            );

            let hostname = host.hostname.as_str();
            let result = match action {
                HostAction::Uncordon => self.reconciler.set_unschedulable(hostname, false).await,
                HostAction::Cordon => self.reconciler.set_unschedulable(hostname, true).await,
                HostAction::Drain => self.reconciler.drain(hostname).await,
                HostAction::Ignore => Ok(false),
            };

            match result {
                Ok(true) => report.changed.push(host.hostname.clone()),
                Ok(false) => report.unchanged.push(host.hostname.clone()),
                Err(e) => {
                    error!(hostname = %host.hostname, "Failed to reconcile host: {}", e);
                    report.failed.push(host.hostname.clone());
                }
            }
        }

        report
    }

    /// Fetch the host snapshot and sync it, unless another tick is running
    pub async fn tick(&self) -> Result<TickOutcome> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            warn!("Previous host sync still running, skipping tick");
            #[cfg(feature = "metrics")]
            crate::metrics::record_host_sync_tick("skipped");
            return Ok(TickOutcome::Skipped);
        };

        let hosts = match self.hosts.hosts().await {
            Ok(hosts) => hosts,
            Err(e) => {
                #[cfg(feature = "metrics")]
                crate::metrics::record_host_sync_tick("error");
                return Err(e);
            }
        };

        let report = self.sync(&hosts).await;
        #[cfg(feature = "metrics")]
        crate::metrics::record_host_sync_tick(if report.failed.is_empty() {
            "completed"
        } else {
            "partial"
        });

        Ok(TickOutcome::Completed(report))
    }

    /// Tick every `period` until `shutdown` resolves. A running tick is
    /// finished before shutdown is observed.
    pub async fn run<F>(&self, period: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!("Starting host sync every {:?}", period);

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    match self.tick().await {
                        Ok(TickOutcome::Completed(report)) => debug!(
                            changed = report.changed.len(),
                            failed = report.failed.len(),
                            "Host sync finished for {} hosts",
                            report.total()
                        ),
                        Ok(TickOutcome::Skipped) => {}
                        Err(e) => error!("Failed to fetch hosts: {}", e),
                    }
                }
            }
        }

        info!("Host sync stopped");
    }
}
