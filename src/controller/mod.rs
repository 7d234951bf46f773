//! Host lifecycle controller
//!
//! Maps host states declared by the fleet platform onto node scheduling:
//! cordon, uncordon and drain.

mod host_sync;
mod reconciler;

pub use host_sync::{HostAction, HostLifecycleSynchronizer, SyncReport, TickOutcome};
pub use reconciler::{NodeScheduleReconciler, DRAIN_LABEL_KEY, DRAIN_LABEL_VALUE};
