//! Handler and translator contracts for observed resource changes

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use kube::{Resource, ResourceExt};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::fleet::{OutboundEvent, Publisher};

/// Kind of change observed on a watched object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
}

impl ChangeType {
    /// Wire representation used by the generic envelope
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "ADDED",
            ChangeType::Modified => "MODIFIED",
            ChangeType::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives notifications for one watched kind.
///
/// Calls for a kind are made one at a time in delivery order, so a slow
/// handler delays every later notification for that kind.
#[async_trait]
pub trait ResourceEventHandler<K: Send + Sync>: Send + Sync {
    async fn on_add(&self, obj: &K) -> Result<()>;

    async fn on_update(&self, old: &K, new: &K) -> Result<()>;

    async fn on_delete(&self, obj: &K) -> Result<()>;
}

/// Converts an observed object into an outbound event.
///
/// `Ok(None)` means the change is intentionally not forwarded.
#[async_trait]
pub trait EventTranslator: Send + Sync {
    type Resource: Resource + Send + Sync;

    async fn translate(
        &self,
        obj: &Self::Resource,
        change: ChangeType,
    ) -> Result<Option<OutboundEvent>>;
}

/// `namespace/name` key, or just `name` for cluster scoped objects
pub fn object_key<K: Resource>(obj: &K) -> String {
    match obj.namespace() {
        Some(ns) => format!("{}/{}", ns, obj.name_any()),
        None => obj.name_any(),
    }
}

/// Handler that translates every notification and hands the result to a
/// publisher
pub struct Forwarder<T> {
    kind: String,
    translator: T,
    publisher: Arc<dyn Publisher>,
}

impl<T: EventTranslator> Forwarder<T> {
    pub fn new(kind: impl Into<String>, translator: T, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            kind: kind.into(),
            translator,
            publisher,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    async fn forward(&self, obj: &T::Resource, change: ChangeType) -> Result<()> {
        let key = object_key(obj);
        debug!(kind = %self.kind, change = %change, "Received event for {}", key);

        let result = self.translate_and_publish(obj, change, &key).await;

        if let Err(e) = &result {
            warn!(kind = %self.kind, change = %change, "Failed to handle event for {}: {}", key, e);
            #[cfg(feature = "metrics")]
            crate::metrics::record_event_failure(&self.kind, e.metric_label());
        }
        result
    }

    async fn translate_and_publish(
        &self,
        obj: &T::Resource,
        change: ChangeType,
        key: &str,
    ) -> Result<()> {
        let Some(event) = self.translator.translate(obj, change).await? else {
            return Ok(());
        };

        self.publisher.publish(&event).await?;
        info!(
            kind = %self.kind,
            event_type = %event.event_type(),
            "Published {} event for {}",
            change,
            key
        );
        #[cfg(feature = "metrics")]
        crate::metrics::record_event_published(&self.kind, event.event_type());
        Ok(())
    }
}

#[async_trait]
impl<T> ResourceEventHandler<T::Resource> for Forwarder<T>
where
    T: EventTranslator,
{
    async fn on_add(&self, obj: &T::Resource) -> Result<()> {
        self.forward(obj, ChangeType::Added).await
    }

    async fn on_update(&self, _old: &T::Resource, new: &T::Resource) -> Result<()> {
        self.forward(new, ChangeType::Modified).await
    }

    async fn on_delete(&self, obj: &T::Resource) -> Result<()> {
        self.forward(obj, ChangeType::Deleted).await
    }
}
