//! Wire types exchanged with the fleet platform API

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Publish name used for generic resource change envelopes
pub const RESOURCE_CHANGE_EVENT: &str = "service.kubernetes.change";

/// Service kind reported for every cluster service and namespace event
pub const KUBERNETES_SERVICE_KIND: &str = "kubernetesService";

/// Environment kind reported for namespace removals
pub const ENVIRONMENT_KIND: &str = "environment";

/// Prefix for external ids derived from cluster objects
pub const EXTERNAL_ID_PREFIX: &str = "kubernetes://";

pub const SERVICE_CREATE: &str = "service.create";
pub const SERVICE_UPDATE: &str = "service.update";
pub const SERVICE_REMOVE: &str = "service.remove";
pub const STACK_REMOVE: &str = "stack.remove";

/// Generic `{type, object}` envelope sent through the publish endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Publish {
    pub name: String,
    pub data: PublishData,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublishData {
    #[serde(rename = "type")]
    pub event_type: String,
    pub object: Value,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_container: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vip: Option<String>,
}

impl ServiceDescriptor {
    /// Descriptor carrying only the kind, used for removals
    pub fn kind_only() -> Self {
        Self {
            kind: KUBERNETES_SERVICE_KIND.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

/// Normalized record describing a cluster service or namespace change
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalServiceEvent {
    pub external_id: String,
    pub event_type: String,
    pub service: ServiceDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvironmentDescriptor>,
}

/// Event handed to a [`Publisher`](super::Publisher)
#[derive(Clone, Debug, PartialEq)]
pub enum OutboundEvent {
    Generic(Publish),
    ExternalService(ExternalServiceEvent),
}

impl OutboundEvent {
    /// Event type carried by either shape, for logging and metrics
    pub fn event_type(&self) -> &str {
        match self {
            OutboundEvent::Generic(p) => &p.data.event_type,
            OutboundEvent::ExternalService(e) => &e.event_type,
        }
    }
}
