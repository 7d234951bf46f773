use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use kube::ResourceExt;
use serde_json::json;
use tracing::debug;

use super::{FLEET_UUID_LABEL, POD_NAMESPACE_SELECTOR_KEY, SYSTEM_NAMESPACE};
use crate::cluster::NamespaceLookup;
use crate::error::{Error, Result};
use crate::fleet::types::{
    EXTERNAL_ID_PREFIX, KUBERNETES_SERVICE_KIND, SERVICE_CREATE, SERVICE_REMOVE, SERVICE_UPDATE,
};
use crate::fleet::{EnvironmentDescriptor, ExternalServiceEvent, OutboundEvent, ServiceDescriptor};
use crate::watch::handler::{object_key, ChangeType, EventTranslator};

/// Cluster IP value of headless services
const HEADLESS_CLUSTER_IP: &str = "None";

/// Translates service changes into external service events
pub struct ServiceTranslator {
    namespaces: Arc<dyn NamespaceLookup>,
}

impl ServiceTranslator {
    pub fn new(namespaces: Arc<dyn NamespaceLookup>) -> Self {
        Self { namespaces }
    }

    async fn environment(&self, namespace: &str) -> Result<EnvironmentDescriptor> {
        if namespace == SYSTEM_NAMESPACE {
            return Ok(EnvironmentDescriptor {
                name: Some(namespace.to_string()),
                external_id: Some(format!("{EXTERNAL_ID_PREFIX}{namespace}")),
                ..Default::default()
            });
        }

        let ns = self.namespaces.get(namespace).await?;
        let uid = ns
            .uid()
            .ok_or_else(|| Error::MissingMetadata(format!("namespace {namespace} has no uid")))?;

        Ok(EnvironmentDescriptor {
            name: Some(ns.name_any()),
            external_id: Some(format!("{EXTERNAL_ID_PREFIX}{uid}")),
            uuid: ns.labels().get(FLEET_UUID_LABEL).cloned(),
            ..Default::default()
        })
    }

    async fn upsert_event(
        &self,
        svc: &Service,
        uid: String,
        event_type: &str,
    ) -> Result<ExternalServiceEvent> {
        let namespace = svc.namespace().ok_or_else(|| {
            Error::MissingMetadata(format!("service {} has no namespace", svc.name_any()))
        })?;
        let spec = svc.spec.as_ref();

        let selector = selector_string(spec.and_then(|s| s.selector.as_ref()), &namespace);
        let vip = spec
            .and_then(|s| s.cluster_ip.as_deref())
            .filter(|ip| !ip.is_empty() && !ip.eq_ignore_ascii_case(HEADLESS_CLUSTER_IP))
            .map(String::from);

        let environment = self.environment(&namespace).await?;
        debug!("Resolved environment {:?} for service {}", environment.name, object_key(svc));

        Ok(ExternalServiceEvent {
            external_id: uid.clone(),
            event_type: event_type.to_string(),
            service: ServiceDescriptor {
                kind: KUBERNETES_SERVICE_KIND.to_string(),
                name: Some(svc.name_any()),
                external_id: Some(uid),
                selector_container: Some(selector).filter(|s| !s.is_empty()),
                data: Some(json!({ "fields": { "template": svc } })),
                uuid: svc.labels().get(FLEET_UUID_LABEL).cloned(),
                vip,
            },
            environment: Some(environment),
        })
    }
}

#[async_trait]
impl EventTranslator for ServiceTranslator {
    type Resource = Service;

    async fn translate(&self, svc: &Service, change: ChangeType) -> Result<Option<OutboundEvent>> {
        let uid = svc.uid().ok_or_else(|| {
            Error::MissingMetadata(format!("service {} has no uid", object_key(svc)))
        })?;

        let event = match change {
            // The service may already be gone, so only its identity is sent
            ChangeType::Deleted => ExternalServiceEvent {
                external_id: uid,
                event_type: SERVICE_REMOVE.to_string(),
                service: ServiceDescriptor::kind_only(),
                environment: None,
            },
            ChangeType::Added => self.upsert_event(svc, uid, SERVICE_CREATE).await?,
            ChangeType::Modified => self.upsert_event(svc, uid, SERVICE_UPDATE).await?,
        };

        Ok(Some(OutboundEvent::ExternalService(event)))
    }
}

/// Render a service selector as `key=value` pairs joined by `,`.
///
/// A present selector is extended with the pod namespace key; keys come out
/// sorted. A service without a selector yields an empty string.
pub fn selector_string(selector: Option<&BTreeMap<String, String>>, namespace: &str) -> String {
    let Some(selector) = selector else {
        return String::new();
    };

    let mut selector = selector.clone();
    selector.insert(
        POD_NAMESPACE_SELECTOR_KEY.to_string(),
        namespace.to_string(),
    );

    selector
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}
