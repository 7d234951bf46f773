use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::ResourceExt;
use tracing::info;

use crate::error::{Error, Result};
use crate::fleet::types::{ENVIRONMENT_KIND, EXTERNAL_ID_PREFIX, STACK_REMOVE};
use crate::fleet::{EnvironmentDescriptor, ExternalServiceEvent, OutboundEvent, ServiceDescriptor};
use crate::watch::handler::{ChangeType, EventTranslator};

/// Forwards namespace removals; additions and metadata changes are ignored
#[derive(Clone, Copy, Debug, Default)]
pub struct NamespaceTranslator;

#[async_trait]
impl EventTranslator for NamespaceTranslator {
    type Resource = Namespace;

    async fn translate(&self, ns: &Namespace, change: ChangeType) -> Result<Option<OutboundEvent>> {
        if change != ChangeType::Deleted {
            info!("Skipping event: [{}] for namespace: {}", change, ns.name_any());
            return Ok(None);
        }

        let uid = ns.uid().ok_or_else(|| {
            Error::MissingMetadata(format!("namespace {} has no uid", ns.name_any()))
        })?;

        Ok(Some(OutboundEvent::ExternalService(ExternalServiceEvent {
            external_id: format!("{EXTERNAL_ID_PREFIX}{uid}"),
            event_type: STACK_REMOVE.to_string(),
            service: ServiceDescriptor::kind_only(),
            environment: Some(EnvironmentDescriptor {
                kind: Some(ENVIRONMENT_KIND.to_string()),
                ..Default::default()
            }),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;

    fn namespace() -> Namespace {
        Namespace {
            metadata: ObjectMeta {
                name: Some("team-a".to_string()),
                uid: Some("ns-uid-1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_and_modify_not_forwarded() {
        let translator = NamespaceTranslator;
        assert!(translator
            .translate(&namespace(), ChangeType::Added)
            .await
            .unwrap()
            .is_none());
        assert!(translator
            .translate(&namespace(), ChangeType::Modified)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_emits_stack_remove() {
        let event = NamespaceTranslator
            .translate(&namespace(), ChangeType::Deleted)
            .await
            .unwrap();

        match event {
            Some(OutboundEvent::ExternalService(e)) => {
                assert_eq!(e.event_type, "stack.remove");
                assert_eq!(e.external_id, "kubernetes://ns-uid-1");
                assert_eq!(e.service.kind, "kubernetesService");
                assert_eq!(
                    e.environment.and_then(|env| env.kind).as_deref(),
                    Some("environment")
                );
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_without_uid_fails() {
        let mut ns = namespace();
        ns.metadata.uid = None;
        assert!(NamespaceTranslator
            .translate(&ns, ChangeType::Deleted)
            .await
            .is_err());
    }
}
