use std::marker::PhantomData;

use async_trait::async_trait;
use kube::api::DynamicObject;
use kube::Resource;
use serde::Serialize;

use crate::error::Result;
use crate::fleet::types::RESOURCE_CHANGE_EVENT;
use crate::fleet::{OutboundEvent, Publish, PublishData};
use crate::watch::handler::{ChangeType, EventTranslator};

/// Wraps any object and its change type in the generic envelope
pub struct GenericTranslator<K = DynamicObject> {
    _resource: PhantomData<fn() -> K>,
}

impl<K> GenericTranslator<K> {
    pub fn new() -> Self {
        Self {
            _resource: PhantomData,
        }
    }
}

impl<K> Default for GenericTranslator<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K> EventTranslator for GenericTranslator<K>
where
    K: Resource + Serialize + Send + Sync,
{
    type Resource = K;

    async fn translate(&self, obj: &K, change: ChangeType) -> Result<Option<OutboundEvent>> {
        Ok(Some(OutboundEvent::Generic(Publish {
            name: RESOURCE_CHANGE_EVENT.to_string(),
            data: PublishData {
                event_type: change.as_str().to_string(),
                object: serde_json::to_value(obj)?,
            },
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::{ApiResource, ObjectMeta};
    use k8s_openapi::api::core::v1::Secret;

    fn secret() -> DynamicObject {
        let resource = ApiResource::erase::<Secret>(&());
        let mut obj = DynamicObject::new("db-creds", &resource).within("default");
        obj.metadata = ObjectMeta {
            name: Some("db-creds".to_string()),
            namespace: Some("default".to_string()),
            uid: Some("uid-9".to_string()),
            ..Default::default()
        };
        obj
    }

    #[tokio::test]
    async fn test_object_wrapped_verbatim() {
        let translator = GenericTranslator::<DynamicObject>::new();
        for (change, expected) in [
            (ChangeType::Added, "ADDED"),
            (ChangeType::Modified, "MODIFIED"),
            (ChangeType::Deleted, "DELETED"),
        ] {
            let event = translator.translate(&secret(), change).await.unwrap();
            match event {
                Some(OutboundEvent::Generic(publish)) => {
                    assert_eq!(publish.name, "service.kubernetes.change");
                    assert_eq!(publish.data.event_type, expected);
                    assert_eq!(publish.data.object["kind"], "Secret");
                    assert_eq!(publish.data.object["metadata"]["uid"], "uid-9");
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }
}
