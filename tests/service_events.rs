//! Watch notifications for services and namespaces reaching the publisher

mod common;

use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use common::{FakeNamespaces, RecordingPublisher};
use fleet_agent::fleet::{ExternalServiceEvent, OutboundEvent};
use fleet_agent::watch::{Forwarder, NamespaceTranslator, ResourceWatcher, ServiceTranslator};
use k8s_openapi::api::core::v1::{Namespace, Service, ServiceSpec};
use kube::api::ObjectMeta;
use kube::runtime::watcher::Event;

fn service(resource_version: &str) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some("svc-a".to_string()),
            namespace: Some("default".to_string()),
            uid: Some("svc-uid-a".to_string()),
            resource_version: Some(resource_version.to_string()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(BTreeMap::from([("app".to_string(), "a".to_string())])),
            cluster_ip: Some("10.43.12.7".to_string()),
            ..Default::default()
        }),
        status: None,
    }
}

fn namespace(name: &str, uid: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            uid: Some(uid.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Wait for the publisher to hold `count` events
async fn published(publisher: &RecordingPublisher, count: usize) -> Vec<OutboundEvent> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let events = publisher.events.lock().unwrap();
                if events.len() >= count {
                    return events.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("events were not published")
}

fn external(event: &OutboundEvent) -> &ExternalServiceEvent {
    match event {
        OutboundEvent::ExternalService(e) => e,
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn added_service_carries_namespace_selector() {
    let namespaces = Arc::new(FakeNamespaces::with_namespace("default", "ns-uid-default"));
    let publisher = Arc::new(RecordingPublisher::default());
    let forwarder = Forwarder::new(
        "services",
        ServiceTranslator::new(namespaces.clone()),
        publisher.clone(),
    );

    let stream = futures::stream::iter(vec![Ok::<_, Infallible>(Event::Apply(service("1")))]);
    let handle = ResourceWatcher::watch_stream("services", stream, Arc::new(forwarder));

    let events = published(&publisher, 1).await;
    handle.stop().await;

    assert_eq!(*namespaces.lookups.lock().unwrap(), vec!["default".to_string()]);

    let event = external(&events[0]);
    assert_eq!(event.event_type, "service.create");

    let selector = event.service.selector_container.as_deref().unwrap();
    let entries: BTreeSet<&str> = selector.split(',').collect();
    assert_eq!(
        entries,
        BTreeSet::from(["app=a", "io.kubernetes.pod.namespace=default"])
    );

    let environment = event.environment.as_ref().unwrap();
    assert_eq!(
        environment.external_id.as_deref(),
        Some("kubernetes://ns-uid-default")
    );
}

#[tokio::test]
async fn service_lifecycle_maps_to_event_types() {
    let namespaces = Arc::new(FakeNamespaces::with_namespace("default", "ns-uid-default"));
    let publisher = Arc::new(RecordingPublisher::default());
    let forwarder = Forwarder::new(
        "services",
        ServiceTranslator::new(namespaces),
        publisher.clone(),
    );

    let stream = futures::stream::iter(vec![
        Ok::<_, Infallible>(Event::Apply(service("1"))),
        Ok(Event::Apply(service("2"))),
        Ok(Event::Delete(service("2"))),
    ]);
    let handle = ResourceWatcher::watch_stream("services", stream, Arc::new(forwarder));

    let events = published(&publisher, 3).await;
    handle.stop().await;

    let types: Vec<&str> = events
        .iter()
        .map(|e| external(e).event_type.as_str())
        .collect();
    assert_eq!(types, vec!["service.create", "service.update", "service.remove"]);
    assert!(events.iter().all(|e| external(e).external_id == "svc-uid-a"));
}

#[tokio::test]
async fn lookup_failure_drops_only_that_event() {
    // Only "default" is known to the lookup
    let namespaces = Arc::new(FakeNamespaces::with_namespace("default", "ns-uid-default"));
    let publisher = Arc::new(RecordingPublisher::default());
    let forwarder = Forwarder::new(
        "services",
        ServiceTranslator::new(namespaces),
        publisher.clone(),
    );

    let mut orphan = service("1");
    orphan.metadata.namespace = Some("gone".to_string());
    orphan.metadata.name = Some("svc-b".to_string());
    orphan.metadata.uid = Some("svc-uid-b".to_string());

    let stream = futures::stream::iter(vec![
        Ok::<_, Infallible>(Event::Apply(orphan)),
        Ok(Event::Apply(service("1"))),
    ]);
    let handle = ResourceWatcher::watch_stream("services", stream, Arc::new(forwarder));

    let events = published(&publisher, 1).await;
    handle.stop().await;

    assert_eq!(events.len(), 1);
    assert_eq!(external(&events[0]).external_id, "svc-uid-a");
}

#[tokio::test]
async fn only_namespace_removal_is_published() {
    let publisher = Arc::new(RecordingPublisher::default());
    let forwarder = Forwarder::new("namespaces", NamespaceTranslator, publisher.clone());

    let mut relabeled = namespace("team-a", "ns-uid-1");
    relabeled.metadata.labels = Some(BTreeMap::from([("tier".to_string(), "gold".to_string())]));

    let stream = futures::stream::iter(vec![
        Ok::<_, Infallible>(Event::Apply(namespace("team-a", "ns-uid-1"))),
        Ok(Event::Apply(relabeled)),
        Ok(Event::Delete(namespace("team-a", "ns-uid-1"))),
    ]);
    let handle = ResourceWatcher::watch_stream("namespaces", stream, Arc::new(forwarder));

    let events = published(&publisher, 1).await;
    handle.stop().await;

    assert_eq!(events.len(), 1);
    let event = external(&events[0]);
    assert_eq!(event.event_type, "stack.remove");
    assert_eq!(event.external_id, "kubernetes://ns-uid-1");
}
