//! In-memory stand-ins for the cluster and fleet collaborators

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use fleet_agent::cluster::{DrainCommand, NamespaceLookup, NodeClient};
use fleet_agent::fleet::{HostRecord, HostSource, OutboundEvent, Publisher};
use fleet_agent::{Error, Result};
use k8s_openapi::api::core::v1::{Namespace, Node, NodeSpec};
use kube::api::ObjectMeta;
use kube::ResourceExt;

fn not_found(kind: &str, name: &str) -> Error {
    Error::KubeError(kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{kind} \"{name}\" not found"),
        reason: "NotFound".to_string(),
        code: 404,
    }))
}

/// Node store with a write counter
#[derive(Default)]
pub struct FakeNodes {
    nodes: Mutex<BTreeMap<String, Node>>,
    writes: Mutex<u32>,
}

impl FakeNodes {
    pub fn with_node(name: &str) -> Self {
        let fake = Self::default();
        fake.nodes.lock().unwrap().insert(
            name.to_string(),
            Node {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    ..Default::default()
                },
                spec: Some(NodeSpec::default()),
                status: None,
            },
        );
        fake
    }

    pub fn node(&self, name: &str) -> Node {
        self.nodes.lock().unwrap()[name].clone()
    }

    pub fn unschedulable(&self, name: &str) -> bool {
        self.node(name)
            .spec
            .and_then(|spec| spec.unschedulable)
            .unwrap_or(false)
    }

    pub fn writes(&self) -> u32 {
        *self.writes.lock().unwrap()
    }
}

#[async_trait]
impl NodeClient for FakeNodes {
    async fn get(&self, name: &str) -> Result<Node> {
        self.nodes
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| not_found("nodes", name))
    }

    async fn replace(&self, node: &Node) -> Result<Node> {
        *self.writes.lock().unwrap() += 1;
        self.nodes
            .lock()
            .unwrap()
            .insert(node.name_any(), node.clone());
        Ok(node.clone())
    }
}

/// Drain procedure that records the hosts it was run against
#[derive(Default)]
pub struct FakeDrain {
    pub drained: Mutex<Vec<String>>,
}

impl FakeDrain {
    pub fn invocations(&self) -> usize {
        self.drained.lock().unwrap().len()
    }
}

#[async_trait]
impl DrainCommand for FakeDrain {
    async fn drain(&self, hostname: &str) -> Result<()> {
        self.drained.lock().unwrap().push(hostname.to_string());
        Ok(())
    }
}

/// Host feed whose snapshot can be swapped between ticks
#[derive(Default)]
pub struct FakeHosts {
    hosts: Mutex<Vec<HostRecord>>,
}

impl FakeHosts {
    pub fn set(&self, hosts: Vec<HostRecord>) {
        *self.hosts.lock().unwrap() = hosts;
    }
}

#[async_trait]
impl HostSource for FakeHosts {
    async fn hosts(&self) -> Result<Vec<HostRecord>> {
        Ok(self.hosts.lock().unwrap().clone())
    }
}

/// Namespace lookup that records every requested name
#[derive(Default)]
pub struct FakeNamespaces {
    namespaces: BTreeMap<String, Namespace>,
    pub lookups: Mutex<Vec<String>>,
}

impl FakeNamespaces {
    pub fn with_namespace(name: &str, uid: &str) -> Self {
        let mut fake = Self::default();
        fake.namespaces.insert(
            name.to_string(),
            Namespace {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    uid: Some(uid.to_string()),
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        fake
    }
}

#[async_trait]
impl NamespaceLookup for FakeNamespaces {
    async fn get(&self, name: &str) -> Result<Namespace> {
        self.lookups.lock().unwrap().push(name.to_string());
        self.namespaces
            .get(name)
            .cloned()
            .ok_or_else(|| not_found("namespaces", name))
    }
}

/// Publisher that keeps everything it was given
#[derive(Default)]
pub struct RecordingPublisher {
    pub events: Mutex<Vec<OutboundEvent>>,
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, event: &OutboundEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
