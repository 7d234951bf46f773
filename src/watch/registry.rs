//! Registry of resource kinds that can be watched by name

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{
    Namespace, PersistentVolume, PersistentVolumeClaim, Pod, ReplicationController, Secret,
    Service,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::api::{Api, ApiResource, DynamicObject};
use kube::{Client, Resource};

use crate::error::{Error, Result};

/// Kinds watched when none are configured
pub const DEFAULT_WATCH_KINDS: &[&str] = &[
    "namespaces",
    "services",
    "replicationcontrollers",
    "pods",
    "deployments",
    "replicasets",
    "ingresses",
    "jobs",
    "horizontalpodautoscalers",
    "persistentvolumes",
    "persistentvolumeclaims",
    "secrets",
];

/// A registered kind: its name, API coordinates and scope
#[derive(Clone, Debug)]
pub struct WatchedKind {
    pub name: String,
    pub resource: ApiResource,
    pub namespaced: bool,
}

impl WatchedKind {
    pub fn namespaced<K>(name: &str) -> Self
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        Self {
            name: name.to_string(),
            resource: ApiResource::erase::<K>(&()),
            namespaced: true,
        }
    }

    pub fn cluster<K>(name: &str) -> Self
    where
        K: Resource<DynamicType = (), Scope = ClusterResourceScope>,
    {
        Self {
            name: name.to_string(),
            resource: ApiResource::erase::<K>(&()),
            namespaced: false,
        }
    }

    /// Untyped API for this kind, optionally restricted to one namespace.
    ///
    /// The namespace is ignored for cluster scoped kinds.
    pub fn api(&self, client: Client, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(ns) if self.namespaced => Api::namespaced_with(client, ns, &self.resource),
            _ => Api::all_with(client, &self.resource),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResourceKindRegistry {
    kinds: BTreeMap<String, WatchedKind>,
}

impl ResourceKindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with every kind in [`DEFAULT_WATCH_KINDS`]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(WatchedKind::cluster::<Namespace>("namespaces"));
        registry.register(WatchedKind::namespaced::<Service>("services"));
        registry.register(WatchedKind::namespaced::<ReplicationController>(
            "replicationcontrollers",
        ));
        registry.register(WatchedKind::namespaced::<Pod>("pods"));
        registry.register(WatchedKind::namespaced::<Deployment>("deployments"));
        registry.register(WatchedKind::namespaced::<ReplicaSet>("replicasets"));
        registry.register(WatchedKind::namespaced::<Ingress>("ingresses"));
        registry.register(WatchedKind::namespaced::<Job>("jobs"));
        registry.register(WatchedKind::namespaced::<HorizontalPodAutoscaler>(
            "horizontalpodautoscalers",
        ));
        registry.register(WatchedKind::cluster::<PersistentVolume>("persistentvolumes"));
        registry.register(WatchedKind::namespaced::<PersistentVolumeClaim>(
            "persistentvolumeclaims",
        ));
        registry.register(WatchedKind::namespaced::<Secret>("secrets"));
        registry
    }

    /// Add or replace a kind
    pub fn register(&mut self, kind: WatchedKind) {
        self.kinds.insert(kind.name.clone(), kind);
    }

    pub fn get(&self, name: &str) -> Option<&WatchedKind> {
        self.kinds.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    /// Look up every name, failing on the first unknown one
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<WatchedKind>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name)
                    .cloned()
                    .ok_or_else(|| Error::UnknownResourceKind(name.to_string()))
            })
            .collect()
    }
}
