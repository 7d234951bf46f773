//! Node and namespace accessors used by the engine

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Node};
use kube::api::{Api, PostParams};
use kube::{Client, ResourceExt};
#[cfg(test)]
use mockall::automock;

use crate::error::Result;

/// Read and full-object replace of cluster nodes
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NodeClient: Send + Sync {
    async fn get(&self, name: &str) -> Result<Node>;

    /// Replace the node; the write carries the node's resourceVersion so a
    /// concurrent modification fails with a conflict.
    async fn replace(&self, node: &Node) -> Result<Node>;
}

/// Lookup of namespaces by name
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NamespaceLookup: Send + Sync {
    async fn get(&self, name: &str) -> Result<Namespace>;
}

#[derive(Clone)]
pub struct KubeNodeClient {
    api: Api<Node>,
}

impl KubeNodeClient {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl NodeClient for KubeNodeClient {
    async fn get(&self, name: &str) -> Result<Node> {
        Ok(self.api.get(name).await?)
    }

    async fn replace(&self, node: &Node) -> Result<Node> {
        Ok(self
            .api
            .replace(&node.name_any(), &PostParams::default(), node)
            .await?)
    }
}

#[derive(Clone)]
pub struct KubeNamespaceLookup {
    api: Api<Namespace>,
}

impl KubeNamespaceLookup {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl NamespaceLookup for KubeNamespaceLookup {
    async fn get(&self, name: &str) -> Result<Namespace> {
        Ok(self.api.get(name).await?)
    }
}
