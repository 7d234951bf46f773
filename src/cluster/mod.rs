//! Cluster-side collaborators: client construction, credentials, node and
//! namespace access, and the external drain procedure.

mod client;
pub mod credentials;
pub mod drain;
pub mod nodes;

pub use client::connect;
pub use credentials::Credentials;
pub use drain::{DrainCommand, KubectlDrain, DEFAULT_DRAIN_TIMEOUT};
pub use nodes::{KubeNamespaceLookup, KubeNodeClient, NamespaceLookup, NodeClient};

#[cfg(test)]
pub use drain::MockDrainCommand;
#[cfg(test)]
pub use nodes::{MockNamespaceLookup, MockNodeClient};
