//! Translators from cluster objects to fleet events

mod generic;
mod namespace;
mod service;

pub use generic::GenericTranslator;
pub use namespace::NamespaceTranslator;
pub use service::{selector_string, ServiceTranslator};

/// Namespace whose environment is derived without a lookup
pub const SYSTEM_NAMESPACE: &str = "kube-system";

/// Selector key implicitly scoping service selectors to their namespace
pub const POD_NAMESPACE_SELECTOR_KEY: &str = "io.kubernetes.pod.namespace";

/// Label carrying the identifier assigned by the fleet platform
pub const FLEET_UUID_LABEL: &str = "io.rancher.uuid";
