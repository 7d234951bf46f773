//! Resource watches and their translation into fleet events
//!
//! Data flow: cluster watch API → [`ResourceWatcher`] → [`Forwarder`]
//! (an [`EventTranslator`] plus a [`Publisher`](crate::fleet::Publisher)).

pub mod handler;
pub mod registry;
pub mod translators;
pub mod watcher;

pub use handler::{object_key, ChangeType, EventTranslator, Forwarder, ResourceEventHandler};
pub use registry::{ResourceKindRegistry, WatchedKind, DEFAULT_WATCH_KINDS};
pub use translators::{GenericTranslator, NamespaceTranslator, ServiceTranslator};
pub use watcher::{ChangeTracker, Notification, ResourceWatcher, WatchHandle};
