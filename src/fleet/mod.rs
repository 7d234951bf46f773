//! Fleet platform collaborators: event publishing and the host lifecycle feed

pub mod hosts;
pub mod publisher;
pub mod types;

pub use hosts::{HostRecord, HostSource, HostState, MetadataClient, DEFAULT_METADATA_ADDRESS};
pub use publisher::{FleetClient, Publisher};
pub use types::{
    EnvironmentDescriptor, ExternalServiceEvent, OutboundEvent, Publish, PublishData,
    ServiceDescriptor,
};

#[cfg(test)]
pub use hosts::MockHostSource;
#[cfg(test)]
pub use publisher::MockPublisher;
