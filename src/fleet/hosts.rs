//! Host lifecycle feed from the fleet metadata service

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::error::Result;

/// Metadata API version path used for host lookups
const METADATA_VERSION_PATH: &str = "2015-12-19";

pub const DEFAULT_METADATA_ADDRESS: &str = "169.254.169.250";

const ACTIVATING_STATE: &str = "activating";
const DEACTIVATING_STATE: &str = "deactivating";
const EVACUATING_STATE: &str = "evacuating";

/// Lifecycle intent declared for a host by the fleet platform
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostState {
    Active,
    Inactive,
    Evicted,
    /// Any state without a scheduling action
    Other(String),
}

impl HostState {
    pub fn parse(state: &str) -> Self {
        match state {
            ACTIVATING_STATE => HostState::Active,
            DEACTIVATING_STATE => HostState::Inactive,
            EVACUATING_STATE => HostState::Evicted,
            other => HostState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostState::Active => f.write_str(ACTIVATING_STATE),
            HostState::Inactive => f.write_str(DEACTIVATING_STATE),
            HostState::Evicted => f.write_str(EVACUATING_STATE),
            HostState::Other(s) => f.write_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for HostState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(HostState::parse(raw.as_deref().unwrap_or_default()))
    }
}

/// A host as reported in the metadata host list
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct HostRecord {
    pub hostname: String,
    #[serde(default = "unknown_state")]
    pub state: HostState,
}

fn unknown_state() -> HostState {
    HostState::Other(String::new())
}

impl HostRecord {
    pub fn new(hostname: impl Into<String>, state: HostState) -> Self {
        Self {
            hostname: hostname.into(),
            state,
        }
    }
}

/// Source of host snapshots
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HostSource: Send + Sync {
    async fn hosts(&self) -> Result<Vec<HostRecord>>;
}

/// Client for the fleet metadata service
#[derive(Clone)]
pub struct MetadataClient {
    client: Client,
    base_url: String,
}

impl MetadataClient {
    /// Build a client for a metadata address such as `169.254.169.250`
    pub fn new(address: &str) -> Result<Self> {
        Self::with_base_url(format!("http://{address}/{METADATA_VERSION_PATH}"))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl HostSource for MetadataClient {
    async fn hosts(&self) -> Result<Vec<HostRecord>> {
        let url = format!("{}/hosts", self.base_url);
        debug!("Fetching host list from {}", url);

        let hosts = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<HostRecord>>()
            .await?;
        Ok(hosts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_state_parsing() {
        assert_eq!(HostState::parse("activating"), HostState::Active);
        assert_eq!(HostState::parse("deactivating"), HostState::Inactive);
        assert_eq!(HostState::parse("evacuating"), HostState::Evicted);
        assert_eq!(
            HostState::parse("active"),
            HostState::Other("active".to_string())
        );
    }

    #[tokio::test]
    async fn test_hosts_fetched_from_metadata() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2015-12-19/hosts"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[
                    {"hostname": "node-1", "state": "activating", "uuid": "h1"},
                    {"hostname": "node-2", "state": "evacuating"},
                    {"hostname": "node-3", "state": null},
                    {"hostname": "node-4"}
                ]"#,
            ))
            .mount(&mock_server)
            .await;

        let client =
            MetadataClient::with_base_url(format!("{}/2015-12-19", mock_server.uri())).unwrap();
        let hosts = client.hosts().await.unwrap();

        assert_eq!(
            hosts,
            vec![
                HostRecord::new("node-1", HostState::Active),
                HostRecord::new("node-2", HostState::Evicted),
                HostRecord::new("node-3", HostState::Other(String::new())),
                HostRecord::new("node-4", HostState::Other(String::new())),
            ]
        );
    }

    #[tokio::test]
    async fn test_metadata_error_status_is_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = MetadataClient::with_base_url(mock_server.uri()).unwrap();
        assert!(client.hosts().await.is_err());
    }
}
