//! Publishing outbound events to the fleet platform API

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::types::OutboundEvent;
use crate::error::{Error, Result};

const PUBLISH_COLLECTION: &str = "publishes";
const EXTERNAL_SERVICE_EVENT_COLLECTION: &str = "externalserviceevents";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sink for outbound events.
///
/// Failures are returned to the caller; implementations decide whether they
/// retry internally.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, event: &OutboundEvent) -> Result<()>;
}

/// HTTP client for the fleet platform API
#[derive(Clone)]
pub struct FleetClient {
    client: Client,
    base_url: String,
    access_key: Option<String>,
    secret_key: Option<String>,
}

impl FleetClient {
    pub fn new(
        base_url: impl Into<String>,
        access_key: Option<String>,
        secret_key: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_key,
            secret_key,
        })
    }

    async fn create<T: Serialize + ?Sized>(&self, collection: &str, body: &T) -> Result<()> {
        let url = format!("{}/{}", self.base_url, collection);
        debug!("POST {}", url);

        let mut request = self.client.post(&url).json(body);
        if let Some(access_key) = &self.access_key {
            request = request.basic_auth(access_key, self.secret_key.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::PublishRejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Publisher for FleetClient {
    async fn publish(&self, event: &OutboundEvent) -> Result<()> {
        match event {
            OutboundEvent::Generic(publish) => self.create(PUBLISH_COLLECTION, publish).await,
            OutboundEvent::ExternalService(service_event) => {
                self.create(EXTERNAL_SERVICE_EVENT_COLLECTION, service_event)
                    .await
            }
        }
    }
}
