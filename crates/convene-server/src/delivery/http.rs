//! Delivery through an external connection gateway.
//!
//! The gateway exposes a management endpoint per connection:
//! `POST <endpoint>/@connections/<connectionId>` with the payload as the
//! request body. `410 Gone` means the connection no longer exists.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use convene_core::ConnectionId;
use reqwest::StatusCode;
use tracing::debug;

use super::{DeliveryError, Transport};

/// Posts payloads to a connection gateway.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Create a transport for `endpoint` with a per-request `timeout`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, endpoint))
    }

    /// Create a transport around an existing client.
    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_owned();
        Self { client, endpoint }
    }

    /// Management URL for a connection.
    pub fn connection_url(&self, connection_id: &ConnectionId) -> String {
        format!("{}/@connections/{connection_id}", self.endpoint)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn deliver(
        &self,
        connection_id: &ConnectionId,
        payload: Arc<String>,
    ) -> Result<(), DeliveryError> {
        let url = self.connection_url(connection_id);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.as_str().to_owned())
            .send()
            .await?;

        let status = response.status();
        debug!(%connection_id, status = status.as_u16(), "gateway responded");
        if status.is_success() {
            Ok(())
        } else if status == StatusCode::GONE {
            Err(DeliveryError::Gone)
        } else {
            Err(DeliveryError::Rejected(format!("gateway returned {status}")))
        }
    }
}
