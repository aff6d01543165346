//! Outbound delivery of notifications to individual connections.
//!
//! - [`local::LocalChannels`]: WebSockets held by this process
//! - [`http::HttpTransport`]: connections held by an external gateway

pub mod http;
pub mod local;

use std::sync::Arc;

use async_trait::async_trait;
use convene_core::ConnectionId;
use thiserror::Error;

pub use http::HttpTransport;
pub use local::LocalChannels;

/// Per-connection delivery failure. Never fatal to a join.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The connection no longer exists on the transport.
    #[error("connection is gone")]
    Gone,

    /// The transport refused the payload.
    #[error("delivery rejected: {0}")]
    Rejected(String),

    /// The gateway could not be reached.
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl DeliveryError {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Gone => "gone",
            Self::Rejected(_) => "rejected",
            Self::Http(_) => "error",
        }
    }
}

/// Sends a serialized payload to one connection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `payload` (a JSON document) to `connection_id`.
    async fn deliver(
        &self,
        connection_id: &ConnectionId,
        payload: Arc<String>,
    ) -> Result<(), DeliveryError>;
}
