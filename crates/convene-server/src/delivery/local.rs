//! In-process table of live WebSocket connections.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use convene_core::ConnectionId;
use tokio::sync::RwLock;
use tracing::debug;

use super::{DeliveryError, Transport};
use crate::websocket::connection::{ClientConnection, SendFailure};

/// Live WebSocket connections indexed by connection id.
pub struct LocalChannels {
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
}

impl LocalChannels {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection, replacing any with the same id.
    pub async fn add(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write().await;
        let _ = conns.insert(connection.id.clone(), connection);
    }

    /// Remove a connection. Returns whether it was present.
    pub async fn remove(&self, connection_id: &ConnectionId) -> bool {
        let mut conns = self.connections.write().await;
        conns.remove(connection_id).is_some()
    }

    /// Look up a connection.
    pub async fn get(&self, connection_id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        self.connections.read().await.get(connection_id).cloned()
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for LocalChannels {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for LocalChannels {
    async fn deliver(
        &self,
        connection_id: &ConnectionId,
        payload: Arc<String>,
    ) -> Result<(), DeliveryError> {
        let Some(conn) = self.get(connection_id).await else {
            debug!(%connection_id, "no live channel for connection");
            return Err(DeliveryError::Gone);
        };
        conn.send(payload).map_err(|failure| match failure {
            SendFailure::Full => DeliveryError::Rejected("send queue full".into()),
            SendFailure::Closed => DeliveryError::Gone,
        })
    }
}
