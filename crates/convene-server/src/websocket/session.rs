//! WebSocket session lifecycle: handles a single connected client from
//! upgrade through disconnect.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket};
use convene_core::ConnectionId;
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::handler::handle_message;
use crate::coordinator::MembershipCoordinator;
use crate::delivery::LocalChannels;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL};

/// Everything a session needs besides its socket.
#[derive(Clone)]
pub struct SessionContext {
    /// Runs joins.
    pub coordinator: Arc<MembershipCoordinator>,
    /// Table the session registers its outbound channel in.
    pub channels: Arc<LocalChannels>,
    /// Outbound queue depth.
    pub send_queue_capacity: usize,
    /// Interval between server-initiated pings.
    pub ping_interval: Duration,
    /// Disconnect after this long without a pong.
    pub pong_timeout: Duration,
    /// Server shutdown signal.
    pub shutdown: CancellationToken,
}

/// Greeting sent as the first frame of every session.
pub fn established_message(connection_id: &ConnectionId) -> serde_json::Value {
    serde_json::json!({
        "type": "connection.established",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "data": {
            "connectionId": connection_id,
        },
    })
}

/// Run a WebSocket session for a connected client.
///
/// 1. Registers the outbound channel and sends `connection.established`
/// 2. Dispatches inbound text frames (`joinChat`)
/// 3. Forwards replies and notifications through the bounded send queue
/// 4. Pings periodically and disconnects unresponsive clients
/// 5. On close, drops the live channel and the registry record
#[instrument(skip_all, fields(%connection_id))]
pub async fn run_ws_session(ws: WebSocket, connection_id: ConnectionId, ctx: SessionContext) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(ctx.send_queue_capacity.max(1));
    let connection = Arc::new(ClientConnection::new(connection_id.clone(), send_tx));

    let started = Instant::now();
    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    ctx.channels.add(Arc::clone(&connection)).await;

    if let Ok(json) = serde_json::to_string(&established_message(&connection_id)) {
        let _ = ws_tx.send(Message::Text(json.into())).await;
    }

    let outbound_conn = Arc::clone(&connection);
    let ping_every = ctx.ping_interval;
    let pong_timeout = ctx.pong_timeout;
    let outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(ping_every);
        // Skip the immediate first tick
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text((*text).clone().into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if !outbound_conn.check_alive()
                        && outbound_conn.last_pong_elapsed() > pong_timeout
                    {
                        warn!(?pong_timeout, "client unresponsive, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = ws_tx.close().await;
    });

    loop {
        let msg = tokio::select! {
            msg = ws_rx.next() => msg,
            () = ctx.shutdown.cancelled() => {
                debug!("server shutting down, closing session");
                break;
            }
        };
        let Some(Ok(msg)) = msg else { break };

        let text = match msg {
            Message::Text(t) => t.to_string(),
            Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s,
                Err(_) => {
                    info!(len = data.len(), "received non-UTF8 binary frame");
                    continue;
                }
            },
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                connection.mark_alive();
                continue;
            }
        };
        connection.mark_alive();

        let reply = handle_message(&text, &connection_id, &ctx.coordinator).await;
        if connection.send(Arc::new(reply)).is_err() {
            info!("failed to enqueue reply (queue full or closed)");
        }
    }

    info!(
        dropped = connection.drop_count(),
        duration_secs = started.elapsed().as_secs(),
        "client disconnected"
    );
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    outbound.abort();
    let _ = ctx.channels.remove(&connection_id).await;
    if let Err(e) = ctx.coordinator.registry().remove(&connection_id).await {
        warn!(error = %e, "failed to remove connection record");
    }
}
