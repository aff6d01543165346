//! HTTP routes.
//!
//! - `POST /join`: gateway entry point (gateway delivery only). Body
//!   `{groupId, userId}`, connection id in the `x-connection-id` header.
//! - `GET /ws`: WebSocket upgrade (local delivery only)
//! - `GET /health`, `GET /metrics`

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use convene_core::ConnectionId;
use convene_core::wire::{Action, ActionResponse, JoinRequest};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::coordinator::join_response;
use crate::health::{self, HealthResponse};
use crate::metrics;
use crate::server::AppState;
use crate::websocket::session::{SessionContext, run_ws_session};

/// Header carrying the caller's connection id on `POST /join`.
pub const CONNECTION_ID_HEADER: &str = "x-connection-id";

/// Build the router for `state`.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler));
    // Local mode owns its connection ids; only sockets may register them.
    router = if state.channels.is_some() {
        router.route("/ws", get(ws_handler))
    } else {
        router.route("/join", post(join_handler))
    };
    router.layer(TraceLayer::new_for_http()).with_state(state)
}

fn reply(status: u16, body: ActionResponse) -> (StatusCode, Json<ActionResponse>) {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body))
}

/// POST /join
async fn join_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<ActionResponse>) {
    let Some(connection_id) = headers
        .get(CONNECTION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    else {
        return reply(
            400,
            ActionResponse::new(Action::JoinChat, "Missing x-connection-id header"),
        );
    };

    let request: JoinRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            debug!(error = %e, "malformed join body");
            return reply(
                400,
                ActionResponse::new(Action::JoinChat, format!("Invalid request: {e}")),
            );
        }
    };

    let result = state
        .coordinator
        .join_group(
            request.group_id,
            request.user_id,
            ConnectionId::from(connection_id),
        )
        .await;
    let (status, body) = join_response(&result);
    reply(status, body)
}

/// GET /ws
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let Some(channels) = state.channels.clone() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let ctx = SessionContext {
        coordinator: state.coordinator.clone(),
        channels,
        send_queue_capacity: state.config.send_queue_capacity,
        ping_interval: state.config.ping_interval(),
        pong_timeout: state.config.pong_timeout(),
        shutdown: state.shutdown.clone(),
    };
    let sessions = state.sessions.clone();
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| {
            sessions.track_future(run_ws_session(socket, ConnectionId::generate(), ctx))
        })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let (delivery, connections) = match &state.channels {
        Some(channels) => ("local", channels.connection_count().await),
        None => ("http", 0),
    };
    Json(health::health_check(state.start_time, delivery, connections))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => metrics::render(handle).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
