//! WebSocket message dispatch: parses an inbound frame and runs the action.

use convene_core::ConnectionId;
use convene_core::wire::{ActionResponse, InboundMessage, StatusReply};
use tracing::{debug, warn};

use crate::coordinator::{MembershipCoordinator, join_response};

/// Handle one inbound text frame and return the serialized reply.
pub async fn handle_message(
    message: &str,
    connection_id: &ConnectionId,
    coordinator: &MembershipCoordinator,
) -> String {
    let reply = match serde_json::from_str::<InboundMessage>(message) {
        Ok(InboundMessage::JoinChat(request)) => {
            debug!(%connection_id, group_id = %request.group_id, "joinChat received");
            let result = coordinator
                .join_group(request.group_id, request.user_id, connection_id.clone())
                .await;
            let (status_code, body) = join_response(&result);
            StatusReply { status_code, body }
        }
        Err(e) => {
            warn!(%connection_id, error = %e, "invalid inbound frame");
            StatusReply {
                status_code: 400,
                body: ActionResponse {
                    action: requested_action(message),
                    message: format!("Invalid request: {e}"),
                },
            }
        }
    };

    serde_json::to_string(&reply).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize reply");
        String::new()
    })
}

/// Best-effort `action` of a frame that failed to parse.
fn requested_action(message: &str) -> String {
    serde_json::from_str::<serde_json::Value>(message)
        .ok()
        .and_then(|v| v.get("action").and_then(|a| a.as_str()).map(str::to_owned))
        .unwrap_or_else(|| "unknown".into())
}
