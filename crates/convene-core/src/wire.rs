//! JSON shapes exchanged with clients.
//!
//! Inbound frames carry an `action` discriminator. Replies to a join carry the
//! same `action` plus a human-readable `message`; on transports without a
//! status line the status code travels inside the body as `statusCode`.

use serde::{Deserialize, Serialize};

use crate::ids::{GroupId, UserId};

/// Known action names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Client asks to join a group.
    #[serde(rename = "joinChat")]
    JoinChat,
    /// Server tells a connection that a user joined its group.
    #[serde(rename = "userJoined")]
    UserJoined,
}

impl Action {
    /// Wire name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JoinChat => "joinChat",
            Self::UserJoined => "userJoined",
        }
    }
}

/// Body of a `joinChat` request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    /// Group to join.
    pub group_id: GroupId,
    /// User joining.
    pub user_id: UserId,
}

/// A parsed inbound frame.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "action")]
pub enum InboundMessage {
    /// `{"action":"joinChat","groupId":..,"userId":..}`
    #[serde(rename = "joinChat")]
    JoinChat(JoinRequest),
}

/// Response body: `{ action, message }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Action being answered.
    pub action: String,
    /// Human-readable outcome.
    pub message: String,
}

impl ActionResponse {
    /// Response to a known action.
    pub fn new(action: Action, message: impl Into<String>) -> Self {
        Self {
            action: action.as_str().to_owned(),
            message: message.into(),
        }
    }
}

/// Response body with the status code folded in, for WebSocket replies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReply {
    /// HTTP-equivalent status code.
    pub status_code: u16,
    /// The `{ action, message }` body.
    #[serde(flatten)]
    pub body: ActionResponse,
}

/// Notification fanned out to every connection of a group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserJoined {
    /// Always [`Action::UserJoined`].
    pub action: Action,
    /// The user who joined.
    pub user_id: UserId,
    /// The group joined.
    pub group_id: GroupId,
    /// Human-readable text.
    pub message: String,
}

impl UserJoined {
    /// Build the notification for `user` joining `group`.
    pub fn new(user_id: UserId, group_id: GroupId, message: impl Into<String>) -> Self {
        Self {
            action: Action::UserJoined,
            user_id,
            group_id,
            message: message.into(),
        }
    }
}

/// Default notification text for a join.
pub fn join_message(user: &UserId) -> String {
    format!("{user} has joined the chat")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_join_chat_frame() {
        let raw = r#"{"action":"joinChat","groupId":"g1","userId":"alice"}"#;
        let msg: InboundMessage = serde_json::from_str(raw).unwrap();
        let InboundMessage::JoinChat(req) = msg;
        assert_eq!(req.group_id.as_str(), "g1");
        assert_eq!(req.user_id.as_str(), "alice");
    }

    #[test]
    fn unknown_action_is_rejected() {
        let raw = r#"{"action":"sendMessage","groupId":"g1"}"#;
        assert!(serde_json::from_str::<InboundMessage>(raw).is_err());
    }

    #[test]
    fn join_frame_missing_user_is_rejected() {
        let raw = r#"{"action":"joinChat","groupId":"g1"}"#;
        assert!(serde_json::from_str::<InboundMessage>(raw).is_err());
    }

    #[test]
    fn status_reply_flattens_body() {
        let reply = StatusReply {
            status_code: 403,
            body: ActionResponse::new(Action::JoinChat, "nope"),
        };
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(
            value,
            json!({"statusCode": 403, "action": "joinChat", "message": "nope"})
        );
    }

    #[test]
    fn user_joined_shape() {
        let note = UserJoined::new(UserId::from("bob"), GroupId::from("g1"), "hi");
        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(
            value,
            json!({"action": "userJoined", "userId": "bob", "groupId": "g1", "message": "hi"})
        );
    }

    #[test]
    fn join_message_names_the_user() {
        assert_eq!(join_message(&UserId::from("bob")), "bob has joined the chat");
    }
}
