//! Membership coordinator: validates and executes a join.
//!
//! A join runs four steps in order:
//! 1. load the group (`GroupNotFound` if absent)
//! 2. check the user is on the member list (`NotAuthorized` otherwise)
//! 3. add the user to the connected set (atomic, idempotent)
//! 4. register the connection, then fan out a `userJoined` notification
//!
//! A store failure in steps 1, 3 or 4 aborts the join with `Internal`.
//! Nothing already written is rolled back. Fanout failures never fail the join.

use std::sync::Arc;

use convene_core::wire::{Action, ActionResponse, join_message};
use convene_core::{ConnectionId, ConnectionRecord, GroupId, UserId};
use convene_store::{ConnectionRegistry, GroupStore, StoreError};
use metrics::counter;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::delivery::Transport;
use crate::fanout::{BroadcastFanout, FanoutReport};
use crate::metrics::JOINS_TOTAL;

/// Client-facing text for a successful join.
pub const JOINED_MESSAGE: &str = "Joined chat successfully";
/// Client-facing text for a missing group.
pub const GROUP_NOT_FOUND_MESSAGE: &str = "Group not found";
/// Client-facing text for a non-member.
pub const NOT_AUTHORIZED_MESSAGE: &str = "User is not a member of this group";
/// Client-facing text for any internal failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Failed to join chat";

/// Why a join did not happen.
#[derive(Debug, Error)]
pub enum JoinError {
    /// No record exists for the group.
    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    /// The user is not on the group's member list.
    #[error("user {user_id} is not a member of group {group_id}")]
    NotAuthorized {
        /// Group the user tried to join.
        group_id: GroupId,
        /// Rejected user.
        user_id: UserId,
    },

    /// A store operation failed. The cause is logged, not shown to clients.
    #[error("join failed: {0}")]
    Internal(#[from] StoreError),
}

impl JoinError {
    /// HTTP-equivalent status code.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::GroupNotFound(_) => 404,
            Self::NotAuthorized { .. } => 403,
            Self::Internal(_) => 500,
        }
    }

    /// Message safe to show the client.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::GroupNotFound(_) => GROUP_NOT_FOUND_MESSAGE,
            Self::NotAuthorized { .. } => NOT_AUTHORIZED_MESSAGE,
            Self::Internal(_) => INTERNAL_ERROR_MESSAGE,
        }
    }

    fn outcome(&self) -> &'static str {
        match self {
            Self::GroupNotFound(_) => "group_not_found",
            Self::NotAuthorized { .. } => "not_authorized",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// A successful join.
#[derive(Debug)]
pub struct JoinReceipt {
    /// Group joined.
    pub group_id: GroupId,
    /// User who joined.
    pub user_id: UserId,
    /// Connection registered for the user.
    pub connection_id: ConnectionId,
    /// `false` if the user was already in the connected set.
    pub newly_connected: bool,
    /// What happened during notification.
    pub fanout: FanoutReport,
}

/// Status code and `{ action, message }` body for a join result.
pub fn join_response(result: &Result<JoinReceipt, JoinError>) -> (u16, ActionResponse) {
    match result {
        Ok(_) => (200, ActionResponse::new(Action::JoinChat, JOINED_MESSAGE)),
        Err(e) => (
            e.status_code(),
            ActionResponse::new(Action::JoinChat, e.client_message()),
        ),
    }
}

/// Executes joins against the two stores and the delivery transport.
#[derive(Clone)]
pub struct MembershipCoordinator {
    groups: Arc<dyn GroupStore>,
    registry: Arc<dyn ConnectionRegistry>,
    fanout: BroadcastFanout,
}

impl MembershipCoordinator {
    /// Wire a coordinator from its collaborators.
    pub fn new(
        groups: Arc<dyn GroupStore>,
        registry: Arc<dyn ConnectionRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let fanout = BroadcastFanout::new(Arc::clone(&registry), transport);
        Self {
            groups,
            registry,
            fanout,
        }
    }

    /// Connection registry this coordinator writes to.
    pub fn registry(&self) -> &Arc<dyn ConnectionRegistry> {
        &self.registry
    }

    /// Join `user_id` to `group_id` over `connection_id`.
    #[instrument(skip_all, fields(%group_id, %user_id, %connection_id))]
    pub async fn join_group(
        &self,
        group_id: GroupId,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> Result<JoinReceipt, JoinError> {
        let result = self.try_join(group_id, user_id, connection_id).await;
        match &result {
            Ok(receipt) => {
                counter!(JOINS_TOTAL, "outcome" => "joined").increment(1);
                info!(
                    newly_connected = receipt.newly_connected,
                    attempted = receipt.fanout.attempted,
                    failed = receipt.fanout.failures.len(),
                    "user joined"
                );
            }
            Err(e) => {
                counter!(JOINS_TOTAL, "outcome" => e.outcome()).increment(1);
                if let JoinError::Internal(cause) = e {
                    error!(error = %cause, "join failed");
                } else {
                    info!(reason = %e, "join refused");
                }
            }
        }
        result
    }

    async fn try_join(
        &self,
        group_id: GroupId,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> Result<JoinReceipt, JoinError> {
        let Some(group) = self.groups.get(&group_id).await? else {
            return Err(JoinError::GroupNotFound(group_id));
        };

        if !group.is_member(&user_id) {
            return Err(JoinError::NotAuthorized { group_id, user_id });
        }

        let newly_connected = match self.groups.add_connected_user(&group_id, &user_id).await {
            Ok(added) => added,
            // Removed between the read and the write.
            Err(StoreError::GroupNotFound(_)) => return Err(JoinError::GroupNotFound(group_id)),
            Err(e) => return Err(e.into()),
        };

        self.registry
            .register(ConnectionRecord {
                connection_id: connection_id.clone(),
                group_id: group_id.clone(),
                user_id: user_id.clone(),
                connected_at: chrono::Utc::now().to_rfc3339(),
            })
            .await?;

        let fanout = self
            .fanout
            .broadcast_joined(&group_id, &user_id, &join_message(&user_id))
            .await;

        Ok(JoinReceipt {
            group_id,
            user_id,
            connection_id,
            newly_connected,
            fanout,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
