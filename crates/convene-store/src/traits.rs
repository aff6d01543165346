//! Async seams the membership coordinator depends on.
//!
//! The server only ever sees these traits, so tests can substitute failing
//! or recording implementations.

use async_trait::async_trait;
use convene_core::{ConnectionId, ConnectionRecord, GroupId, GroupRecord, UserId};

use crate::errors::Result;

/// Keyed storage of group records.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Fetch a group, `None` if it does not exist.
    async fn get(&self, group_id: &GroupId) -> Result<Option<GroupRecord>>;

    /// Atomically add `user_id` to the group's connected set.
    ///
    /// Returns whether the user was newly added. Concurrent calls for
    /// different users must all be reflected.
    async fn add_connected_user(&self, group_id: &GroupId, user_id: &UserId) -> Result<bool>;
}

/// Keyed storage of connection records with lookup by group.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Record a live connection.
    async fn register(&self, record: ConnectionRecord) -> Result<()>;

    /// All connections currently registered for `group_id`.
    async fn list_by_group(&self, group_id: &GroupId) -> Result<Vec<ConnectionRecord>>;

    /// Forget a connection. Returns whether it was present.
    async fn remove(&self, connection_id: &ConnectionId) -> Result<bool>;
}
