//! The two persisted record shapes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::{ConnectionId, GroupId, UserId};

/// A chat group: its fixed member list and the users currently connected.
///
/// `users_connected` grows through joins and stays a subset of `members`:
/// rewriting the member list drops connected users who are no longer on it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    /// Primary key.
    pub group_id: GroupId,
    /// Users allowed to join.
    #[serde(rename = "membersList")]
    pub members: BTreeSet<UserId>,
    /// Users believed to be connected right now.
    pub users_connected: BTreeSet<UserId>,
}

impl GroupRecord {
    /// A group with the given members and nobody connected.
    pub fn new(group_id: GroupId, members: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            group_id,
            members: members.into_iter().collect(),
            users_connected: BTreeSet::new(),
        }
    }

    /// Whether `user` is on the member list.
    pub fn is_member(&self, user: &UserId) -> bool {
        self.members.contains(user)
    }

    /// Whether `user` is in the connected set.
    pub fn is_connected(&self, user: &UserId) -> bool {
        self.users_connected.contains(user)
    }
}

/// One live transport connection and the (group, user) occupying it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    /// Primary key, assigned by the transport.
    pub connection_id: ConnectionId,
    /// Group the connection joined.
    pub group_id: GroupId,
    /// User occupying the connection.
    pub user_id: UserId,
    /// RFC 3339 registration time.
    pub connected_at: String,
}
