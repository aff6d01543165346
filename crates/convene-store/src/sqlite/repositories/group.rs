//! Group repository: group rows, member lists and the connected-user set.
//!
//! A group is spread over three tables. `groups` carries identity,
//! `group_members` the member list and `group_connected_users` the set of
//! users who have joined. The connected set is keyed by `(group_id, user_id)`
//! so adding a user is a single `INSERT OR IGNORE`.

use std::collections::BTreeSet;

use convene_core::{GroupId, GroupRecord, UserId};
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::{Result, StoreError};

/// Group repository. Stateless; every method takes `&Connection`.
pub struct GroupRepo;

impl GroupRepo {
    /// Fetch a group with its members and connected users.
    pub fn get(conn: &Connection, group_id: &GroupId) -> Result<Option<GroupRecord>> {
        if !Self::exists(conn, group_id)? {
            return Ok(None);
        }

        let members = Self::user_set(
            conn,
            "SELECT user_id FROM group_members WHERE group_id = ?1",
            group_id,
        )?;
        let users_connected = Self::user_set(
            conn,
            "SELECT user_id FROM group_connected_users WHERE group_id = ?1",
            group_id,
        )?;

        Ok(Some(GroupRecord {
            group_id: group_id.clone(),
            members,
            users_connected,
        }))
    }

    /// Create the group, or replace the member list of an existing one.
    ///
    /// The connected set is merged with `record.users_connected`, then any
    /// connected user no longer on the member list is dropped.
    pub fn upsert(conn: &Connection, record: &GroupRecord) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let tx = conn.unchecked_transaction()?;

        let _ = tx.execute(
            "INSERT OR IGNORE INTO groups (group_id, created_at) VALUES (?1, ?2)",
            params![record.group_id.as_str(), now],
        )?;
        let _ = tx.execute(
            "DELETE FROM group_members WHERE group_id = ?1",
            params![record.group_id.as_str()],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO group_members (group_id, user_id) VALUES (?1, ?2)",
            )?;
            for member in &record.members {
                let _ = insert.execute(params![record.group_id.as_str(), member.as_str()])?;
            }
            let mut connect = tx.prepare(
                "INSERT OR IGNORE INTO group_connected_users (group_id, user_id, joined_at)
                 VALUES (?1, ?2, ?3)",
            )?;
            for user in &record.users_connected {
                let _ = connect.execute(params![record.group_id.as_str(), user.as_str(), now])?;
            }
        }
        let pruned = tx.execute(
            "DELETE FROM group_connected_users
             WHERE group_id = ?1
               AND user_id NOT IN (SELECT user_id FROM group_members WHERE group_id = ?1)",
            params![record.group_id.as_str()],
        )?;
        if pruned > 0 {
            tracing::debug!(group_id = %record.group_id, pruned, "dropped connected non-members");
        }

        tx.commit()?;
        Ok(())
    }

    /// Add `user_id` to the group's connected set.
    ///
    /// Returns `true` if the user was newly added, `false` if already present.
    /// Fails with [`StoreError::GroupNotFound`] when the group has no row.
    pub fn add_connected_user(
        conn: &Connection,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<bool> {
        if !Self::exists(conn, group_id)? {
            return Err(StoreError::GroupNotFound(group_id.to_string()));
        }

        let changed = conn.execute(
            "INSERT OR IGNORE INTO group_connected_users (group_id, user_id, joined_at)
             VALUES (?1, ?2, ?3)",
            params![
                group_id.as_str(),
                user_id.as_str(),
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        Ok(changed > 0)
    }

    /// All group ids, sorted.
    pub fn list_ids(conn: &Connection) -> Result<Vec<GroupId>> {
        let mut stmt = conn.prepare("SELECT group_id FROM groups ORDER BY group_id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|r| r.map(GroupId::from))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn exists(conn: &Connection, group_id: &GroupId) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM groups WHERE group_id = ?1",
                params![group_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn user_set(conn: &Connection, sql: &str, group_id: &GroupId) -> Result<BTreeSet<UserId>> {
        let mut stmt = conn.prepare(sql)?;
        let users = stmt
            .query_map(params![group_id.as_str()], |row| row.get::<_, String>(0))?
            .map(|r| r.map(UserId::from))
            .collect::<std::result::Result<BTreeSet<_>, _>>()?;
        Ok(users)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::migrations::run_migrations;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        let _ = run_migrations(&conn).unwrap();
        conn
    }

    fn users(names: &[&str]) -> Vec<UserId> {
        names.iter().copied().map(UserId::from).collect()
    }

    fn seed(conn: &Connection, id: &str, members: &[&str]) -> GroupId {
        let group_id = GroupId::from(id);
        GroupRepo::upsert(conn, &GroupRecord::new(group_id.clone(), users(members))).unwrap();
        group_id
    }

    #[test]
    fn get_missing_group_is_none() {
        let conn = setup();
        assert!(GroupRepo::get(&conn, &GroupId::from("nope")).unwrap().is_none());
    }

    #[test]
    fn upsert_then_get() {
        let conn = setup();
        let g = seed(&conn, "g1", &["alice", "bob"]);

        let record = GroupRepo::get(&conn, &g).unwrap().unwrap();
        assert_eq!(record.group_id, g);
        assert_eq!(record.members.len(), 2);
        assert!(record.is_member(&UserId::from("alice")));
        assert!(record.users_connected.is_empty());
    }

    #[test]
    fn upsert_keeps_connected_members() {
        let conn = setup();
        let g = seed(&conn, "g1", &["alice", "bob"]);
        assert!(GroupRepo::add_connected_user(&conn, &g, &UserId::from("alice")).unwrap());

        let _ = seed(&conn, "g1", &["alice", "carol"]);
        let record = GroupRepo::get(&conn, &g).unwrap().unwrap();
        assert_eq!(record.members, users(&["alice", "carol"]).into_iter().collect::<BTreeSet<_>>());
        assert!(record.is_connected(&UserId::from("alice")));
    }

    #[test]
    fn upsert_drops_connected_users_removed_from_members() {
        let conn = setup();
        let g = seed(&conn, "g1", &["alice", "bob"]);
        assert!(GroupRepo::add_connected_user(&conn, &g, &UserId::from("alice")).unwrap());
        assert!(GroupRepo::add_connected_user(&conn, &g, &UserId::from("bob")).unwrap());

        let _ = seed(&conn, "g1", &["bob"]);
        let record = GroupRepo::get(&conn, &g).unwrap().unwrap();
        assert!(!record.is_connected(&UserId::from("alice")));
        assert!(record.is_connected(&UserId::from("bob")));
        assert!(record.users_connected.is_subset(&record.members));
    }

    #[test]
    fn upsert_ignores_connected_non_members_in_record() {
        let conn = setup();
        let mut record = GroupRecord::new(GroupId::from("g1"), users(&["alice"]));
        let _ = record.users_connected.insert(UserId::from("mallory"));
        GroupRepo::upsert(&conn, &record).unwrap();

        let stored = GroupRepo::get(&conn, &record.group_id).unwrap().unwrap();
        assert!(stored.users_connected.is_empty());
    }

    #[test]
    fn add_connected_user_reports_new_insert() {
        let conn = setup();
        let g = seed(&conn, "g1", &["alice"]);
        let alice = UserId::from("alice");

        assert!(GroupRepo::add_connected_user(&conn, &g, &alice).unwrap());
        assert!(!GroupRepo::add_connected_user(&conn, &g, &alice).unwrap());

        let record = GroupRepo::get(&conn, &g).unwrap().unwrap();
        assert_eq!(record.users_connected.len(), 1);
    }

    #[test]
    fn add_connected_user_to_missing_group_fails() {
        let conn = setup();
        let err = GroupRepo::add_connected_user(&conn, &GroupId::from("ghost"), &UserId::from("a"))
            .unwrap_err();
        assert_matches!(err, StoreError::GroupNotFound(id) if id == "ghost");
        assert!(GroupRepo::list_ids(&conn).unwrap().is_empty());
    }

    #[test]
    fn connected_sets_are_per_group() {
        let conn = setup();
        let g1 = seed(&conn, "g1", &["alice"]);
        let g2 = seed(&conn, "g2", &["alice"]);

        assert!(GroupRepo::add_connected_user(&conn, &g1, &UserId::from("alice")).unwrap());
        let other = GroupRepo::get(&conn, &g2).unwrap().unwrap();
        assert!(other.users_connected.is_empty());
    }

    #[test]
    fn list_ids_sorted() {
        let conn = setup();
        let _ = seed(&conn, "b", &[]);
        let _ = seed(&conn, "a", &[]);
        let ids = GroupRepo::list_ids(&conn).unwrap();
        assert_eq!(ids, vec![GroupId::from("a"), GroupId::from("b")]);
    }

    proptest! {
        #[test]
        fn connected_set_is_union_of_joins(joins in proptest::collection::vec("[a-e]", 0..20)) {
            let conn = setup();
            let g = seed(&conn, "g", &["a", "b", "c", "d", "e"]);
            for user in &joins {
                let _ = GroupRepo::add_connected_user(&conn, &g, &UserId::from(user.as_str())).unwrap();
            }
            let expected: BTreeSet<UserId> = joins.iter().map(|u| UserId::from(u.as_str())).collect();
            let record = GroupRepo::get(&conn, &g).unwrap().unwrap();
            prop_assert_eq!(record.users_connected, expected);
        }
    }
}
