//! Connection repository: one row per live transport connection.

use convene_core::{ConnectionId, ConnectionRecord, GroupId, UserId};
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;

/// Connection repository. Stateless; every method takes `&Connection`.
pub struct ConnectionRepo;

impl ConnectionRepo {
    /// Insert a connection record, replacing any row with the same id.
    pub fn register(conn: &Connection, record: &ConnectionRecord) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO connections (connection_id, group_id, user_id, connected_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(connection_id) DO UPDATE SET
                 group_id = excluded.group_id,
                 user_id = excluded.user_id,
                 connected_at = excluded.connected_at",
            params![
                record.connection_id.as_str(),
                record.group_id.as_str(),
                record.user_id.as_str(),
                record.connected_at,
            ],
        )?;
        Ok(())
    }

    /// Every connection registered against `group_id`, oldest first.
    pub fn list_by_group(conn: &Connection, group_id: &GroupId) -> Result<Vec<ConnectionRecord>> {
        let mut stmt = conn.prepare(
            "SELECT connection_id, group_id, user_id, connected_at
             FROM connections WHERE group_id = ?1
             ORDER BY connected_at, connection_id",
        )?;
        let rows = stmt
            .query_map(params![group_id.as_str()], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Fetch a single connection.
    pub fn get(conn: &Connection, connection_id: &ConnectionId) -> Result<Option<ConnectionRecord>> {
        let row = conn
            .query_row(
                "SELECT connection_id, group_id, user_id, connected_at
                 FROM connections WHERE connection_id = ?1",
                params![connection_id.as_str()],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Delete a connection. Returns whether a row was removed.
    pub fn remove(conn: &Connection, connection_id: &ConnectionId) -> Result<bool> {
        let changed = conn.execute(
            "DELETE FROM connections WHERE connection_id = ?1",
            params![connection_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Delete every connection. Returns the number of rows removed.
    pub fn clear(conn: &Connection) -> Result<u64> {
        let removed = conn.execute("DELETE FROM connections", [])?;
        Ok(u64::try_from(removed).unwrap_or(0))
    }

    /// Total registered connections.
    pub fn count(conn: &Connection) -> Result<u64> {
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM connections", [], |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConnectionRecord> {
        Ok(ConnectionRecord {
            connection_id: ConnectionId::from(row.get::<_, String>(0)?),
            group_id: GroupId::from(row.get::<_, String>(1)?),
            user_id: UserId::from(row.get::<_, String>(2)?),
            connected_at: row.get(3)?,
        })
    }
}
