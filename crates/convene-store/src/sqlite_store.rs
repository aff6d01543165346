//! Pool-backed implementations of [`GroupStore`] and [`ConnectionRegistry`].
//!
//! `rusqlite` is synchronous, so every call checks a connection out of the
//! pool on a blocking thread.

use async_trait::async_trait;
use convene_core::{ConnectionId, ConnectionRecord, GroupId, GroupRecord, UserId};
use tracing::debug;

use crate::errors::Result;
use crate::sqlite::connection::{self, ConnectionConfig, ConnectionPool};
use crate::sqlite::migrations::run_migrations;
use crate::sqlite::repositories::{ConnectionRepo, GroupRepo};
use crate::traits::{ConnectionRegistry, GroupStore};

/// Open a pool at `path` (`:memory:` for an ephemeral database) and bring the
/// schema up to date.
pub fn open_pool(path: &str, config: &ConnectionConfig) -> Result<ConnectionPool> {
    let pool = if path == ":memory:" {
        connection::new_in_memory(config)?
    } else {
        connection::new_file(path, config)?
    };
    let conn = pool.get()?;
    let applied = run_migrations(&conn)?;
    debug!(path, applied, "store opened");
    Ok(pool)
}

async fn blocking<T, F>(pool: &ConnectionPool, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;
        f(&conn)
    })
    .await?
}

/// [`GroupStore`] over an `SQLite` pool.
#[derive(Clone)]
pub struct SqliteGroupStore {
    pool: ConnectionPool,
}

impl SqliteGroupStore {
    /// Wrap an already-migrated pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Open (and migrate) the database at `path`.
    pub fn open(path: &str, config: &ConnectionConfig) -> Result<Self> {
        Ok(Self::new(open_pool(path, config)?))
    }

    /// Create or replace a group's member list.
    pub async fn upsert(&self, record: GroupRecord) -> Result<()> {
        blocking(&self.pool, move |conn| GroupRepo::upsert(conn, &record)).await
    }

    /// All group ids.
    pub async fn list_ids(&self) -> Result<Vec<GroupId>> {
        blocking(&self.pool, GroupRepo::list_ids).await
    }
}

#[async_trait]
impl GroupStore for SqliteGroupStore {
    async fn get(&self, group_id: &GroupId) -> Result<Option<GroupRecord>> {
        let group_id = group_id.clone();
        blocking(&self.pool, move |conn| GroupRepo::get(conn, &group_id)).await
    }

    async fn add_connected_user(&self, group_id: &GroupId, user_id: &UserId) -> Result<bool> {
        let group_id = group_id.clone();
        let user_id = user_id.clone();
        blocking(&self.pool, move |conn| {
            GroupRepo::add_connected_user(conn, &group_id, &user_id)
        })
        .await
    }
}

/// [`ConnectionRegistry`] over an `SQLite` pool.
#[derive(Clone)]
pub struct SqliteConnectionRegistry {
    pool: ConnectionPool,
}

impl SqliteConnectionRegistry {
    /// Wrap an already-migrated pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Open (and migrate) the database at `path`.
    pub fn open(path: &str, config: &ConnectionConfig) -> Result<Self> {
        Ok(Self::new(open_pool(path, config)?))
    }

    /// Look up a single connection.
    pub async fn get(&self, connection_id: &ConnectionId) -> Result<Option<ConnectionRecord>> {
        let connection_id = connection_id.clone();
        blocking(&self.pool, move |conn| ConnectionRepo::get(conn, &connection_id)).await
    }

    /// Drop every connection record. Returns how many were removed.
    pub async fn clear(&self) -> Result<u64> {
        blocking(&self.pool, ConnectionRepo::clear).await
    }

    /// Number of registered connections.
    pub async fn count(&self) -> Result<u64> {
        blocking(&self.pool, ConnectionRepo::count).await
    }
}

#[async_trait]
impl ConnectionRegistry for SqliteConnectionRegistry {
    async fn register(&self, record: ConnectionRecord) -> Result<()> {
        blocking(&self.pool, move |conn| ConnectionRepo::register(conn, &record)).await
    }

    async fn list_by_group(&self, group_id: &GroupId) -> Result<Vec<ConnectionRecord>> {
        let group_id = group_id.clone();
        blocking(&self.pool, move |conn| {
            ConnectionRepo::list_by_group(conn, &group_id)
        })
        .await
    }

    async fn remove(&self, connection_id: &ConnectionId) -> Result<bool> {
        let connection_id = connection_id.clone();
        blocking(&self.pool, move |conn| ConnectionRepo::remove(conn, &connection_id)).await
    }
}
