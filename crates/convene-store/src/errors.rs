//! Error types for the store subsystem.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// A write targeted a group that has no record.
    #[error("group not found: {0}")]
    GroupNotFound(String),

    /// The blocking task running a query panicked or was cancelled.
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_error_display() {
        let err = StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows);
        assert!(err.to_string().contains("sqlite error"));
    }

    #[test]
    fn migration_error_display() {
        let err = StoreError::Migration {
            message: "v002 failed".into(),
        };
        assert_eq!(err.to_string(), "migration error: v002 failed");
    }

    #[test]
    fn group_not_found_display() {
        let err = StoreError::GroupNotFound("g-9".into());
        assert_eq!(err.to_string(), "group not found: g-9");
    }

    #[test]
    fn from_rusqlite_error() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }
}
