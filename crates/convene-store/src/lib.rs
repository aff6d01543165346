//! # convene-store
//!
//! Persistence for convene: the group store and the connection registry.
//!
//! - [`traits`]: async [`GroupStore`] and [`ConnectionRegistry`] seams
//! - [`sqlite`]: r2d2 pool, embedded migrations and stateless repositories
//! - [`sqlite_store`]: trait implementations over a pool
//!
//! Both stores may live in the same database file or in separate ones.

#![deny(unsafe_code)]

pub mod errors;
pub mod sqlite;
pub mod sqlite_store;
pub mod traits;

pub use errors::{Result, StoreError};
pub use sqlite::ConnectionConfig;
pub use sqlite_store::{SqliteConnectionRegistry, SqliteGroupStore, open_pool};
pub use traits::{ConnectionRegistry, GroupStore};
