//! `SQLite` backend: pool, schema and repositories.

pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{ConnectionConfig, ConnectionPool};
pub use migrations::run_migrations;
