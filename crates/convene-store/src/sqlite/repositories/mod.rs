//! Repository implementations for `SQLite` database operations.
//!
//! Each repository is a stateless struct whose methods take a `&Connection`.
//! The async store types in [`crate::sqlite_store`] wrap these in blocking
//! tasks.

pub mod connection;
pub mod group;

pub use connection::ConnectionRepo;
pub use group::GroupRepo;
