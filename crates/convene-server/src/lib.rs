//! # convene-server
//!
//! Group join coordination and the Axum HTTP + `WebSocket` front end.
//!
//! - [`coordinator`]: validates a join, updates the group store, registers
//!   the connection and triggers fanout
//! - [`fanout`]: concurrent per-connection delivery of `userJoined`
//! - [`delivery`]: in-process WebSocket channels or an HTTP connection gateway
//! - [`websocket`]: session loop with ping keepalive and cleanup on close
//! - [`routes`] / [`server`]: `POST /join`, `GET /ws`, `/health`, `/metrics`
//! - Graceful shutdown via [`shutdown::ShutdownCoordinator`]

#![deny(unsafe_code)]

pub mod config;
pub mod coordinator;
pub mod delivery;
pub mod errors;
pub mod fanout;
pub mod health;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use coordinator::{JoinError, JoinReceipt, MembershipCoordinator};
pub use errors::ServerError;
pub use server::ConveneServer;
