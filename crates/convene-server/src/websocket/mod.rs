//! WebSocket front end: connection state, message dispatch and the session loop.

pub mod connection;
pub mod handler;
pub mod session;
