//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Delivery mode in use (`"local"` or `"http"`).
    pub delivery: &'static str,
    /// Live WebSocket connections held by this process.
    pub connections: usize,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, delivery: &'static str, connections: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        delivery,
        connections,
    }
}
