//! Server configuration.

use std::time::Duration;

use convene_settings::ServerSettings;
use serde::{Deserialize, Serialize};

/// Runtime configuration for the convene server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Outbound queue depth per WebSocket connection.
    pub send_queue_capacity: usize,
    /// Seconds between server-initiated pings.
    pub ping_interval_secs: u64,
    /// Disconnect a client after this many seconds without a pong.
    pub pong_timeout_secs: u64,
    /// How long graceful shutdown waits for tasks to drain.
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Build from the `server` section of the settings file.
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            max_message_size: settings.max_message_size,
            send_queue_capacity: settings.send_queue_capacity,
            ping_interval_secs: settings.ping_interval_secs,
            pong_timeout_secs: settings.pong_timeout_secs,
            shutdown_timeout_secs: settings.shutdown_timeout_secs,
        }
    }

    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Ping interval as a [`Duration`].
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(1))
    }

    /// Pong timeout as a [`Duration`].
    pub fn pong_timeout(&self) -> Duration {
        Duration::from_secs(self.pong_timeout_secs)
    }

    /// Shutdown drain timeout as a [`Duration`].
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_message_size: 64 * 1024,
            send_queue_capacity: 256,
            ping_interval_secs: 30,
            pong_timeout_secs: 60,
            shutdown_timeout_secs: 30,
        }
    }
}
