//! Settings schema with compiled defaults.

use std::path::PathBuf;

use convene_core::logging::LogFormat;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConveneSettings {
    /// HTTP / WebSocket listener.
    pub server: ServerSettings,
    /// Locations and tuning of the two stores.
    pub store: StoreSettings,
    /// Outbound notification delivery.
    pub delivery: DeliverySettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl ConveneSettings {
    /// Reject combinations the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.store.pool_size == 0 {
            return Err(SettingsError::InvalidValue(
                "store.pool_size must be at least 1".into(),
            ));
        }
        if self.server.send_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "server.send_queue_capacity must be at least 1".into(),
            ));
        }
        if self.delivery.mode == DeliveryMode::Http && self.delivery.endpoint.is_none() {
            return Err(SettingsError::InvalidValue(
                "delivery.endpoint is required when delivery.mode is \"http\"".into(),
            ));
        }
        Ok(())
    }
}

/// Listener settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` picks a free port).
    pub port: u16,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Outbound queue depth per WebSocket connection.
    pub send_queue_capacity: usize,
    /// Seconds between server pings.
    pub ping_interval_secs: u64,
    /// Close a connection after this long without a pong.
    pub pong_timeout_secs: u64,
    /// How long shutdown waits for open connections to drain.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9850,
            max_message_size: 64 * 1024,
            send_queue_capacity: 256,
            ping_interval_secs: 30,
            pong_timeout_secs: 60,
            shutdown_timeout_secs: 30,
        }
    }
}

/// Store locations. Both stores may share one database file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// `SQLite` file holding group records.
    pub groups_path: String,
    /// `SQLite` file holding connection records.
    pub connections_path: String,
    /// Max pooled connections per store.
    pub pool_size: u32,
    /// `SQLite` busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        let db = default_db_path().to_string_lossy().into_owned();
        Self {
            groups_path: db.clone(),
            connections_path: db,
            pool_size: 8,
            busy_timeout_ms: 30_000,
        }
    }
}

/// How notifications reach connections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Connections are WebSockets held by this process.
    #[default]
    Local,
    /// Connections are held by an external gateway reachable over HTTP.
    Http,
}

/// Delivery settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    /// Transport used for fanout.
    pub mode: DeliveryMode,
    /// Gateway management endpoint (required for [`DeliveryMode::Http`]).
    pub endpoint: Option<String>,
    /// Per-delivery HTTP timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            mode: DeliveryMode::Local,
            endpoint: None,
            timeout_ms: 5_000,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Line format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Compact,
        }
    }
}

/// `~/.convene`, falling back to `/tmp` when `HOME` is unset.
pub fn convene_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".convene")
}

fn default_db_path() -> PathBuf {
    convene_home().join("convene.db")
}
