//! `ConveneServer`: wires stores, transport and coordinator behind Axum.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use convene_settings::{ConveneSettings, DeliveryMode};
use convene_store::{
    ConnectionConfig, ConnectionRegistry, GroupStore, SqliteConnectionRegistry, SqliteGroupStore,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::coordinator::MembershipCoordinator;
use crate::delivery::{HttpTransport, LocalChannels, Transport};
use crate::errors::{Result, ServerError};
use crate::routes;
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Runs joins.
    pub coordinator: Arc<MembershipCoordinator>,
    /// Live WebSockets; `None` when delivery goes through a gateway.
    pub channels: Option<Arc<LocalChannels>>,
    /// Listener settings.
    pub config: Arc<ServerConfig>,
    /// Cancelled when the server shuts down.
    pub shutdown: CancellationToken,
    /// WebSocket session tasks, drained on shutdown.
    pub sessions: TaskTracker,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle for `/metrics`.
    pub metrics: Option<PrometheusHandle>,
}

/// The convene server.
pub struct ConveneServer {
    config: ServerConfig,
    coordinator: Arc<MembershipCoordinator>,
    channels: Option<Arc<LocalChannels>>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl ConveneServer {
    /// Server delivering to WebSockets it holds itself.
    pub fn local(
        config: ServerConfig,
        groups: Arc<dyn GroupStore>,
        registry: Arc<dyn ConnectionRegistry>,
    ) -> Self {
        let channels = Arc::new(LocalChannels::new());
        let transport: Arc<dyn Transport> = channels.clone();
        Self::build(config, groups, registry, transport, Some(channels))
    }

    /// Server delivering through `transport` (no `/ws` endpoint).
    pub fn with_transport(
        config: ServerConfig,
        groups: Arc<dyn GroupStore>,
        registry: Arc<dyn ConnectionRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self::build(config, groups, registry, transport, None)
    }

    /// Open the stores and pick the transport described by `settings`.
    ///
    /// In local mode every registered connection belonged to a socket of a
    /// previous process, so the registry is emptied before serving.
    pub async fn from_settings(settings: &ConveneSettings) -> Result<Self> {
        let store_config = ConnectionConfig {
            pool_size: settings.store.pool_size,
            busy_timeout_ms: settings.store.busy_timeout_ms,
        };
        ensure_parent_dir(&settings.store.groups_path)?;
        ensure_parent_dir(&settings.store.connections_path)?;

        let groups = Arc::new(SqliteGroupStore::open(
            &settings.store.groups_path,
            &store_config,
        )?);
        let registry = Arc::new(SqliteConnectionRegistry::open(
            &settings.store.connections_path,
            &store_config,
        )?);
        let config = ServerConfig::from_settings(&settings.server);

        match settings.delivery.mode {
            DeliveryMode::Local => {
                let stale = registry.clear().await?;
                if stale > 0 {
                    info!(stale, "removed connection records left by a previous run");
                }
                Ok(Self::local(config, groups, registry))
            }
            DeliveryMode::Http => {
                let endpoint = settings.delivery.endpoint.clone().ok_or_else(|| {
                    ServerError::Config("delivery.endpoint is required for http delivery".into())
                })?;
                let transport = HttpTransport::new(
                    endpoint,
                    Duration::from_millis(settings.delivery.timeout_ms),
                )?;
                Ok(Self::with_transport(config, groups, registry, Arc::new(transport)))
            }
        }
    }

    fn build(
        config: ServerConfig,
        groups: Arc<dyn GroupStore>,
        registry: Arc<dyn ConnectionRegistry>,
        transport: Arc<dyn Transport>,
        channels: Option<Arc<LocalChannels>>,
    ) -> Self {
        let shutdown = Arc::new(ShutdownCoordinator::new(config.shutdown_timeout()));
        Self {
            coordinator: Arc::new(MembershipCoordinator::new(groups, registry, transport)),
            channels,
            shutdown,
            start_time: Instant::now(),
            metrics: None,
            config,
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        routes::router(AppState {
            coordinator: self.coordinator.clone(),
            channels: self.channels.clone(),
            config: Arc::new(self.config.clone()),
            shutdown: self.shutdown.token(),
            sessions: self.shutdown.sessions(),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        })
    }

    /// Bind the listener and serve until shutdown is requested.
    ///
    /// Returns the bound address and the serving task.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>)> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await;
            if let Err(e) = served {
                error!(error = %e, "server terminated with error");
            }
        });

        info!(%addr, websocket = self.channels.is_some(), "convene listening");
        Ok((addr, handle))
    }

    /// The membership coordinator.
    pub fn coordinator(&self) -> &Arc<MembershipCoordinator> {
        &self.coordinator
    }

    /// Live WebSocket table (local delivery only).
    pub fn channels(&self) -> Option<&Arc<LocalChannels>> {
        self.channels.as_ref()
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }
}

fn ensure_parent_dir(path: &str) -> Result<()> {
    if path == ":memory:" {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
