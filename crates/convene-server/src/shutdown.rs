//! Graceful shutdown coordination via `CancellationToken`.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Coordinates graceful shutdown across the listener and open sessions.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    sessions: TaskTracker,
    timeout: Duration,
}

impl ShutdownCoordinator {
    /// Create a coordinator that waits at most `timeout` for tasks to drain.
    pub fn new(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            sessions: TaskTracker::new(),
            timeout,
        }
    }

    /// Get a clone of the cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Tracker for per-connection session tasks, drained on shutdown.
    pub fn sessions(&self) -> TaskTracker {
        self.sessions.clone()
    }

    /// Initiate shutdown.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether a shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel the token, then wait up to the drain timeout for `handles` and
    /// every tracked session.
    ///
    /// Returns `false` if the timeout elapsed first.
    pub async fn graceful_shutdown(&self, handles: Vec<JoinHandle<()>>) -> bool {
        self.shutdown();
        let _ = self.sessions.close();
        info!(
            task_count = handles.len(),
            session_count = self.sessions.len(),
            timeout_secs = self.timeout.as_secs(),
            "waiting for tasks to complete"
        );

        let drain = async {
            let _ = futures::future::join_all(handles).await;
            self.sessions.wait().await;
        };
        if tokio::time::timeout(self.timeout, drain).await.is_err() {
            warn!("shutdown timed out after {:?}, some tasks may still be running", self.timeout);
            return false;
        }
        true
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}
