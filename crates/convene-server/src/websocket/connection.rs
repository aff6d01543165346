//! WebSocket client connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use convene_core::ConnectionId;
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Why a frame could not be queued for a client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendFailure {
    /// The outbound queue is at capacity.
    Full,
    /// The client's writer task has gone away.
    Closed,
}

/// A connected WebSocket client.
pub struct ClientConnection {
    /// Transport-assigned connection id.
    pub id: ConnectionId,
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was established.
    pub connected_at: Instant,
    is_alive: AtomicBool,
    last_pong: Mutex<Instant>,
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a connection whose frames are written from `tx`'s receiver.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Queue a text frame without waiting.
    ///
    /// On failure the dropped message counter is incremented.
    pub fn send(&self, message: Arc<String>) -> Result<(), SendFailure> {
        match self.tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                Err(match e {
                    mpsc::error::TrySendError::Full(_) => SendFailure::Full,
                    mpsc::error::TrySendError::Closed(_) => SendFailure::Closed,
                })
            }
        }
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Record a pong (or any other sign of life).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Duration since the last pong (or connection establishment).
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Check and reset the alive flag.
    ///
    /// Returns `true` if the client showed signs of life since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }
}
