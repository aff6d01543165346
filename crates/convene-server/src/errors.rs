//! Errors raised while assembling the server.

use thiserror::Error;

use crate::delivery::DeliveryError;

/// Startup failures.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A store could not be opened or migrated.
    #[error("store error: {0}")]
    Store(#[from] convene_store::StoreError),

    /// The delivery transport could not be built.
    #[error("delivery setup failed: {0}")]
    Delivery(#[from] DeliveryError),

    /// Settings are inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Binding the listener failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for server results.
pub type Result<T> = std::result::Result<T, ServerError>;
