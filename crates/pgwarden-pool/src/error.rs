//! Pool error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during pool operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The pool has been closed.
    #[error("connection pool is closed")]
    PoolClosed,

    /// No connection became available in time.
    #[error("timed out after {0:?} waiting for a connection")]
    Timeout(Duration),

    /// Opening a connection failed.
    #[error("failed to open connection: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid pool configuration.
    #[error("invalid pool configuration: {0}")]
    Configuration(String),
}

impl PoolError {
    /// Check if this is a checkout timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
