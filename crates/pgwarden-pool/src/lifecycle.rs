//! Connection lifecycle hooks and per-connection metadata.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

/// How the pool opens, checks and recognises broken connections.
#[async_trait]
pub trait ConnectionLifecycle: Send + Sync + 'static {
    /// The pooled connection type.
    type Connection: Send + 'static;

    /// Error raised when opening a connection fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a new physical connection.
    async fn connect(&self) -> Result<Self::Connection, Self::Error>;

    /// Check that an idle connection still works.
    async fn health_check(&self, conn: &mut Self::Connection) -> HealthCheckResult;

    /// Cheap synchronous check, run whenever a connection is returned.
    ///
    /// A connection reported broken is closed instead of recycled.
    fn has_broken(&self, conn: &mut Self::Connection) -> bool;
}

/// Result of a connection health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthCheckResult {
    /// The connection answered.
    Healthy,
    /// The connection failed the check.
    Unhealthy(String),
}

impl HealthCheckResult {
    /// Check if the connection is healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Bookkeeping for one physical connection.
#[derive(Debug, Clone)]
pub struct ConnectionMetadata {
    /// Pool-unique connection id.
    pub id: u64,
    /// When the connection was opened.
    pub created_at: Instant,
    /// When the connection was last checked out.
    pub last_checkout: Instant,
    /// How many times the connection has been checked out.
    pub checkout_count: u64,
}

impl ConnectionMetadata {
    pub(crate) fn new(id: u64) -> Self {
        let now = Instant::now();
        Self {
            id,
            created_at: now,
            last_checkout: now,
            checkout_count: 0,
        }
    }

    /// Time since the connection was opened.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Check the connection against a maximum lifetime (zero is unlimited).
    #[must_use]
    pub fn is_expired(&self, max_lifetime: Duration) -> bool {
        !max_lifetime.is_zero() && self.age() >= max_lifetime
    }

    pub(crate) fn record_checkout(&mut self) {
        self.last_checkout = Instant::now();
        self.checkout_count += 1;
    }
}
