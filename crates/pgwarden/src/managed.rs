//! Lazily configured pools.
//!
//! A [`ManagedPool`] is a named slot in the registry. It holds no sessions
//! and no options until its first [`connect`](ManagedPool::connect): that
//! call loads the connection profile set, picks the entry for the pool's
//! database key, overlays it on the base options and builds the physical
//! pool. Concurrent first callers share one configuration attempt; a failed
//! attempt leaves the pool unconfigured so the next caller retries.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::future::BoxFuture;
use pgwarden_pool::{Pool, PoolMetrics, PoolStatus};
use pgwarden_secrets::{SecretCache, SecretDocument};
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::Instrument;

use crate::codec::ParamCodec;
use crate::config::{PoolOptions, Settings};
use crate::connection::Connection;
use crate::database::Profiles;
use crate::diagnostics::{DiagnosticLogger, SaturationGate};
use crate::driver::{Driver, SessionLifecycle};
use crate::error::{ConfigError, Error, Result};
use crate::instrumentation::{self, SanitizationConfig};
use crate::row::{QueryResult, Row};

/// State shared by every pool of one database context.
pub(crate) struct Shared<D: Driver> {
    pub(crate) settings: Settings,
    pub(crate) driver: Arc<D>,
    pub(crate) secrets: Arc<SecretCache>,
    pub(crate) profiles: SecretDocument<Profiles>,
    pub(crate) sanitization: Arc<SanitizationConfig>,
}

struct Configured<D: Driver> {
    options: PoolOptions,
    pool: Pool<SessionLifecycle<D>>,
}

/// A named, lazily configured connection pool.
pub struct ManagedPool<D: Driver> {
    key: Arc<str>,
    db_key: String,
    shared: Arc<Shared<D>>,
    configured: OnceCell<Configured<D>>,
    diagnostics: Option<Arc<DiagnosticLogger<D>>>,
    gate: SaturationGate,
    closed: AtomicBool,
}

impl<D: Driver> ManagedPool<D> {
    /// `diagnostics` is `None` for the log pool itself.
    pub(crate) fn new(
        key: &str,
        db_key: &str,
        shared: Arc<Shared<D>>,
        diagnostics: Option<Arc<DiagnosticLogger<D>>>,
    ) -> Self {
        let gate = SaturationGate::new(shared.settings.saturation_log_interval);
        Self {
            key: Arc::from(key),
            db_key: db_key.to_string(),
            shared,
            configured: OnceCell::new(),
            diagnostics,
            gate,
            closed: AtomicBool::new(false),
        }
    }

    /// Registry key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Name of the connection profile this pool uses.
    #[must_use]
    pub fn db_key(&self) -> &str {
        &self.db_key
    }

    /// Check whether the pool has been configured. Never goes back to
    /// `false` once `true`.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.configured.initialized()
    }

    /// Check whether this is the diagnostic log pool.
    #[must_use]
    pub fn is_log_pool(&self) -> bool {
        self.diagnostics.is_none()
    }

    /// Merged options, once configured.
    #[must_use]
    pub fn options(&self) -> Option<&PoolOptions> {
        self.configured.get().map(|c| &c.options)
    }

    /// Live gauges, once configured.
    #[must_use]
    pub fn status(&self) -> Option<PoolStatus> {
        self.configured.get().map(|c| c.pool.status())
    }

    /// Checkout counters, once configured.
    #[must_use]
    pub fn metrics(&self) -> Option<PoolMetrics> {
        self.configured.get().map(|c| c.pool.metrics())
    }

    /// When a saturation snapshot was last attempted.
    #[must_use]
    pub fn last_saturation_log(&self) -> Option<Instant> {
        self.gate.last_claimed()
    }

    /// Check whether the pool has been drained.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Configure the pool now instead of on first checkout.
    pub async fn configure(&self) -> Result<()> {
        self.ensure_configured().await.map(drop)
    }

    /// Check out a connection.
    ///
    /// Configures the pool on first use. If the pool is at capacity, a
    /// saturation snapshot is attempted first (at most once per window);
    /// its outcome never affects this call.
    pub async fn connect(&self) -> Result<Connection<D>> {
        if self.is_closed() {
            return Err(Error::PoolClosed(self.key.to_string()));
        }

        let configured = self.ensure_configured().await?;
        if self.is_closed() {
            return Err(Error::PoolClosed(self.key.to_string()));
        }

        let status = configured.pool.status();
        if status.is_at_capacity() {
            self.on_saturated(status).await;
        }

        let span = instrumentation::connect_span(&self.key, configured.options.database.as_deref());
        let pooled = configured
            .pool
            .get()
            .instrument(span)
            .await
            .map_err(|e| Error::from_pool(&self.key, e))?;

        tracing::trace!(pool = %self.key, session_id = pooled.metadata().id, "connection checked out");

        Ok(Connection::new(
            pooled,
            Arc::clone(&self.key),
            configured.options.statement_budget(),
            Arc::clone(&self.shared.sanitization),
        ))
    }

    /// Run statement text on a connection checked out for this call.
    pub async fn query(&self, sql: &str) -> Result<QueryResult> {
        self.connect().await?.query(sql).await
    }

    /// Run a statement and return its rows.
    pub async fn query_rows(&self, sql: &str) -> Result<Vec<Row>> {
        self.connect().await?.query_rows(sql).await
    }

    /// Run a statement and return its first row.
    pub async fn query_first(&self, sql: &str) -> Result<Option<Row>> {
        self.connect().await?.query_first(sql).await
    }

    /// Run a statement and return the number of rows it affected.
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        self.connect().await?.execute(sql).await
    }

    /// Run a script one statement at a time on one connection.
    pub async fn query_file(&self, script: &str) -> Result<Vec<QueryResult>> {
        self.connect().await?.query_file(script).await
    }

    /// Close the pool, waiting for every checked-out connection to return.
    pub async fn drain(&self) {
        self.closed.store(true, Ordering::Release);
        if let Some(configured) = self.configured.get() {
            configured.pool.close().await;
        }
        tracing::info!(pool = %self.key, "pool drained");
    }

    /// [`drain`](Self::drain) with a budget. Zero waits forever.
    pub async fn drain_within(&self, timeout: Duration) -> Result<()> {
        if timeout.is_zero() {
            self.drain().await;
            return Ok(());
        }

        tokio::time::timeout(timeout, self.drain())
            .await
            .map_err(|_| Error::DrainTimeout {
                key: self.key.to_string(),
                timeout,
            })
    }

    async fn ensure_configured(&self) -> Result<&Configured<D>> {
        self.configured
            .get_or_try_init(|| async {
                let profiles = self
                    .shared
                    .profiles
                    .load(&self.shared.secrets)
                    .await
                    .map_err(ConfigError::from)?;

                let profile = profiles
                    .get(&self.db_key)
                    .ok_or_else(|| ConfigError::MissingProfile(self.db_key.clone()))?;

                let options = self.shared.settings.base_options.merged_with(profile)?;
                options.validate()?;

                let lifecycle = SessionLifecycle::new(Arc::clone(&self.shared.driver), options.clone());
                let pool = Pool::new(lifecycle, options.pool_config())
                    .map_err(|e| ConfigError::InvalidOptions(e.to_string()))?;

                tracing::info!(
                    pool = %self.key,
                    db_key = %self.db_key,
                    max = options.max,
                    "pool configured"
                );

                Ok::<_, Error>(Configured { options, pool })
            })
            .await
            .inspect_err(|e| {
                tracing::warn!(pool = %self.key, db_key = %self.db_key, error = %e, "pool configuration failed");
            })
    }

    // The snapshot checks out from the log pool, so this future contains
    // another `connect`; returning it boxed breaks the type cycle.
    fn on_saturated(&self, status: PoolStatus) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if !self.gate.try_claim() {
                return;
            }

            let Some(logger) = &self.diagnostics else {
                tracing::warn!(
                    pool = %self.key,
                    total = status.total,
                    idle = status.available,
                    waiting = status.waiting,
                    "log pool saturated"
                );
                return;
            };

            match logger.record(&self.key, status).await {
                Ok(event) => tracing::error!(
                    pool = %self.key,
                    total = status.total,
                    idle = status.available,
                    waiting = status.waiting,
                    event_id = %event.id,
                    sessions = event.activity_rows.len(),
                    "pool saturated, activity snapshot logged"
                ),
                Err(e) => tracing::warn!(
                    pool = %self.key,
                    total = status.total,
                    idle = status.available,
                    waiting = status.waiting,
                    error = %e,
                    "pool saturated, activity snapshot failed"
                ),
            }
        })
    }
}

impl<D: Driver> ParamCodec for ManagedPool<D> {}

impl<D: Driver> std::fmt::Debug for ManagedPool<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedPool")
            .field("key", &self.key)
            .field("db_key", &self.db_key)
            .field("configured", &self.is_configured())
            .field("status", &self.status())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
