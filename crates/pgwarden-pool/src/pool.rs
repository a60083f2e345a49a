//! Connection pool implementation.
//!
//! Slots are bounded by a semaphore with `max_connections` permits. A
//! checkout holds one permit for as long as the caller keeps the
//! [`PooledConnection`]; idle connections hold none. A new physical
//! connection is only opened by a permit holder that found the idle queue
//! empty, so the number of open connections never exceeds the maximum.

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::lifecycle::{ConnectionLifecycle, ConnectionMetadata, HealthCheckResult};

/// A bounded pool of connections produced by a [`ConnectionLifecycle`].
///
/// Cloning the pool is cheap; clones share the same slots.
///
/// # Example
///
/// ```rust,ignore
/// use pgwarden_pool::Pool;
///
/// let pool = Pool::builder(lifecycle)
///     .min_connections(0)
///     .max_connections(20)
///     .build()?;
///
/// let conn = pool.get().await?;
/// // Use connection...
/// ```
pub struct Pool<L: ConnectionLifecycle> {
    inner: Arc<PoolInner<L>>,
}

struct PoolInner<L: ConnectionLifecycle> {
    /// Pool configuration.
    config: PoolConfig,

    /// Opens and checks connections.
    lifecycle: L,

    /// One permit per checkout.
    semaphore: Arc<Semaphore>,

    /// Idle connections; the back is the most recently returned.
    idle: Mutex<VecDeque<IdleConnection<L::Connection>>>,

    /// Whether the pool is closed.
    closed: AtomicBool,

    /// Open physical connections, idle or checked out.
    total: AtomicU32,

    /// Callers queued for a permit.
    waiting: AtomicU32,

    /// Counter for generating connection IDs.
    next_connection_id: AtomicU64,

    /// When the pool was created.
    created_at: Instant,

    /// Pool metrics.
    metrics: Mutex<PoolMetricsInner>,
}

struct IdleConnection<C> {
    conn: C,
    metadata: ConnectionMetadata,
    idle_since: Instant,
}

/// Internal metrics tracking.
#[derive(Debug, Default)]
struct PoolMetricsInner {
    /// Total connections created.
    connections_created: u64,
    /// Total connections closed.
    connections_closed: u64,
    /// Total successful checkouts.
    checkouts_successful: u64,
    /// Total failed checkouts (timeouts, errors).
    checkouts_failed: u64,
    /// Checkouts that failed by timing out.
    checkout_timeouts: u64,
    /// Total health checks performed.
    health_checks_performed: u64,
    /// Total health check failures.
    health_checks_failed: u64,
}

impl<L: ConnectionLifecycle> Pool<L> {
    /// Create a new pool builder.
    #[must_use]
    pub fn builder(lifecycle: L) -> PoolBuilder<L> {
        PoolBuilder::new(lifecycle)
    }

    /// Create a new pool with the given configuration.
    ///
    /// No connection is opened until the first checkout. When called inside
    /// a Tokio runtime, a background task reaps idle and expired
    /// connections every `reaper_interval`.
    pub fn new(lifecycle: L, config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;

        let inner = Arc::new(PoolInner {
            semaphore: Arc::new(Semaphore::new(config.max_connections as usize)),
            config,
            lifecycle,
            idle: Mutex::new(VecDeque::new()),
            closed: AtomicBool::new(false),
            total: AtomicU32::new(0),
            waiting: AtomicU32::new(0),
            next_connection_id: AtomicU64::new(1),
            created_at: Instant::now(),
            metrics: Mutex::new(PoolMetricsInner::default()),
        });

        spawn_reaper(&inner);

        tracing::info!(
            min = inner.config.min_connections,
            max = inner.config.max_connections,
            "connection pool created"
        );

        Ok(Self { inner })
    }

    /// Get a connection from the pool.
    ///
    /// Reuses the most recently returned idle connection, or opens a new one
    /// if the pool is below capacity. At capacity, waits for a connection to
    /// be returned. The whole operation, including opening a connection, is
    /// bounded by `connection_timeout`. Dropping the future leaks nothing.
    pub async fn get(&self) -> Result<PooledConnection<L>, PoolError> {
        if self.is_closed() {
            return Err(PoolError::PoolClosed);
        }

        tracing::trace!("acquiring connection from pool");

        let timeout = self.inner.config.connection_timeout;
        let result = if timeout.is_zero() {
            self.checkout().await
        } else {
            match tokio::time::timeout(timeout, self.checkout()).await {
                Ok(result) => result,
                Err(_) => {
                    self.inner.metrics.lock().checkout_timeouts += 1;
                    Err(PoolError::Timeout(timeout))
                }
            }
        };

        let mut metrics = self.inner.metrics.lock();
        match &result {
            Ok(_) => metrics.checkouts_successful += 1,
            Err(_) => metrics.checkouts_failed += 1,
        }
        drop(metrics);

        result
    }

    async fn checkout(&self) -> Result<PooledConnection<L>, PoolError> {
        let mut permit = {
            let _waiting = WaitingGuard::enter(&self.inner.waiting);
            Arc::clone(&self.inner.semaphore)
                .acquire_owned()
                .await
                .map_err(|_| PoolError::PoolClosed)?
        };

        if self.is_closed() {
            return Err(PoolError::PoolClosed);
        }

        loop {
            let Some(idle) = self.inner.pop_idle() else {
                return self.open(permit).await;
            };

            let config = &self.inner.config;
            let needs_check =
                config.test_on_checkout && idle.idle_since.elapsed() >= config.health_check_interval;

            let mut conn = PooledConnection::new(
                idle.conn,
                idle.metadata,
                permit,
                Arc::clone(&self.inner),
            );

            if !needs_check || self.health_check(&mut conn).await {
                conn.metadata.record_checkout();
                return Ok(conn);
            }

            permit = conn.close_and_keep_permit().ok_or(PoolError::PoolClosed)?;
        }
    }

    async fn open(&self, permit: OwnedSemaphorePermit) -> Result<PooledConnection<L>, PoolError> {
        let conn = self.inner.lifecycle.connect().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to open connection");
            PoolError::Connection(Box::new(e))
        })?;

        let id = self.inner.next_connection_id.fetch_add(1, Ordering::Relaxed);
        self.inner.total.fetch_add(1, Ordering::AcqRel);
        self.inner.metrics.lock().connections_created += 1;
        tracing::debug!(connection_id = id, "opened connection");

        let mut metadata = ConnectionMetadata::new(id);
        metadata.record_checkout();
        Ok(PooledConnection::new(
            conn,
            metadata,
            permit,
            Arc::clone(&self.inner),
        ))
    }

    /// Returns false if the connection failed its check.
    async fn health_check(&self, conn: &mut PooledConnection<L>) -> bool {
        // Interrupted checks leave the protocol state unknown.
        conn.broken = true;
        let result = self.inner.lifecycle.health_check(&mut **conn).await;

        let mut metrics = self.inner.metrics.lock();
        metrics.health_checks_performed += 1;
        if !result.is_healthy() {
            metrics.health_checks_failed += 1;
        }
        drop(metrics);

        match result {
            HealthCheckResult::Healthy => {
                conn.broken = false;
                true
            }
            HealthCheckResult::Unhealthy(reason) => {
                tracing::debug!(
                    connection_id = conn.metadata.id,
                    reason = %reason,
                    "idle connection failed health check"
                );
                false
            }
        }
    }

    /// Try to get an idle connection without waiting.
    ///
    /// Returns `None` if the pool is at capacity or no idle connection is
    /// available. Never opens a new connection and never health-checks.
    pub fn try_get(&self) -> Result<Option<PooledConnection<L>>, PoolError> {
        if self.is_closed() {
            return Err(PoolError::PoolClosed);
        }

        let permit = match Arc::clone(&self.inner.semaphore).try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::NoPermits) => return Ok(None),
            Err(TryAcquireError::Closed) => return Err(PoolError::PoolClosed),
        };

        let Some(idle) = self.inner.pop_idle() else {
            return Ok(None);
        };

        let mut conn = PooledConnection::new(
            idle.conn,
            idle.metadata,
            permit,
            Arc::clone(&self.inner),
        );
        conn.metadata.record_checkout();
        self.inner.metrics.lock().checkouts_successful += 1;
        Ok(Some(conn))
    }

    /// Get the current pool status.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let available = self.inner.idle.lock().len() as u32;
        let total = self.inner.total.load(Ordering::Acquire);
        PoolStatus {
            available,
            in_use: total.saturating_sub(available),
            total,
            max: self.inner.config.max_connections,
            waiting: self.inner.waiting.load(Ordering::Acquire),
        }
    }

    /// Get pool metrics.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        let inner = self.inner.metrics.lock();
        PoolMetrics {
            connections_created: inner.connections_created,
            connections_closed: inner.connections_closed,
            checkouts_successful: inner.checkouts_successful,
            checkouts_failed: inner.checkouts_failed,
            checkout_timeouts: inner.checkout_timeouts,
            health_checks_performed: inner.health_checks_performed,
            health_checks_failed: inner.health_checks_failed,
            uptime: self.inner.created_at.elapsed(),
        }
    }

    /// Close idle connections past `idle_timeout` or `max_lifetime`,
    /// keeping at least `min_connections` open.
    ///
    /// Returns the number of connections closed. The background reaper
    /// calls this periodically.
    pub fn reap_idle(&self) -> usize {
        self.inner.reap_idle()
    }

    /// Close the pool.
    ///
    /// New checkouts fail with [`PoolError::PoolClosed`] immediately and
    /// idle connections are closed at once. This then waits for every
    /// outstanding checkout to be returned; returned connections are closed
    /// on check-in, so dropping this future early leaves only those still
    /// checked out open.
    pub async fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        let closed = self.inner.close_idle();
        tracing::debug!(closed, "connection pool closing");

        // Holding every permit means nothing is checked out.
        let held = self
            .inner
            .semaphore
            .acquire_many(self.inner.config.max_connections)
            .await;
        self.inner.semaphore.close();
        let closed = closed + self.inner.close_idle();
        drop(held);

        tracing::info!(closed, "connection pool closed");
    }

    /// Check if the pool is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Get the pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Get the connection lifecycle.
    #[must_use]
    pub fn lifecycle(&self) -> &L {
        &self.inner.lifecycle
    }
}

impl<L: ConnectionLifecycle> Clone for Pool<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: ConnectionLifecycle> fmt::Debug for Pool<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("status", &self.status())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl<L: ConnectionLifecycle> PoolInner<L> {
    /// Pop the most recently used idle connection that is still usable.
    fn pop_idle(&self) -> Option<IdleConnection<L::Connection>> {
        loop {
            let mut idle = self.idle.lock().pop_back()?;

            if self.is_stale(&idle) || self.lifecycle.has_broken(&mut idle.conn) {
                self.close_connection(idle.conn, &idle.metadata);
                continue;
            }

            return Some(idle);
        }
    }

    fn is_stale(&self, idle: &IdleConnection<L::Connection>) -> bool {
        let idle_timeout = self.config.idle_timeout;
        idle.metadata.is_expired(self.config.max_lifetime)
            || (!idle_timeout.is_zero() && idle.idle_since.elapsed() >= idle_timeout)
    }

    fn check_in(&self, mut conn: L::Connection, metadata: ConnectionMetadata, broken: bool) {
        let discard = broken
            || self.closed.load(Ordering::Acquire)
            || metadata.is_expired(self.config.max_lifetime)
            || self.lifecycle.has_broken(&mut conn);

        if discard {
            tracing::trace!(connection_id = metadata.id, broken, "closing returned connection");
            self.close_connection(conn, &metadata);
            return;
        }

        let mut idle = self.idle.lock();
        // Re-checked under the lock so `close_idle` cannot miss it.
        if self.closed.load(Ordering::Acquire) {
            drop(idle);
            self.close_connection(conn, &metadata);
            return;
        }

        tracing::trace!(connection_id = metadata.id, "returning connection to pool");
        idle.push_back(IdleConnection {
            conn,
            metadata,
            idle_since: Instant::now(),
        });
    }

    /// Close every idle connection. Returns how many were closed.
    fn close_idle(&self) -> usize {
        let idle: Vec<_> = self.idle.lock().drain(..).collect();
        let closed = idle.len();
        for conn in idle {
            self.close_connection(conn.conn, &conn.metadata);
        }
        closed
    }

    fn close_connection(&self, conn: L::Connection, metadata: &ConnectionMetadata) {
        drop(conn);
        self.total.fetch_sub(1, Ordering::AcqRel);
        self.metrics.lock().connections_closed += 1;
        tracing::trace!(connection_id = metadata.id, "connection closed");
    }

    fn reap_idle(&self) -> usize {
        if self.config.idle_timeout.is_zero() && self.config.max_lifetime.is_zero() {
            return 0;
        }

        let reaped: Vec<_> = {
            let mut idle = self.idle.lock();
            let mut surplus = self
                .total
                .load(Ordering::Acquire)
                .saturating_sub(self.config.min_connections);
            let mut kept = VecDeque::with_capacity(idle.len());
            let mut reaped = Vec::new();

            // Least recently used first.
            while let Some(conn) = idle.pop_front() {
                if surplus > 0 && self.is_stale(&conn) {
                    surplus -= 1;
                    reaped.push(conn);
                } else {
                    kept.push_back(conn);
                }
            }

            *idle = kept;
            reaped
        };

        let count = reaped.len();
        for conn in reaped {
            self.close_connection(conn.conn, &conn.metadata);
        }
        if count > 0 {
            tracing::debug!(reaped = count, "closed idle connections");
        }
        count
    }
}

fn spawn_reaper<L: ConnectionLifecycle>(inner: &Arc<PoolInner<L>>) {
    let config = &inner.config;
    if config.reaper_interval.is_zero()
        || (config.idle_timeout.is_zero() && config.max_lifetime.is_zero())
    {
        return;
    }

    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        tracing::debug!("no runtime available, idle reaper disabled");
        return;
    };

    let pool = Arc::downgrade(inner);
    let period = config.reaper_interval;
    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(inner) = pool.upgrade() else {
                break;
            };
            if inner.closed.load(Ordering::Acquire) {
                break;
            }
            inner.reap_idle();
        }
    });
}

struct WaitingGuard<'a>(&'a AtomicU32);

impl<'a> WaitingGuard<'a> {
    fn enter(counter: &'a AtomicU32) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Builder for creating a connection pool.
///
/// # Example
///
/// ```rust,ignore
/// let pool = Pool::builder(lifecycle)
///     .max_connections(5)
///     .connection_timeout(Duration::from_secs(3))
///     .build()?;
/// ```
pub struct PoolBuilder<L: ConnectionLifecycle> {
    lifecycle: L,
    pool_config: PoolConfig,
}

impl<L: ConnectionLifecycle> PoolBuilder<L> {
    /// Create a new pool builder with default settings.
    pub fn new(lifecycle: L) -> Self {
        Self {
            lifecycle,
            pool_config: PoolConfig::default(),
        }
    }

    /// Set the pool configuration.
    #[must_use]
    pub fn pool_config(mut self, config: PoolConfig) -> Self {
        self.pool_config = config;
        self
    }

    /// Set the minimum number of connections.
    #[must_use]
    pub fn min_connections(mut self, count: u32) -> Self {
        self.pool_config.min_connections = count;
        self
    }

    /// Set the maximum number of connections.
    #[must_use]
    pub fn max_connections(mut self, count: u32) -> Self {
        self.pool_config.max_connections = count;
        self
    }

    /// Set the connection acquisition timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.pool_config.connection_timeout = timeout;
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_config.idle_timeout = timeout;
        self
    }

    /// Set the maximum connection lifetime.
    #[must_use]
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.pool_config.max_lifetime = lifetime;
        self
    }

    /// Enable or disable health checks on checkout.
    #[must_use]
    pub fn test_on_checkout(mut self, enabled: bool) -> Self {
        self.pool_config.test_on_checkout = enabled;
        self
    }

    /// Build the pool.
    pub fn build(self) -> Result<Pool<L>, PoolError> {
        Pool::new(self.lifecycle, self.pool_config)
    }
}

/// Status information about the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Number of idle connections available.
    pub available: u32,
    /// Number of connections currently in use.
    pub in_use: u32,
    /// Total number of connections.
    pub total: u32,
    /// Maximum allowed connections.
    pub max: u32,
    /// Callers waiting for a connection.
    pub waiting: u32,
}

impl PoolStatus {
    /// Calculate the utilization percentage.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        (f64::from(self.in_use) / f64::from(self.max)) * 100.0
    }

    /// Check if the pool is at capacity.
    ///
    /// Idle connections count: a pool holding `max` open connections cannot
    /// open another one.
    #[must_use]
    pub fn is_at_capacity(&self) -> bool {
        self.total >= self.max
    }
}

/// Metrics collected from the pool.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    /// Total connections created since pool start.
    pub connections_created: u64,
    /// Total connections closed since pool start.
    pub connections_closed: u64,
    /// Successful connection checkouts.
    pub checkouts_successful: u64,
    /// Failed connection checkouts (timeouts, pool closed, etc.).
    pub checkouts_failed: u64,
    /// Failed checkouts that timed out.
    pub checkout_timeouts: u64,
    /// Health checks performed.
    pub health_checks_performed: u64,
    /// Health checks that failed.
    pub health_checks_failed: u64,
    /// Time since pool creation.
    pub uptime: Duration,
}

impl PoolMetrics {
    /// Calculate checkout success rate (0.0 to 1.0).
    #[must_use]
    pub fn checkout_success_rate(&self) -> f64 {
        let total = self.checkouts_successful + self.checkouts_failed;
        if total == 0 {
            return 1.0;
        }
        self.checkouts_successful as f64 / total as f64
    }

    /// Calculate health check success rate (0.0 to 1.0).
    #[must_use]
    pub fn health_check_success_rate(&self) -> f64 {
        if self.health_checks_performed == 0 {
            return 1.0;
        }
        let successful = self.health_checks_performed - self.health_checks_failed;
        successful as f64 / self.health_checks_performed as f64
    }
}

/// A connection checked out of the pool.
///
/// When dropped, the connection is returned to the pool, unless it was
/// marked broken, has expired, or the lifecycle reports it broken; then it
/// is closed and its slot freed for a replacement.
pub struct PooledConnection<L: ConnectionLifecycle> {
    conn: Option<L::Connection>,
    metadata: ConnectionMetadata,
    broken: bool,
    pool: Arc<PoolInner<L>>,
    permit: Option<OwnedSemaphorePermit>,
}

impl<L: ConnectionLifecycle> PooledConnection<L> {
    fn new(
        conn: L::Connection,
        metadata: ConnectionMetadata,
        permit: OwnedSemaphorePermit,
        pool: Arc<PoolInner<L>>,
    ) -> Self {
        Self {
            conn: Some(conn),
            metadata,
            broken: false,
            pool,
            permit: Some(permit),
        }
    }

    /// Get the connection metadata.
    #[must_use]
    pub fn metadata(&self) -> &ConnectionMetadata {
        &self.metadata
    }

    /// Close this connection instead of recycling it when dropped.
    ///
    /// Use this when the connection's protocol state is unknown, e.g. after
    /// a query timed out.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    /// Check whether the connection has been marked broken.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Detach the connection from the pool.
    ///
    /// The pool stops tracking it and its slot is freed. The caller owns
    /// the returned connection.
    pub fn detach(mut self) -> L::Connection {
        match self.conn.take() {
            Some(conn) => {
                self.pool.total.fetch_sub(1, Ordering::AcqRel);
                tracing::trace!(connection_id = self.metadata.id, "connection detached");
                conn
            }
            None => unreachable!("pooled connection already released"),
        }
    }

    /// Close the connection and hand back the slot for another attempt.
    fn close_and_keep_permit(mut self) -> Option<OwnedSemaphorePermit> {
        if let Some(conn) = self.conn.take() {
            self.pool.close_connection(conn, &self.metadata);
        }
        self.permit.take()
    }
}

impl<L: ConnectionLifecycle> Deref for PooledConnection<L> {
    type Target = L::Connection;

    fn deref(&self) -> &Self::Target {
        match &self.conn {
            Some(conn) => conn,
            None => unreachable!("pooled connection already released"),
        }
    }
}

impl<L: ConnectionLifecycle> DerefMut for PooledConnection<L> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.conn {
            Some(conn) => conn,
            None => unreachable!("pooled connection already released"),
        }
    }
}

impl<L: ConnectionLifecycle> Drop for PooledConnection<L> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.check_in(conn, self.metadata.clone(), self.broken);
        }
        // The permit is released after the connection is back in the queue.
        drop(self.permit.take());
    }
}

impl<L: ConnectionLifecycle> fmt::Debug for PooledConnection<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.metadata.id)
            .field("broken", &self.broken)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_status_utilization() {
        let status = PoolStatus {
            available: 5,
            in_use: 5,
            total: 10,
            max: 20,
            waiting: 0,
        };
        assert!((status.utilization() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pool_status_at_capacity() {
        let status = PoolStatus {
            available: 0,
            in_use: 10,
            total: 10,
            max: 10,
            waiting: 3,
        };
        assert!(status.is_at_capacity());

        let idle_but_full = PoolStatus {
            available: 10,
            in_use: 0,
            total: 10,
            max: 10,
            waiting: 0,
        };
        assert!(idle_but_full.is_at_capacity());

        let status2 = PoolStatus {
            available: 5,
            in_use: 5,
            total: 10,
            max: 20,
            waiting: 0,
        };
        assert!(!status2.is_at_capacity());
    }

    #[test]
    fn test_pool_metrics_success_rates() {
        let metrics = PoolMetrics {
            connections_created: 10,
            connections_closed: 2,
            checkouts_successful: 90,
            checkouts_failed: 10,
            checkout_timeouts: 4,
            health_checks_performed: 100,
            health_checks_failed: 5,
            uptime: Duration::from_secs(3600),
        };

        assert!((metrics.checkout_success_rate() - 0.9).abs() < f64::EPSILON);
        assert!((metrics.health_check_success_rate() - 0.95).abs() < f64::EPSILON);
    }
}
