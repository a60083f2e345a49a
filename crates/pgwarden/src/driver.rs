//! The physical connect and simple-query primitives.
//!
//! [`Driver`] opens sessions from merged [`PoolOptions`]; [`Session`] runs
//! statement text. [`SessionLifecycle`] adapts a driver to the physical
//! pool so tests can swap in an in-memory driver.

use std::sync::Arc;

use async_trait::async_trait;
use pgwarden_pool::{ConnectionLifecycle, HealthCheckResult};

use crate::config::PoolOptions;
use crate::error::{Error, Result};
use crate::row::QueryResult;

/// Statement used to check an idle session before handing it out.
pub const HEALTH_CHECK_QUERY: &str = "SELECT 1";

/// Opens database sessions.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// Session type produced by this driver.
    type Session: Session;

    /// Open a session using `options`.
    async fn connect(&self, options: &PoolOptions) -> Result<Self::Session>;
}

/// One open database session.
#[async_trait]
pub trait Session: Send + 'static {
    /// Run statement text through the simple-query protocol.
    ///
    /// The text may hold several `;`-separated statements.
    async fn simple_query(&mut self, sql: &str) -> Result<QueryResult>;

    /// Check whether the session has been closed underneath us.
    fn is_closed(&self) -> bool;
}

/// Pool lifecycle backed by a [`Driver`] and one pool's options.
pub struct SessionLifecycle<D: Driver> {
    driver: Arc<D>,
    options: PoolOptions,
}

impl<D: Driver> SessionLifecycle<D> {
    /// Create a lifecycle for sessions opened with `options`.
    pub fn new(driver: Arc<D>, options: PoolOptions) -> Self {
        Self { driver, options }
    }

    /// The options sessions are opened with.
    #[must_use]
    pub fn options(&self) -> &PoolOptions {
        &self.options
    }
}

impl<D: Driver> std::fmt::Debug for SessionLifecycle<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLifecycle")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<D: Driver> ConnectionLifecycle for SessionLifecycle<D> {
    type Connection = D::Session;
    type Error = Error;

    async fn connect(&self) -> Result<D::Session> {
        self.driver.connect(&self.options).await
    }

    async fn health_check(&self, conn: &mut D::Session) -> HealthCheckResult {
        match conn.simple_query(HEALTH_CHECK_QUERY).await {
            Ok(_) => HealthCheckResult::Healthy,
            Err(e) => HealthCheckResult::Unhealthy(e.to_string()),
        }
    }

    fn has_broken(&self, conn: &mut D::Session) -> bool {
        conn.is_closed()
    }
}
