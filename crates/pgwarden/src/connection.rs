//! Checked-out connections.

use std::sync::Arc;
use std::time::Duration;

use pgwarden_pool::PooledConnection;
use tracing::Instrument;

use crate::codec::ParamCodec;
use crate::driver::{Driver, Session, SessionLifecycle};
use crate::error::{Error, Result};
use crate::instrumentation::{self, OperationTimer, SanitizationConfig};
use crate::row::{QueryResult, Row};
use crate::transaction::{IsolationLevel, Transaction};

/// A session checked out of a [`ManagedPool`](crate::ManagedPool).
///
/// Dropping the connection returns it to its pool. A connection that hit a
/// query timeout or a transport error is closed instead, and its slot is
/// refilled on demand.
pub struct Connection<D: Driver> {
    pub(crate) pooled: PooledConnection<SessionLifecycle<D>>,
    pool_key: Arc<str>,
    query_timeout: Option<Duration>,
    sanitization: Arc<SanitizationConfig>,
    pub(crate) in_transaction: bool,
}

impl<D: Driver> Connection<D> {
    pub(crate) fn new(
        pooled: PooledConnection<SessionLifecycle<D>>,
        pool_key: Arc<str>,
        query_timeout: Option<Duration>,
        sanitization: Arc<SanitizationConfig>,
    ) -> Self {
        Self {
            pooled,
            pool_key,
            query_timeout,
            sanitization,
            in_transaction: false,
        }
    }

    /// Registry key of the pool this connection came from.
    #[must_use]
    pub fn pool_key(&self) -> &str {
        &self.pool_key
    }

    /// Client-side per-statement budget, if any.
    #[must_use]
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout
    }

    /// How statement text from this connection is sanitized in logs.
    #[must_use]
    pub fn sanitization(&self) -> &SanitizationConfig {
        &self.sanitization
    }

    /// Pool-unique id of the underlying session.
    #[must_use]
    pub fn session_id(&self) -> u64 {
        self.pooled.metadata().id
    }

    /// The driver session, for driver-specific calls.
    pub fn session(&mut self) -> &mut D::Session {
        &mut self.pooled
    }

    /// Run statement text and return every row and the affected count.
    pub async fn query(&mut self, sql: &str) -> Result<QueryResult> {
        self.run(sql).await
    }

    /// Run a statement and return its rows.
    pub async fn query_rows(&mut self, sql: &str) -> Result<Vec<Row>> {
        Ok(self.run(sql).await?.into_rows())
    }

    /// Run a statement and return its first row.
    pub async fn query_first(&mut self, sql: &str) -> Result<Option<Row>> {
        Ok(self.run(sql).await?.into_rows().into_iter().next())
    }

    /// Run a statement and return the number of rows it affected.
    pub async fn execute(&mut self, sql: &str) -> Result<u64> {
        Ok(self.run(sql).await?.rows_affected)
    }

    /// Run a SQL script one statement at a time.
    ///
    /// See [`split_script`] for how the script is cut. Stops at the first
    /// failing statement.
    pub async fn query_file(&mut self, script: &str) -> Result<Vec<QueryResult>> {
        let statements = split_script(script);
        tracing::debug!(pool = %self.pool_key, statements = statements.len(), "running script");

        let mut results = Vec::with_capacity(statements.len());
        for statement in &statements {
            results.push(self.run(statement).await?);
        }
        Ok(results)
    }

    /// Begin a transaction at the server's default isolation level.
    pub async fn begin(self) -> Result<Transaction<D>> {
        Transaction::begin(self, None).await
    }

    /// Begin a transaction at `level`.
    pub async fn begin_with(self, level: IsolationLevel) -> Result<Transaction<D>> {
        Transaction::begin(self, Some(level)).await
    }

    /// Return the connection to its pool.
    pub fn release(self) {
        drop(self);
    }

    /// Close the session instead of returning it to the pool.
    pub fn discard(mut self) {
        self.pooled.mark_broken();
    }

    /// Check whether the connection will be closed on release.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.pooled.is_broken()
    }

    pub(crate) fn mark_broken(&mut self) {
        self.pooled.mark_broken();
    }

    pub(crate) async fn run(&mut self, sql: &str) -> Result<QueryResult> {
        let operation = instrumentation::extract_operation(sql);
        let statement = self.sanitization.sanitize(sql);
        let span = instrumentation::query_span(&self.pool_key, operation, &statement);
        let timer = OperationTimer::start(operation);

        let outcome = {
            let query = self.pooled.simple_query(sql).instrument(span);
            match self.query_timeout {
                Some(budget) => tokio::time::timeout(budget, query)
                    .await
                    .unwrap_or_else(|_| Err(Error::QueryTimeout(budget))),
                None => query.await,
            }
        };

        match &outcome {
            Ok(result) => tracing::debug!(
                pool = %self.pool_key,
                operation = timer.operation(),
                statement = %statement,
                rows = result.rows.len(),
                rows_affected = result.rows_affected,
                elapsed_ms = timer.elapsed_ms(),
                "statement executed"
            ),
            Err(e) => {
                if e.is_connection_error() {
                    self.pooled.mark_broken();
                }
                tracing::debug!(
                    pool = %self.pool_key,
                    operation = timer.operation(),
                    statement = %statement,
                    error = %e,
                    elapsed_ms = timer.elapsed_ms(),
                    "statement failed"
                );
            }
        }

        outcome
    }
}

impl<D: Driver> ParamCodec for Connection<D> {}

impl<D: Driver> Drop for Connection<D> {
    fn drop(&mut self) {
        if self.in_transaction {
            tracing::warn!(
                pool = %self.pool_key,
                "connection dropped inside a transaction, discarding session"
            );
            self.pooled.mark_broken();
        }
    }
}

impl<D: Driver> std::fmt::Debug for Connection<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("pool", &self.pool_key)
            .field("session_id", &self.pooled.metadata().id)
            .field("in_transaction", &self.in_transaction)
            .field("broken", &self.pooled.is_broken())
            .finish_non_exhaustive()
    }
}

/// Cut a SQL script into statements.
///
/// Runs of whitespace (newlines included) collapse to one space, the text
/// is split on every `;`, and empty pieces are dropped. Semicolons inside
/// string constants or function bodies are split too, so scripts that need
/// them should be sent whole through [`Connection::query`].
#[must_use]
pub fn split_script(script: &str) -> Vec<String> {
    let collapsed = script.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_script() {
        let script = "
            CREATE TABLE t (id int);

            INSERT INTO t
                VALUES (1);;
            SELECT *   FROM t
        ";
        assert_eq!(
            split_script(script),
            vec![
                "CREATE TABLE t (id int)",
                "INSERT INTO t VALUES (1)",
                "SELECT * FROM t",
            ]
        );
    }

    #[test]
    fn test_split_script_empty() {
        assert!(split_script("").is_empty());
        assert!(split_script(" ;\n; ").is_empty());
    }
}
