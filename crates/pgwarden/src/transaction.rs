//! Transaction support.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::codec::ParamCodec;
use crate::connection::Connection;
use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::row::{QueryResult, Row};

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Read uncommitted. PostgreSQL runs this as read committed.
    ReadUncommitted,
    /// Read committed (default for PostgreSQL).
    #[default]
    ReadCommitted,
    /// Repeatable read.
    RepeatableRead,
    /// Serializable (highest isolation).
    Serializable,
}

impl IsolationLevel {
    /// Get the SQL statement that opens a transaction at this level.
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "BEGIN ISOLATION LEVEL READ UNCOMMITTED",
            Self::ReadCommitted => "BEGIN ISOLATION LEVEL READ COMMITTED",
            Self::RepeatableRead => "BEGIN ISOLATION LEVEL REPEATABLE READ",
            Self::Serializable => "BEGIN ISOLATION LEVEL SERIALIZABLE",
        }
    }
}

/// An open transaction on a checked-out [`Connection`].
///
/// [`commit`](Self::commit) and [`rollback`](Self::rollback) end the
/// transaction and release the connection whether or not the statement
/// succeeds. Dropping an unfinished transaction closes the session, which
/// makes the server roll it back.
pub struct Transaction<D: Driver> {
    conn: Connection<D>,
    isolation_level: Option<IsolationLevel>,
}

impl<D: Driver> Transaction<D> {
    pub(crate) async fn begin(mut conn: Connection<D>, level: Option<IsolationLevel>) -> Result<Self> {
        let sql = level.map_or("BEGIN", |l| l.as_sql());
        conn.run(sql).await?;
        conn.in_transaction = true;

        tracing::debug!(pool = conn.pool_key(), isolation_level = ?level, "transaction started");

        Ok(Self {
            conn,
            isolation_level: level,
        })
    }

    /// Isolation level requested at `begin`, `None` for the server default.
    #[must_use]
    pub fn isolation_level(&self) -> Option<IsolationLevel> {
        self.isolation_level
    }

    /// The connection the transaction runs on.
    pub fn connection(&mut self) -> &mut Connection<D> {
        &mut self.conn
    }

    /// Run statement text inside the transaction.
    pub async fn query(&mut self, sql: &str) -> Result<QueryResult> {
        self.conn.query(sql).await
    }

    /// Run a statement and return its rows.
    pub async fn query_rows(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.conn.query_rows(sql).await
    }

    /// Run a statement and return its first row.
    pub async fn query_first(&mut self, sql: &str) -> Result<Option<Row>> {
        self.conn.query_first(sql).await
    }

    /// Run a statement and return the number of rows it affected.
    pub async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.conn.execute(sql).await
    }

    /// Run a script one statement at a time inside the transaction.
    pub async fn query_file(&mut self, script: &str) -> Result<Vec<QueryResult>> {
        self.conn.query_file(script).await
    }

    /// Create a savepoint.
    ///
    /// The name is validated to prevent SQL injection.
    pub async fn savepoint(&mut self, name: &str) -> Result<()> {
        validate_identifier(name)?;
        tracing::debug!(name = name, "creating savepoint");
        self.conn.run(&format!("SAVEPOINT {name}")).await.map(drop)
    }

    /// Roll back to a savepoint, keeping the transaction open.
    pub async fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        validate_identifier(name)?;
        tracing::debug!(name = name, "rolling back to savepoint");
        self.conn
            .run(&format!("ROLLBACK TO SAVEPOINT {name}"))
            .await
            .map(drop)
    }

    /// Release a savepoint.
    pub async fn release_savepoint(&mut self, name: &str) -> Result<()> {
        validate_identifier(name)?;
        tracing::debug!(name = name, "releasing savepoint");
        self.conn
            .run(&format!("RELEASE SAVEPOINT {name}"))
            .await
            .map(drop)
    }

    /// Commit and release the connection.
    pub async fn commit(self) -> Result<()> {
        self.finish("COMMIT").await
    }

    /// Roll back and release the connection.
    pub async fn rollback(self) -> Result<()> {
        self.finish("ROLLBACK").await
    }

    async fn finish(mut self, sql: &'static str) -> Result<()> {
        let outcome = self.conn.run(sql).await;
        if outcome.is_err() {
            // Transaction state is unknown; never hand this session out again.
            self.conn.mark_broken();
        }
        self.conn.in_transaction = false;

        tracing::debug!(
            pool = self.conn.pool_key(),
            statement = sql,
            ok = outcome.is_ok(),
            "transaction finished"
        );

        outcome.map(drop)
    }
}

impl<D: Driver> ParamCodec for Transaction<D> {}

impl<D: Driver> std::fmt::Debug for Transaction<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("connection", &self.conn)
            .field("isolation_level", &self.isolation_level)
            .finish()
    }
}

/// Validate an identifier (savepoint name, table name, ...) to prevent SQL
/// injection. Unquoted PostgreSQL identifiers are at most 63 bytes.
pub fn validate_identifier(name: &str) -> Result<()> {
    static IDENTIFIER_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_$]{0,62}$").unwrap());

    if name.is_empty() {
        return Err(Error::InvalidIdentifier(
            "identifier cannot be empty".into(),
        ));
    }

    if !IDENTIFIER_RE.is_match(name) {
        return Err(Error::InvalidIdentifier(format!(
            "invalid identifier '{name}': must start with letter/underscore, \
             contain only alphanumerics/_/$, and be 1-63 characters"
        )));
    }

    Ok(())
}

/// Validate `table` or `schema.table`.
pub fn validate_qualified_name(name: &str) -> Result<()> {
    for part in name.splitn(2, '.') {
        validate_identifier(part)?;
    }
    Ok(())
}
