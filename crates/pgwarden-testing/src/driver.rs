//! In-memory driver.
//!
//! Sessions never touch the network. Replies are scripted by statement
//! prefix; the first matching rule wins, newest rule first. Without a
//! matching rule `SELECT 1` returns one row, `INSERT`/`UPDATE`/`DELETE`
//! report one affected row and everything else returns an empty result.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pgwarden::{Driver, Error, PoolOptions, QueryResult, Result, Row, Session};

/// Build a query result from string cells. `None` is SQL NULL.
#[must_use]
pub fn rows(columns: &[&str], values: &[&[Option<&str>]]) -> QueryResult {
    let columns: Arc<[String]> = columns.iter().map(|c| (*c).to_string()).collect();
    let rows = values
        .iter()
        .map(|row| {
            Row::new(
                Arc::clone(&columns),
                row.iter().map(|v| v.map(str::to_string)).collect(),
            )
        })
        .collect();
    QueryResult::new(rows, 0)
}

#[derive(Clone)]
enum Reply {
    Result(QueryResult),
    Fail { message: String, code: Option<String> },
    Disconnect,
}

#[derive(Clone)]
struct Rule {
    prefix: String,
    reply: Option<Reply>,
    delay: Duration,
}

#[derive(Default)]
struct State {
    connects: AtomicUsize,
    live: AtomicUsize,
    next_session: AtomicU64,
    fail_connects: AtomicBool,
    connect_delay: Mutex<Duration>,
    rules: Mutex<Vec<Rule>>,
    statements: Mutex<Vec<(u64, String)>>,
    last_options: Mutex<Option<PoolOptions>>,
}

impl State {
    fn rule_for(&self, sql: &str) -> Option<Rule> {
        self.rules
            .lock()
            .iter()
            .rev()
            .find(|rule| sql.starts_with(&rule.prefix))
            .cloned()
    }
}

/// In-memory [`Driver`]. Clones share state.
#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<State>,
}

impl MockDriver {
    /// Create a driver with no scripted replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer statements starting with `prefix` with `result`.
    pub fn on_query(&self, prefix: impl Into<String>, result: QueryResult) {
        self.push_rule(prefix, Some(Reply::Result(result)), Duration::ZERO);
    }

    /// Fail statements starting with `prefix` with a server error.
    pub fn fail_query(&self, prefix: impl Into<String>, message: impl Into<String>) {
        self.fail_query_with_code(prefix, message, None);
    }

    /// Fail statements starting with `prefix` with a server error carrying
    /// an SQLSTATE code.
    pub fn fail_query_with_code(
        &self,
        prefix: impl Into<String>,
        message: impl Into<String>,
        code: Option<&str>,
    ) {
        let reply = Reply::Fail {
            message: message.into(),
            code: code.map(str::to_string),
        };
        self.push_rule(prefix, Some(reply), Duration::ZERO);
    }

    /// Drop the session when a statement starts with `prefix`.
    pub fn disconnect_on(&self, prefix: impl Into<String>) {
        self.push_rule(prefix, Some(Reply::Disconnect), Duration::ZERO);
    }

    /// Delay statements starting with `prefix` by `delay` before answering
    /// them as usual.
    pub fn delay_on(&self, prefix: impl Into<String>, delay: Duration) {
        self.push_rule(prefix, None, delay);
    }

    /// Remove every scripted reply and delay.
    pub fn clear_rules(&self) {
        self.state.rules.lock().clear();
    }

    /// Make every connect attempt fail (or succeed again).
    pub fn fail_connects(&self, fail: bool) {
        self.state.fail_connects.store(fail, Ordering::Release);
    }

    /// Delay every connect attempt.
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.state.connect_delay.lock() = delay;
    }

    /// Successful connects so far.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::Acquire)
    }

    /// Sessions currently open.
    #[must_use]
    pub fn live_sessions(&self) -> usize {
        self.state.live.load(Ordering::Acquire)
    }

    /// Every statement run so far, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.state
            .statements
            .lock()
            .iter()
            .map(|(_, sql)| sql.clone())
            .collect()
    }

    /// Statements starting with `prefix`, in order.
    #[must_use]
    pub fn statements_matching(&self, prefix: &str) -> Vec<String> {
        self.state
            .statements
            .lock()
            .iter()
            .filter(|(_, sql)| sql.starts_with(prefix))
            .map(|(_, sql)| sql.clone())
            .collect()
    }

    /// Statements run by the session with id `session`.
    #[must_use]
    pub fn statements_on(&self, session: u64) -> Vec<String> {
        self.state
            .statements
            .lock()
            .iter()
            .filter(|(id, _)| *id == session)
            .map(|(_, sql)| sql.clone())
            .collect()
    }

    /// Forget recorded statements, keeping rules.
    pub fn clear_statements(&self) {
        self.state.statements.lock().clear();
    }

    /// Options of the most recent connect attempt.
    #[must_use]
    pub fn last_options(&self) -> Option<PoolOptions> {
        self.state.last_options.lock().clone()
    }

    fn push_rule(&self, prefix: impl Into<String>, reply: Option<Reply>, delay: Duration) {
        self.state.rules.lock().push(Rule {
            prefix: prefix.into(),
            reply,
            delay,
        });
    }
}

impl std::fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDriver")
            .field("connects", &self.connect_count())
            .field("live", &self.live_sessions())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Driver for MockDriver {
    type Session = MockSession;

    async fn connect(&self, options: &PoolOptions) -> Result<MockSession> {
        *self.state.last_options.lock() = Some(options.clone());

        let delay = *self.state.connect_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.state.fail_connects.load(Ordering::Acquire) {
            return Err(Error::Connection("connection refused".into()));
        }

        self.state.connects.fetch_add(1, Ordering::AcqRel);
        self.state.live.fetch_add(1, Ordering::AcqRel);
        let id = self.state.next_session.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(session = id, "mock session opened");

        Ok(MockSession {
            id,
            state: Arc::clone(&self.state),
            closed: false,
        })
    }
}

/// Session opened by [`MockDriver`].
pub struct MockSession {
    id: u64,
    state: Arc<State>,
    closed: bool,
}

impl MockSession {
    /// Driver-assigned id, starting at 1. Matches
    /// [`MockDriver::statements_on`].
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Simulate the server closing the session.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl std::fmt::Debug for MockSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSession")
            .field("id", &self.id)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Session for MockSession {
    async fn simple_query(&mut self, sql: &str) -> Result<QueryResult> {
        if self.closed {
            return Err(Error::Connection("session closed".into()));
        }
        self.state.statements.lock().push((self.id, sql.to_string()));

        let rule = self.state.rule_for(sql);
        if let Some(delay) = rule.as_ref().map(|r| r.delay).filter(|d| !d.is_zero()) {
            tokio::time::sleep(delay).await;
        }

        match rule.and_then(|r| r.reply) {
            Some(Reply::Result(result)) => Ok(result),
            Some(Reply::Fail { message, code }) => Err(Error::Query { message, code }),
            Some(Reply::Disconnect) => {
                self.closed = true;
                Err(Error::Connection("server closed the connection".into()))
            }
            None => Ok(default_reply(sql)),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.state.live.fetch_sub(1, Ordering::AcqRel);
        tracing::trace!(session = self.id, "mock session dropped");
    }
}

fn default_reply(sql: &str) -> QueryResult {
    if sql == "SELECT 1" {
        return rows(&["?column?"], &[&[Some("1")]]);
    }

    let verb = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    match verb.as_str() {
        "INSERT" | "UPDATE" | "DELETE" => QueryResult::new(Vec::new(), 1),
        _ => QueryResult::default(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replies() {
        let driver = MockDriver::new();
        driver.on_query("SELECT name", rows(&["name"], &[&[Some("a")], &[None]]));
        driver.fail_query_with_code("DROP", "permission denied", Some("42501"));

        let mut session = driver.connect(&PoolOptions::new()).await.unwrap();
        assert_eq!(driver.live_sessions(), 1);

        let result = session.simple_query("SELECT name FROM t").await.unwrap();
        assert_eq!(result.rows.len(), 2);
        assert!(result.rows[1].is_null(0));

        let err = session.simple_query("DROP TABLE t").await.unwrap_err();
        assert_eq!(err.code(), Some("42501"));

        let ping = session.simple_query("SELECT 1").await.unwrap();
        assert_eq!(ping.rows[0].get::<i32>(0).unwrap(), 1);
        assert_eq!(session.simple_query("DELETE FROM t").await.unwrap().rows_affected, 1);

        assert_eq!(driver.statements_on(session.id()).len(), 4);
        drop(session);
        assert_eq!(driver.live_sessions(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_closes_session() {
        let driver = MockDriver::new();
        driver.disconnect_on("SELECT pg_terminate");

        let mut session = driver.connect(&PoolOptions::new()).await.unwrap();
        let err = session.simple_query("SELECT pg_terminate_backend(1)").await.unwrap_err();
        assert!(err.is_connection_error());
        assert!(session.is_closed());
        assert!(session.simple_query("SELECT 1").await.is_err());
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let driver = MockDriver::new();
        driver.fail_connects(true);
        assert!(driver.connect(&PoolOptions::new()).await.is_err());
        assert_eq!(driver.connect_count(), 0);
        assert_eq!(driver.live_sessions(), 0);
        assert!(driver.last_options().is_some());
    }
}
