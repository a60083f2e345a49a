//! Tracing spans and statement sanitization.
//!
//! Span names and fields follow the database semantic conventions:
//!
//! - `db.system`: "postgresql"
//! - `db.client.pool.name`: registry key of the pool
//! - `db.operation`: statement verb (SELECT, INSERT, ...)
//! - `db.statement`: statement text with literals replaced
//!
//! Spans are created at `DEBUG`, so they cost nothing unless a subscriber
//! enables them.

use std::time::{Duration, Instant};

use tracing::Span;

/// Database system identifier for PostgreSQL.
pub const DB_SYSTEM: &str = "postgresql";

/// Span names for database operations.
pub mod span_names {
    /// Span name for opening a session.
    pub const CONNECT: &str = "pgwarden.connect";
    /// Span name for query execution.
    pub const QUERY: &str = "pgwarden.query";
    /// Span name for beginning a transaction.
    pub const BEGIN_TRANSACTION: &str = "pgwarden.begin_transaction";
    /// Span name for committing a transaction.
    pub const COMMIT: &str = "pgwarden.commit";
    /// Span name for rolling back a transaction.
    pub const ROLLBACK: &str = "pgwarden.rollback";
    /// Span name for savepoint operations.
    pub const SAVEPOINT: &str = "pgwarden.savepoint";
    /// Span name for a saturation snapshot.
    pub const SATURATION_SNAPSHOT: &str = "pgwarden.saturation_snapshot";
}

/// Configuration for SQL statement sanitization.
#[derive(Debug, Clone)]
pub struct SanitizationConfig {
    /// Whether to sanitize SQL statements.
    pub enabled: bool,
    /// Maximum length of statement to record.
    pub max_length: usize,
    /// Placeholder to use for sanitized values.
    pub placeholder: String,
}

impl Default for SanitizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_length: 2048,
            placeholder: "?".to_string(),
        }
    }
}

impl SanitizationConfig {
    /// Create a configuration that doesn't sanitize statements.
    #[must_use]
    pub fn no_sanitization() -> Self {
        Self {
            enabled: false,
            max_length: usize::MAX,
            placeholder: String::new(),
        }
    }

    /// Sanitize a SQL statement according to the configuration.
    #[must_use]
    pub fn sanitize(&self, sql: &str) -> String {
        if !self.enabled {
            return truncate_string(sql, self.max_length);
        }

        let sanitized = sanitize_sql(sql, &self.placeholder);
        truncate_string(&sanitized, self.max_length)
    }
}

/// Replace string constants, dollar-quoted bodies and numbers with
/// `placeholder`.
///
/// Quoted identifiers and `$n` parameter references are kept.
fn sanitize_sql(sql: &str, placeholder: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut result = String::with_capacity(sql.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let after_word = result.ends_with(|ch: char| ch.is_alphanumeric() || ch == '_' || ch == '$');

        if c == '\'' {
            i += 1;
            while let Some(&ch) = chars.get(i) {
                i += 1;
                if ch == '\'' {
                    if chars.get(i) == Some(&'\'') {
                        i += 1;
                        continue;
                    }
                    break;
                }
            }
            result.push_str(placeholder);
            continue;
        }

        if c == '"' {
            let start = i;
            i += 1;
            while let Some(&ch) = chars.get(i) {
                i += 1;
                if ch == '"' {
                    if chars.get(i) == Some(&'"') {
                        i += 1;
                        continue;
                    }
                    break;
                }
            }
            result.extend(&chars[start..i]);
            continue;
        }

        if c == '$' && !after_word {
            if let Some(tag_len) = dollar_tag_len(&chars[i..]) {
                let body = i + tag_len;
                let tag = &chars[i..body];
                i = chars[body..]
                    .windows(tag_len)
                    .position(|window| window == tag)
                    .map_or(chars.len(), |pos| body + pos + tag_len);
                result.push_str(placeholder);
                continue;
            }
        }

        if c.is_ascii_digit() && !after_word {
            while chars
                .get(i)
                .is_some_and(|ch| ch.is_ascii_digit() || *ch == '.')
            {
                i += 1;
            }
            result.push_str(placeholder);
            continue;
        }

        result.push(c);
        i += 1;
    }

    result
}

/// Length of the `$tag$` opening `chars`, if it is one.
fn dollar_tag_len(chars: &[char]) -> Option<usize> {
    let mut n = 1;
    while let Some(&ch) = chars.get(n) {
        if ch == '$' {
            return Some(n + 1);
        }
        let valid = if n == 1 {
            ch.is_alphabetic() || ch == '_'
        } else {
            ch.is_alphanumeric() || ch == '_'
        };
        if !valid {
            return None;
        }
        n += 1;
    }
    None
}

/// Truncate a string to at most `max_len` bytes, on a char boundary.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }

    let mut end = max_len.saturating_sub(3);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Extract the operation type from a SQL statement.
#[must_use]
pub fn extract_operation(sql: &str) -> &'static str {
    let mut words = sql.split_whitespace();
    let first = words.next().unwrap_or_default().to_ascii_uppercase();

    match first.as_str() {
        "SELECT" | "VALUES" | "TABLE" | "SHOW" => "SELECT",
        "INSERT" => "INSERT",
        "UPDATE" => "UPDATE",
        "DELETE" => "DELETE",
        "MERGE" => "MERGE",
        "WITH" => "WITH",
        "BEGIN" | "START" => "BEGIN",
        "COMMIT" | "END" => "COMMIT",
        "ROLLBACK" | "ABORT" => {
            if words.next().is_some_and(|w| w.eq_ignore_ascii_case("TO")) {
                "SAVEPOINT"
            } else {
                "ROLLBACK"
            }
        }
        "SAVEPOINT" | "RELEASE" => "SAVEPOINT",
        "CALL" | "DO" | "EXECUTE" => "EXECUTE",
        "COPY" => "COPY",
        "CREATE" => "CREATE",
        "ALTER" => "ALTER",
        "DROP" => "DROP",
        "TRUNCATE" => "TRUNCATE",
        "SET" | "RESET" => "SET",
        _ => "OTHER",
    }
}

/// Span for opening a session of `pool`.
#[must_use]
pub fn connect_span(pool: &str, database: Option<&str>) -> Span {
    tracing::debug_span!(
        span_names::CONNECT,
        db.system = DB_SYSTEM,
        db.client.pool.name = pool,
        db.name = database.unwrap_or_default()
    )
}

/// Span for one statement. Transaction control statements get their own
/// span names.
#[must_use]
pub fn query_span(pool: &str, operation: &'static str, statement: &str) -> Span {
    match operation {
        "BEGIN" => tracing::debug_span!(
            span_names::BEGIN_TRANSACTION,
            db.system = DB_SYSTEM,
            db.client.pool.name = pool,
            db.operation = operation
        ),
        "COMMIT" => tracing::debug_span!(
            span_names::COMMIT,
            db.system = DB_SYSTEM,
            db.client.pool.name = pool,
            db.operation = operation
        ),
        "ROLLBACK" => tracing::debug_span!(
            span_names::ROLLBACK,
            db.system = DB_SYSTEM,
            db.client.pool.name = pool,
            db.operation = operation
        ),
        "SAVEPOINT" => tracing::debug_span!(
            span_names::SAVEPOINT,
            db.system = DB_SYSTEM,
            db.client.pool.name = pool,
            db.operation = operation,
            db.statement = statement
        ),
        _ => tracing::debug_span!(
            span_names::QUERY,
            db.system = DB_SYSTEM,
            db.client.pool.name = pool,
            db.operation = operation,
            db.statement = statement
        ),
    }
}

/// Span around capturing and writing one saturation snapshot.
#[must_use]
pub fn snapshot_span(pool: &str) -> Span {
    tracing::debug_span!(
        span_names::SATURATION_SNAPSHOT,
        db.system = DB_SYSTEM,
        db.client.pool.name = pool
    )
}

/// Helper for timing operations.
#[derive(Debug, Clone)]
pub struct OperationTimer {
    start: Instant,
    operation: &'static str,
}

impl OperationTimer {
    /// Start timing an operation.
    #[must_use]
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }

    /// Time since the timer started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed time in whole milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Get the operation name.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_operation() {
        assert_eq!(extract_operation("SELECT * FROM users"), "SELECT");
        assert_eq!(extract_operation("  select id from users"), "SELECT");
        assert_eq!(extract_operation("INSERT INTO users VALUES (1)"), "INSERT");
        assert_eq!(extract_operation("UPDATE users SET name = 'foo'"), "UPDATE");
        assert_eq!(extract_operation("DELETE FROM users"), "DELETE");
        assert_eq!(extract_operation("WITH t AS (SELECT 1) SELECT * FROM t"), "WITH");
        assert_eq!(extract_operation("BEGIN ISOLATION LEVEL SERIALIZABLE"), "BEGIN");
        assert_eq!(extract_operation("START TRANSACTION"), "BEGIN");
        assert_eq!(extract_operation("COMMIT"), "COMMIT");
        assert_eq!(extract_operation("ROLLBACK"), "ROLLBACK");
        assert_eq!(extract_operation("ROLLBACK TO SAVEPOINT sp1"), "SAVEPOINT");
        assert_eq!(extract_operation("RELEASE SAVEPOINT sp1"), "SAVEPOINT");
        assert_eq!(extract_operation("COPY t FROM STDIN"), "COPY");
        assert_eq!(extract_operation("CREATE TABLE foo"), "CREATE");
        assert_eq!(extract_operation(""), "OTHER");
        assert_eq!(extract_operation("unknown stuff"), "OTHER");
    }

    #[test]
    fn test_sanitize_sql() {
        let placeholder = "?";

        assert_eq!(
            sanitize_sql("SELECT * FROM users WHERE name = 'Alice'", placeholder),
            "SELECT * FROM users WHERE name = ?"
        );
        assert_eq!(
            sanitize_sql("INSERT INTO t VALUES ('a', 'b')", placeholder),
            "INSERT INTO t VALUES (?, ?)"
        );
        assert_eq!(
            sanitize_sql("SELECT * WHERE name = 'O''Brien'", placeholder),
            "SELECT * WHERE name = ?"
        );
        assert_eq!(
            sanitize_sql("SELECT * WHERE id = 42 AND name = 'test'", placeholder),
            "SELECT * WHERE id = ? AND name = ?"
        );
    }

    #[test]
    fn test_sanitize_dollar_quotes() {
        assert_eq!(
            sanitize_sql("UPDATE t SET v = $$it's$$ WHERE k = $q0$a$$b$q0$", "?"),
            "UPDATE t SET v = ? WHERE k = ?"
        );
        assert_eq!(sanitize_sql("SELECT $tag$unterminated", "?"), "SELECT ?");
    }

    #[test]
    fn test_sanitize_keeps_identifiers_and_parameters() {
        assert_eq!(
            sanitize_sql(r#"SELECT "col1" FROM t2 WHERE a = $1"#, "?"),
            r#"SELECT "col1" FROM t2 WHERE a = $1"#
        );
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("hi", 2), "hi");
        assert_eq!(truncate_string("ééééé", 6), "é...");
    }

    #[test]
    fn test_sanitization_config_default() {
        let config = SanitizationConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_length, 2048);
        assert_eq!(config.placeholder, "?");
    }

    #[test]
    fn test_sanitization_config_no_sanitization() {
        let config = SanitizationConfig::no_sanitization();
        assert!(!config.enabled);

        let sql = "SELECT * FROM users WHERE name = 'Alice'";
        assert_eq!(config.sanitize(sql), sql);
    }
}
