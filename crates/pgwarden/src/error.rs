//! Error types for pool management and query execution.

use std::time::Duration;

use pgwarden_pool::PoolError;
use pgwarden_secrets::SecretError;
use pgwarden_types::ValidationError;
use thiserror::Error;

/// Result type alias using the crate's [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while acquiring a connection or running a query.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A codec rejected a parameter.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The pool could not be configured.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Session could not be established or was lost.
    #[error("connection failed: {0}")]
    Connection(String),

    /// No connection became available within the configured timeout.
    #[error("timed out after {0:?} waiting for a connection")]
    Timeout(Duration),

    /// The statement did not finish within the client-side query timeout.
    #[error("query timed out after {0:?}")]
    QueryTimeout(Duration),

    /// The server rejected the statement.
    #[error("query failed: {message}")]
    Query {
        /// Formatted server message, including detail and hint when present.
        message: String,
        /// SQLSTATE code, when the server sent one.
        code: Option<String>,
    },

    /// A column could not be read from a row.
    #[error("column error: {0}")]
    Column(String),

    /// The pool has been drained and accepts no new checkouts.
    #[error("pool {0:?} is closed")]
    PoolClosed(String),

    /// Identifier failed validation before being spliced into SQL.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Draining a pool did not finish within the shutdown budget.
    #[error("draining pool {key:?} timed out after {timeout:?}")]
    DrainTimeout {
        /// Registry key of the pool.
        key: String,
        /// Budget that was exceeded.
        timeout: Duration,
    },
}

impl Error {
    /// Check if this error means the session itself is unusable.
    ///
    /// Connections that fail this way are discarded instead of being
    /// returned to the pool.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::QueryTimeout(_))
    }

    /// Check if this is a timeout of any kind.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::QueryTimeout(_) | Self::DrainTimeout { .. }
        )
    }

    /// SQLSTATE code of a server error.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Query { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Convert a driver error, keeping server detail, hint and SQLSTATE.
    #[must_use]
    pub fn from_pg(error: &tokio_postgres::Error) -> Self {
        if let Some(db) = error.as_db_error() {
            let mut message = db.message().to_string();
            if let Some(detail) = db.detail() {
                message.push_str("\nDetail: ");
                message.push_str(detail);
            }
            if let Some(hint) = db.hint() {
                message.push_str("\nHint: ");
                message.push_str(hint);
            }
            if let Some(column) = db.column() {
                message.push_str("\nColumn: ");
                message.push_str(column);
            }
            return Self::Query {
                message,
                code: Some(db.code().code().to_string()),
            };
        }

        Self::Connection(error.to_string())
    }

    /// Map a pool error for the pool registered under `key`.
    ///
    /// Connect failures travel through the pool boxed; they are unwrapped
    /// back into the original error when it is one of ours.
    pub(crate) fn from_pool(key: &str, error: PoolError) -> Self {
        match error {
            PoolError::PoolClosed => Self::PoolClosed(key.to_string()),
            PoolError::Timeout(elapsed) => Self::Timeout(elapsed),
            PoolError::Connection(source) => match source.downcast::<Self>() {
                Ok(inner) => *inner,
                Err(other) => Self::Connection(other.to_string()),
            },
            PoolError::Configuration(message) => {
                Self::Config(ConfigError::InvalidOptions(message))
            }
            other => Self::Connection(other.to_string()),
        }
    }
}

/// Errors raised while turning secrets and settings into a pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The connection profile set has no entry for the pool's database key.
    #[error("no connection profile named {0:?}")]
    MissingProfile(String),

    /// The secret store could not supply a document.
    #[error(transparent)]
    Secret(#[from] SecretError),

    /// A profile was present but could not be read as pool options.
    #[error("malformed connection profile: {0}")]
    Malformed(String),

    /// The merged options are inconsistent.
    #[error("invalid pool options: {0}")]
    InvalidOptions(String),

    /// A process-level setting is invalid.
    #[error("invalid setting {name}: {message}")]
    InvalidSetting {
        /// Setting or environment variable name.
        name: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Errors from capturing or persisting a saturation snapshot.
///
/// These never reach the caller whose checkout triggered the snapshot;
/// they are logged and dropped.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiagnosticError {
    /// Capturing and writing the snapshot took too long.
    #[error("saturation snapshot timed out after {0:?}")]
    Timeout(Duration),

    /// The log pool or one of its statements failed.
    #[error("saturation snapshot failed: {0}")]
    Database(#[from] Error),

    /// The snapshot could not be encoded.
    #[error("saturation snapshot could not be encoded: {0}")]
    Encode(#[from] ValidationError),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_discard_session() {
        assert!(Error::Connection("reset".into()).is_connection_error());
        assert!(Error::QueryTimeout(Duration::from_secs(1)).is_connection_error());
        assert!(
            !Error::Query {
                message: "syntax error".into(),
                code: Some("42601".into()),
            }
            .is_connection_error()
        );
        assert!(!Error::Timeout(Duration::from_secs(1)).is_connection_error());
    }

    #[test]
    fn test_pool_error_mapping() {
        let closed = Error::from_pool("stage", PoolError::PoolClosed);
        assert!(matches!(closed, Error::PoolClosed(ref key) if key == "stage"));

        let timeout = Error::from_pool("stage", PoolError::Timeout(Duration::from_millis(5)));
        assert!(timeout.is_timeout());

        let boxed = PoolError::Connection(Box::new(Error::Query {
            message: "password authentication failed".into(),
            code: Some("28P01".into()),
        }));
        let unwrapped = Error::from_pool("stage", boxed);
        assert_eq!(unwrapped.code(), Some("28P01"));

        let foreign = PoolError::Connection(Box::new(std::io::Error::other("boom")));
        assert!(matches!(
            Error::from_pool("stage", foreign),
            Error::Connection(ref m) if m == "boom"
        ));
    }

    #[test]
    fn test_config_error_conversion() {
        let err: Error = ConfigError::MissingProfile("demo".into()).into();
        assert_eq!(err.to_string(), "no connection profile named \"demo\"");

        let err: ConfigError = SecretError::NotFound("connections".into()).into();
        assert!(matches!(err, ConfigError::Secret(_)));
    }
}
