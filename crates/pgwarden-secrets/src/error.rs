//! Secret resolution errors.

use thiserror::Error;

/// Errors raised while resolving or decoding a secret.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SecretError {
    /// The secret store has no resource with this identifier.
    #[error("secret not found: {0}")]
    NotFound(String),

    /// The secret store could not be reached or refused the request.
    #[error("secret transport failed for {resource}: {message}")]
    Transport {
        /// Resource identifier.
        resource: String,
        /// Transport error message.
        message: String,
    },

    /// The payload is not valid UTF-8.
    #[error("secret {0} is not valid UTF-8")]
    Encoding(String),

    /// The payload could not be parsed into the expected document.
    #[error("secret {resource} is malformed: {message}")]
    Malformed {
        /// Resource identifier.
        resource: String,
        /// Parser error message.
        message: String,
    },
}

impl SecretError {
    /// Create a transport error.
    pub fn transport(resource: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Transport {
            resource: resource.into(),
            message: message.to_string(),
        }
    }

    /// Check if retrying the fetch may succeed without changing the store.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
