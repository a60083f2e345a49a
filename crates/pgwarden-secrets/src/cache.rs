//! Process-wide, write-once secret cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;

use crate::error::SecretError;
use crate::resolver::SecretResolver;

/// A resolved secret payload.
///
/// Cheap to clone. `Debug` never prints the payload.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    payload: Arc<[u8]>,
}

impl Secret {
    /// Wrap a payload.
    #[must_use]
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        let payload: Vec<u8> = payload.into();
        Self {
            payload: Arc::from(payload),
        }
    }

    /// The raw payload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    /// The payload as UTF-8 text.
    pub fn as_str(&self) -> Result<&str, SecretError> {
        std::str::from_utf8(&self.payload).map_err(|_| SecretError::Encoding("<cached>".into()))
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Check if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("len", &self.payload.len())
            .finish_non_exhaustive()
    }
}

/// Write-once cache of secrets keyed by resource identifier.
///
/// The first successful fetch of a resource is kept for the life of the
/// cache. While a fetch is in flight, other callers for the same resource
/// wait for it instead of issuing their own. A failed fetch leaves the
/// entry empty, so the next caller tries again.
pub struct SecretCache {
    resolver: Arc<dyn SecretResolver>,
    entries: Mutex<HashMap<String, Arc<OnceCell<Secret>>>>,
}

impl SecretCache {
    /// Create a cache in front of `resolver`.
    pub fn new(resolver: Arc<dyn SecretResolver>) -> Self {
        Self {
            resolver,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get a secret, fetching it on first use.
    pub async fn get(&self, resource_id: &str) -> Result<Secret, SecretError> {
        let cell = self.entry(resource_id);

        cell.get_or_try_init(|| async {
            tracing::debug!(
                resource = %resource_id,
                resolver = self.resolver.name(),
                "fetching secret"
            );
            match self.resolver.fetch(resource_id).await {
                Ok(payload) => Ok(Secret::new(payload)),
                Err(e) => {
                    tracing::warn!(resource = %resource_id, error = %e, "secret fetch failed");
                    Err(e)
                }
            }
        })
        .await
        .cloned()
    }

    /// The cached secret, without fetching.
    #[must_use]
    pub fn peek(&self, resource_id: &str) -> Option<Secret> {
        self.entries
            .lock()
            .get(resource_id)
            .and_then(|cell| cell.get().cloned())
    }

    /// Forget a cached secret so the next [`get`](Self::get) refetches it.
    ///
    /// A fetch already in flight completes for its current waiters.
    pub fn invalidate(&self, resource_id: &str) {
        if self.entries.lock().remove(resource_id).is_some() {
            tracing::info!(resource = %resource_id, "secret invalidated");
        }
    }

    /// Check whether a secret is cached.
    #[must_use]
    pub fn is_cached(&self, resource_id: &str) -> bool {
        self.peek(resource_id).is_some()
    }

    fn entry(&self, resource_id: &str) -> Arc<OnceCell<Secret>> {
        Arc::clone(
            self.entries
                .lock()
                .entry(resource_id.to_string())
                .or_default(),
        )
    }
}

impl fmt::Debug for SecretCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretCache")
            .field("resolver", &self.resolver.name())
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}
