//! JSON documents stored as secrets.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use crate::cache::SecretCache;
use crate::error::SecretError;

/// A cached, parsed view of one secret resource.
///
/// The payload is fetched through a [`SecretCache`] and parsed as JSON into
/// `T` once. Parse failures are reported as [`SecretError::Malformed`] and,
/// like fetch failures, are not cached: the raw payload is evicted as well,
/// so the next load fetches the resource again.
pub struct SecretDocument<T> {
    resource_id: String,
    parsed: Mutex<Arc<OnceCell<Arc<T>>>>,
}

impl<T> SecretDocument<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Create a document view over `resource_id`.
    pub fn new(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            parsed: Mutex::new(Arc::new(OnceCell::new())),
        }
    }

    /// The resource this document reads.
    #[must_use]
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Load the document, fetching and parsing it on first use.
    pub async fn load(&self, cache: &SecretCache) -> Result<Arc<T>, SecretError> {
        let cell = Arc::clone(&self.parsed.lock());

        cell.get_or_try_init(|| async {
            let secret = cache.get(&self.resource_id).await?;
            serde_json::from_slice::<T>(secret.as_bytes())
                .map(Arc::new)
                .map_err(|e| {
                    // Drop the payload too, so the retry reaches the resolver.
                    cache.invalidate(&self.resource_id);
                    SecretError::Malformed {
                        resource: self.resource_id.clone(),
                        message: e.to_string(),
                    }
                })
        })
        .await
        .cloned()
    }

    /// Check whether the document has been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.parsed.lock().initialized()
    }

    /// Drop the parsed document and its cached payload.
    ///
    /// The next [`load`](Self::load) fetches the resource again.
    pub fn invalidate(&self, cache: &SecretCache) {
        *self.parsed.lock() = Arc::new(OnceCell::new());
        cache.invalidate(&self.resource_id);
    }
}

impl<T> fmt::Debug for SecretDocument<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretDocument")
            .field("resource_id", &self.resource_id)
            .field("loaded", &self.parsed.lock().initialized())
            .finish()
    }
}
