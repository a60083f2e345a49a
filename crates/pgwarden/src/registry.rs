//! Registry of named pools.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::driver::Driver;
use crate::managed::ManagedPool;

/// Map from registry key to pool.
///
/// Lookup and insertion happen under one lock, so a key never gets two
/// pools. Pools are never removed.
pub struct PoolRegistry<D: Driver> {
    pools: Mutex<HashMap<String, Arc<ManagedPool<D>>>>,
}

impl<D: Driver> PoolRegistry<D> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a pool.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<ManagedPool<D>>> {
        self.pools.lock().get(key).cloned()
    }

    /// Look up a pool, creating it with `create` if the key is new.
    ///
    /// `create` runs under the registry lock and must not block.
    pub fn get_or_insert_with<F>(&self, key: &str, create: F) -> Arc<ManagedPool<D>>
    where
        F: FnOnce() -> ManagedPool<D>,
    {
        let mut pools = self.pools.lock();
        if let Some(pool) = pools.get(key) {
            return Arc::clone(pool);
        }

        let pool = Arc::new(create());
        pools.insert(key.to_string(), Arc::clone(&pool));
        tracing::debug!(pool = key, total = pools.len(), "pool registered");
        pool
    }

    /// Check whether a pool is registered under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.pools.lock().contains_key(key)
    }

    /// Registered keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.pools.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Snapshot of every registered pool.
    #[must_use]
    pub fn pools(&self) -> Vec<Arc<ManagedPool<D>>> {
        self.pools.lock().values().cloned().collect()
    }

    /// Number of registered pools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.lock().len()
    }

    /// Check whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.lock().is_empty()
    }
}

impl<D: Driver> Default for PoolRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Driver> std::fmt::Debug for PoolRegistry<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}
