//! Scripted secret store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pgwarden_secrets::{SecretError, SecretResolver};
use serde_json::Value;

#[derive(Default)]
struct State {
    payloads: HashMap<String, Vec<u8>>,
    fetches: HashMap<String, usize>,
    pending_failures: usize,
    delay: Duration,
}

/// [`SecretResolver`] with fetch counters and injectable failures. Clones
/// share state.
#[derive(Clone, Default)]
pub struct MockSecretResolver {
    state: Arc<Mutex<State>>,
}

impl MockSecretResolver {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` as JSON under `resource_id`.
    #[must_use]
    pub fn with_json(self, resource_id: impl Into<String>, value: &Value) -> Self {
        self.insert_json(resource_id, value);
        self
    }

    /// Store or replace `value` as JSON under `resource_id`.
    pub fn insert_json(&self, resource_id: impl Into<String>, value: &Value) {
        self.insert(resource_id, value.to_string());
    }

    /// Store or replace a raw payload.
    pub fn insert(&self, resource_id: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.state
            .lock()
            .payloads
            .insert(resource_id.into(), payload.into());
    }

    /// Remove a resource.
    pub fn remove(&self, resource_id: &str) {
        self.state.lock().payloads.remove(resource_id);
    }

    /// Fail the next `count` fetches with a transport error.
    pub fn fail_next(&self, count: usize) {
        self.state.lock().pending_failures = count;
    }

    /// Delay every fetch.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = delay;
    }

    /// Fetch attempts for `resource_id`, failed ones included.
    #[must_use]
    pub fn fetch_count(&self, resource_id: &str) -> usize {
        self.state
            .lock()
            .fetches
            .get(resource_id)
            .copied()
            .unwrap_or(0)
    }

    /// Fetch attempts across all resources.
    #[must_use]
    pub fn total_fetches(&self) -> usize {
        self.state.lock().fetches.values().sum()
    }
}

impl std::fmt::Debug for MockSecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockSecretResolver")
            .field("resources", &state.payloads.len())
            .field("fetches", &state.fetches)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SecretResolver for MockSecretResolver {
    async fn fetch(&self, resource_id: &str) -> Result<Vec<u8>, SecretError> {
        let delay = {
            let mut state = self.state.lock();
            *state.fetches.entry(resource_id.to_string()).or_default() += 1;
            state.delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            return Err(SecretError::transport(resource_id, "service unavailable"));
        }
        state
            .payloads
            .get(resource_id)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(resource_id.to_string()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
