//! The database context: settings, secrets and the pool registry.

use std::collections::HashMap;
use std::sync::Arc;

use pgwarden_secrets::{SecretCache, SecretDocument, SecretResolver};
use serde_json::Value;

use crate::codec::ParamCodec;
use crate::config::Settings;
use crate::connection::Connection;
use crate::diagnostics::DiagnosticLogger;
use crate::driver::Driver;
use crate::error::{ConfigError, Result};
use crate::managed::{ManagedPool, Shared};
use crate::postgres::PgDriver;
use crate::registry::PoolRegistry;
use crate::row::{QueryResult, Row};
use crate::shutdown::{self, DrainReport};

/// Connection profile set: database key to profile object.
pub type Profiles = HashMap<String, Value>;

/// Entry point owning every pool of the process.
///
/// The registry starts with two pools, neither configured: the default pool
/// (keyed by the default profile name) and the log pool that records
/// saturation snapshots for every other pool. Further pools are created on
/// first lookup by [`pool`](Self::pool).
pub struct Database<D: Driver = PgDriver> {
    shared: Arc<Shared<D>>,
    keymap: SecretDocument<Value>,
    registry: PoolRegistry<D>,
    diagnostics: Arc<DiagnosticLogger<D>>,
    default_pool: Arc<ManagedPool<D>>,
}

impl Database<PgDriver> {
    /// Create a context from the process environment using the PostgreSQL
    /// driver.
    pub fn from_env(resolver: Arc<dyn SecretResolver>) -> Result<Self> {
        Self::new(Settings::from_env()?, PgDriver, resolver)
    }
}

impl<D: Driver> Database<D> {
    /// Create a context. Nothing is fetched or connected until first use.
    pub fn new(settings: Settings, driver: D, resolver: Arc<dyn SecretResolver>) -> Result<Self> {
        Self::with_secret_cache(settings, driver, Arc::new(SecretCache::new(resolver)))
    }

    /// Create a context sharing an existing secret cache.
    pub fn with_secret_cache(
        settings: Settings,
        driver: D,
        secrets: Arc<SecretCache>,
    ) -> Result<Self> {
        settings.validate()?;

        let keymap = SecretDocument::new(settings.keymap_resource.clone());
        let shared = Arc::new(Shared {
            profiles: SecretDocument::new(settings.connections_resource.clone()),
            driver: Arc::new(driver),
            secrets,
            sanitization: Arc::new(settings.sanitization.clone()),
            settings,
        });
        let settings = &shared.settings;

        let registry = PoolRegistry::new();
        let log_pool = registry.get_or_insert_with(&settings.log_key, || {
            ManagedPool::new(
                &settings.log_key,
                &settings.default_profile,
                Arc::clone(&shared),
                None,
            )
        });
        let diagnostics = Arc::new(DiagnosticLogger::new(
            log_pool,
            settings.log_table.clone(),
            settings.diagnostic_timeout,
        ));
        let default_pool = registry.get_or_insert_with(&settings.default_profile, || {
            ManagedPool::new(
                &settings.default_profile,
                &settings.default_profile,
                Arc::clone(&shared),
                Some(Arc::clone(&diagnostics)),
            )
        });

        tracing::debug!(
            default_profile = %settings.default_profile,
            connections_resource = %settings.connections_resource,
            log_table = %settings.log_table,
            "database context created"
        );

        Ok(Self {
            shared,
            keymap,
            registry,
            diagnostics,
            default_pool,
        })
    }

    /// The settings this context was built with.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.shared.settings
    }

    /// The process secret cache.
    #[must_use]
    pub fn secrets(&self) -> &Arc<SecretCache> {
        &self.shared.secrets
    }

    /// The pool registry.
    #[must_use]
    pub fn registry(&self) -> &PoolRegistry<D> {
        &self.registry
    }

    /// The saturation snapshot writer.
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<DiagnosticLogger<D>> {
        &self.diagnostics
    }

    /// Pool for the profile `key`, created unconfigured on first lookup.
    pub fn pool(&self, key: &str) -> Arc<ManagedPool<D>> {
        self.registry.get_or_insert_with(key, || {
            ManagedPool::new(
                key,
                key,
                Arc::clone(&self.shared),
                Some(Arc::clone(&self.diagnostics)),
            )
        })
    }

    /// Pool for the default profile.
    #[must_use]
    pub fn default_pool(&self) -> &Arc<ManagedPool<D>> {
        &self.default_pool
    }

    /// Pool saturation snapshots are written through.
    #[must_use]
    pub fn log_pool(&self) -> &Arc<ManagedPool<D>> {
        self.diagnostics.pool()
    }

    /// Check out a connection from the default pool.
    pub async fn connect(&self) -> Result<Connection<D>> {
        self.default_pool.connect().await
    }

    /// Run statement text on the default pool.
    pub async fn query(&self, sql: &str) -> Result<QueryResult> {
        self.default_pool.query(sql).await
    }

    /// Run a statement on the default pool and return its rows.
    pub async fn query_rows(&self, sql: &str) -> Result<Vec<Row>> {
        self.default_pool.query_rows(sql).await
    }

    /// Run a statement on the default pool and return its first row.
    pub async fn query_first(&self, sql: &str) -> Result<Option<Row>> {
        self.default_pool.query_first(sql).await
    }

    /// The connection profile set, fetched once and cached.
    pub async fn connection_profiles(&self) -> Result<Arc<Profiles>> {
        let profiles = self
            .shared
            .profiles
            .load(&self.shared.secrets)
            .await
            .map_err(ConfigError::from)?;
        Ok(profiles)
    }

    /// Drop the cached profile set so the next load fetches it again.
    ///
    /// Pools that are already configured keep their options.
    pub fn refresh_connection_profiles(&self) {
        self.shared.profiles.invalidate(&self.shared.secrets);
    }

    /// The key map document, fetched once and cached.
    pub async fn keymap(&self) -> Result<Arc<Value>> {
        let keymap = self
            .keymap
            .load(&self.shared.secrets)
            .await
            .map_err(ConfigError::from)?;
        Ok(keymap)
    }

    /// Drop the cached key map so the next load fetches it again.
    pub fn refresh_keymap(&self) {
        self.keymap.invalidate(&self.shared.secrets);
    }

    /// Drain every registered pool, the log pool last.
    pub async fn shutdown(&self) -> DrainReport {
        let timeout = self.shared.settings.drain_timeout;
        let (log, primary): (Vec<_>, Vec<_>) = self
            .registry
            .pools()
            .into_iter()
            .partition(|pool| pool.is_log_pool());

        let mut report = shutdown::drain_all(&primary, timeout).await;
        report.merge(shutdown::drain_all(&log, timeout).await);

        tracing::info!(
            drained = report.drained.len(),
            failed = report.failed.len(),
            "database shut down"
        );
        report
    }
}

impl<D: Driver> ParamCodec for Database<D> {}

impl<D: Driver> std::fmt::Debug for Database<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("default_profile", &self.shared.settings.default_profile)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
