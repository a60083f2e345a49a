//! Process settings and per-pool options.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use pgwarden_pool::PoolConfig;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::instrumentation::SanitizationConfig;
use crate::transaction::validate_qualified_name;

/// Profile used when `DB_ENV` is not set.
pub const DEFAULT_PROFILE: &str = "development";

/// Connection profile resource used when `DB_SECRET_MANAGER_RESOURCE_ID`
/// is not set.
pub const DEFAULT_CONNECTIONS_RESOURCE: &str = "connections";

/// Key map resource used when `KEYMAP_SECRET_MANAGER_RESOURCE_ID` is not set.
pub const DEFAULT_KEYMAP_RESOURCE: &str = "keymap";

/// Registry key of the diagnostic log pool.
pub const LOG_POOL_KEY: &str = "log";

/// Saturation log table used when `DB_POOL_LOG_TABLE` is not set.
pub const DEFAULT_LOG_TABLE: &str = "db_pool_log";

const ENV_PROFILE: &str = "DB_ENV";
const ENV_CONNECTIONS: &str = "DB_SECRET_MANAGER_RESOURCE_ID";
const ENV_KEYMAP: &str = "KEYMAP_SECRET_MANAGER_RESOURCE_ID";
const ENV_LOG_TABLE: &str = "DB_POOL_LOG_TABLE";

/// Process-level settings shared by every pool of a [`Database`](crate::Database).
#[derive(Debug, Clone)]
pub struct Settings {
    /// Profile name of the default pool.
    pub default_profile: String,
    /// Secret resource holding every connection profile.
    pub connections_resource: String,
    /// Secret resource holding the key map.
    pub keymap_resource: String,
    /// Registry key of the diagnostic log pool.
    pub log_key: String,
    /// Table the saturation snapshots are written to.
    pub log_table: String,
    /// Minimum time between two snapshots of the same pool.
    pub saturation_log_interval: Duration,
    /// Budget for capturing and writing one snapshot.
    pub diagnostic_timeout: Duration,
    /// Budget for draining one pool at shutdown. Zero waits forever.
    pub drain_timeout: Duration,
    /// Options every fetched profile is overlaid onto.
    pub base_options: PoolOptions,
    /// How statement text is rewritten before it is logged.
    pub sanitization: SanitizationConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_profile: DEFAULT_PROFILE.to_string(),
            connections_resource: DEFAULT_CONNECTIONS_RESOURCE.to_string(),
            keymap_resource: DEFAULT_KEYMAP_RESOURCE.to_string(),
            log_key: LOG_POOL_KEY.to_string(),
            log_table: DEFAULT_LOG_TABLE.to_string(),
            saturation_log_interval: Duration::from_secs(60),
            diagnostic_timeout: Duration::from_secs(10),
            drain_timeout: Duration::from_secs(30),
            base_options: PoolOptions::default(),
            sanitization: SanitizationConfig::default(),
        }
    }
}

impl Settings {
    /// Create settings with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mut settings = Self::default();
        if let Some(profile) = read(ENV_PROFILE) {
            settings.default_profile = profile;
        }
        if let Some(resource) = read(ENV_CONNECTIONS) {
            settings.connections_resource = resource;
        }
        if let Some(resource) = read(ENV_KEYMAP) {
            settings.keymap_resource = resource;
        }
        if let Some(table) = read(ENV_LOG_TABLE) {
            settings.log_table = table;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Set the default profile name.
    #[must_use]
    pub fn default_profile(mut self, profile: impl Into<String>) -> Self {
        self.default_profile = profile.into();
        self
    }

    /// Set the connection profile resource.
    #[must_use]
    pub fn connections_resource(mut self, resource: impl Into<String>) -> Self {
        self.connections_resource = resource.into();
        self
    }

    /// Set the key map resource.
    #[must_use]
    pub fn keymap_resource(mut self, resource: impl Into<String>) -> Self {
        self.keymap_resource = resource.into();
        self
    }

    /// Set the saturation log table.
    #[must_use]
    pub fn log_table(mut self, table: impl Into<String>) -> Self {
        self.log_table = table.into();
        self
    }

    /// Set the minimum time between two snapshots of one pool.
    #[must_use]
    pub fn saturation_log_interval(mut self, interval: Duration) -> Self {
        self.saturation_log_interval = interval;
        self
    }

    /// Set the snapshot budget.
    #[must_use]
    pub fn diagnostic_timeout(mut self, timeout: Duration) -> Self {
        self.diagnostic_timeout = timeout;
        self
    }

    /// Set the per-pool drain budget.
    #[must_use]
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Set the options profiles are overlaid onto.
    #[must_use]
    pub fn base_options(mut self, options: PoolOptions) -> Self {
        self.base_options = options;
        self
    }

    /// Set how statement text is sanitized in logs and spans.
    #[must_use]
    pub fn sanitization(mut self, config: SanitizationConfig) -> Self {
        self.sanitization = config;
        self
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_profile.is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: ENV_PROFILE,
                message: "profile name is empty".into(),
            });
        }
        if self.default_profile == self.log_key {
            return Err(ConfigError::InvalidSetting {
                name: ENV_PROFILE,
                message: format!("{:?} is reserved for the log pool", self.log_key),
            });
        }
        validate_qualified_name(&self.log_table).map_err(|e| ConfigError::InvalidSetting {
            name: ENV_LOG_TABLE,
            message: e.to_string(),
        })?;
        self.base_options.validate()
    }
}

/// Merged connection and pool options for one pool.
///
/// Field names match the keys stored in the connection profile secret.
/// Keys this type does not know are kept in [`extra`](Self::extra) and
/// otherwise ignored.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolOptions {
    /// Server host name or socket directory.
    #[serde(default)]
    pub host: Option<String>,

    /// Server port. Accepts a number or a numeric string.
    #[serde(default, deserialize_with = "port_from_any")]
    pub port: Option<u16>,

    /// Role to connect as.
    #[serde(default)]
    pub user: Option<String>,

    /// Role password.
    #[serde(default)]
    pub password: Option<String>,

    /// Database name.
    #[serde(default)]
    pub database: Option<String>,

    /// libpq-style connection string, applied before the discrete fields.
    #[serde(default, rename = "connectionString")]
    pub connection_string: Option<String>,

    /// `application_name` reported to the server.
    #[serde(default)]
    pub application_name: Option<String>,

    /// Maximum number of sessions.
    #[serde(default = "default_max")]
    pub max: u32,

    /// Sessions the idle reaper keeps open.
    #[serde(default)]
    pub min: u32,

    /// Checkout timeout in milliseconds. Zero waits forever.
    #[serde(default = "default_timeout_millis", rename = "connectionTimeoutMillis")]
    pub connection_timeout_millis: u64,

    /// Idle session lifetime in milliseconds. Zero never reaps.
    #[serde(default = "default_idle_millis", rename = "idleTimeoutMillis")]
    pub idle_timeout_millis: u64,

    /// Maximum session lifetime in seconds. Zero is unlimited.
    #[serde(default, rename = "maxLifetimeSeconds")]
    pub max_lifetime_seconds: u64,

    /// Server-side `statement_timeout` in milliseconds. `false` or `null`
    /// disables it, as for the other timeouts below.
    #[serde(default = "default_server_timeout", deserialize_with = "timeout_or_false")]
    pub statement_timeout: Option<u64>,

    /// Server-side `lock_timeout` in milliseconds.
    #[serde(default = "default_server_timeout", deserialize_with = "timeout_or_false")]
    pub lock_timeout: Option<u64>,

    /// Server-side `idle_in_transaction_session_timeout` in milliseconds.
    #[serde(default = "default_server_timeout", deserialize_with = "timeout_or_false")]
    pub idle_in_transaction_session_timeout: Option<u64>,

    /// Client-side per-statement timeout in milliseconds.
    #[serde(default = "default_server_timeout", deserialize_with = "timeout_or_false")]
    pub query_timeout: Option<u64>,

    /// Unrecognized keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_max() -> u32 {
    10
}

fn default_timeout_millis() -> u64 {
    300_000
}

fn default_idle_millis() -> u64 {
    10_000
}

fn default_server_timeout() -> Option<u64> {
    Some(300_000)
}

fn port_from_any<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Option::<Port>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Port::Number(port)) => Ok(Some(port)),
        Some(Port::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid port {text:?}"))),
    }
}

/// `false` reads as no timeout.
fn timeout_or_false<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Timeout {
        Millis(u64),
        Flag(bool),
    }

    match Option::<Timeout>::deserialize(deserializer)? {
        None | Some(Timeout::Flag(false)) => Ok(None),
        Some(Timeout::Millis(millis)) => Ok(Some(millis)),
        Some(Timeout::Flag(true)) => Err(serde::de::Error::custom(
            "timeout must be a number of milliseconds or false",
        )),
    }
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            connection_string: None,
            application_name: None,
            max: default_max(),
            min: 0,
            connection_timeout_millis: default_timeout_millis(),
            idle_timeout_millis: default_idle_millis(),
            max_lifetime_seconds: 0,
            statement_timeout: default_server_timeout(),
            lock_timeout: default_server_timeout(),
            idle_in_transaction_session_timeout: default_server_timeout(),
            query_timeout: default_server_timeout(),
            extra: Map::new(),
        }
    }
}

impl PoolOptions {
    /// Create options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the user.
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the database name.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the maximum number of sessions.
    #[must_use]
    pub fn max(mut self, max: u32) -> Self {
        self.max = max;
        self
    }

    /// Set the checkout timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout_millis = millis(timeout);
        self
    }

    /// Set the client-side query timeout. `None` disables it.
    #[must_use]
    pub fn query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout.map(millis);
        self
    }

    /// Overlay a fetched profile onto these options.
    ///
    /// Every key present in `profile` replaces the base value, including
    /// explicit `null`s.
    pub fn merged_with(&self, profile: &Value) -> Result<Self, ConfigError> {
        let Value::Object(overlay) = profile else {
            return Err(ConfigError::Malformed(format!(
                "expected an object, found {}",
                kind_of(profile)
            )));
        };

        let mut merged = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(ConfigError::Malformed(format!(
                    "base options serialized to {}",
                    kind_of(&other)
                )));
            }
            Err(e) => return Err(ConfigError::Malformed(e.to_string())),
        };
        for (key, value) in overlay {
            merged.insert(key.clone(), value.clone());
        }

        serde_json::from_value(Value::Object(merged))
            .map_err(|e| ConfigError::Malformed(e.to_string()))
    }

    /// Check that the options describe a usable pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max == 0 {
            return Err(ConfigError::InvalidOptions("max must be at least 1".into()));
        }
        if self.min > self.max {
            return Err(ConfigError::InvalidOptions(format!(
                "min ({}) exceeds max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }

    /// Physical pool configuration derived from these options.
    #[must_use]
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new()
            .min_connections(self.min)
            .max_connections(self.max)
            .connection_timeout(Duration::from_millis(self.connection_timeout_millis))
            .idle_timeout(Duration::from_millis(self.idle_timeout_millis))
            .max_lifetime(Duration::from_secs(self.max_lifetime_seconds))
    }

    /// Client-side statement budget. `None` (or zero) disables it.
    #[must_use]
    pub fn statement_budget(&self) -> Option<Duration> {
        self.query_timeout
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }

    /// Server settings sent as startup options, in a stable order.
    #[must_use]
    pub fn server_settings(&self) -> Vec<(&'static str, u64)> {
        [
            ("statement_timeout", self.statement_timeout),
            ("lock_timeout", self.lock_timeout),
            (
                "idle_in_transaction_session_timeout",
                self.idle_in_transaction_session_timeout,
            ),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }

    /// Build the driver configuration.
    pub fn pg_config(&self) -> Result<tokio_postgres::Config, ConfigError> {
        let mut config = match &self.connection_string {
            Some(text) => tokio_postgres::Config::from_str(text)
                .map_err(|e| ConfigError::InvalidOptions(format!("connectionString: {e}")))?,
            None => tokio_postgres::Config::new(),
        };

        if let Some(host) = &self.host {
            config.host(host);
        }
        if let Some(port) = self.port {
            config.port(port);
        }
        if let Some(user) = &self.user {
            config.user(user);
        }
        if let Some(password) = &self.password {
            config.password(password);
        }
        if let Some(database) = &self.database {
            config.dbname(database);
        }
        if let Some(name) = &self.application_name {
            config.application_name(name);
        }

        let settings = self
            .server_settings()
            .into_iter()
            .map(|(name, value)| format!("-c {name}={value}"));
        // Appended to any `options` the connection string carries.
        let options = config
            .get_options()
            .filter(|existing| !existing.trim().is_empty())
            .map(str::to_string)
            .into_iter()
            .chain(settings)
            .collect::<Vec<_>>()
            .join(" ");
        if !options.is_empty() {
            config.options(&options);
        }

        Ok(config)
    }
}

impl fmt::Debug for PoolOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("database", &self.database)
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "[REDACTED]"),
            )
            .field("max", &self.max)
            .field("min", &self.min)
            .field("connection_timeout_millis", &self.connection_timeout_millis)
            .field("idle_timeout_millis", &self.idle_timeout_millis)
            .field("query_timeout", &self.query_timeout)
            .finish_non_exhaustive()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.default_profile, "development");
        assert_eq!(settings.log_key, "log");
        assert_eq!(settings.log_table, "db_pool_log");
        assert_eq!(settings.saturation_log_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_settings_from_environment() {
        let settings = Settings::from_lookup(lookup(&[
            ("DB_ENV", "production"),
            ("DB_SECRET_MANAGER_RESOURCE_ID", "projects/acme/secrets/db"),
            ("KEYMAP_SECRET_MANAGER_RESOURCE_ID", ""),
            ("DB_POOL_LOG_TABLE", "ops.pool_log"),
        ]))
        .unwrap();

        assert_eq!(settings.default_profile, "production");
        assert_eq!(settings.connections_resource, "projects/acme/secrets/db");
        assert_eq!(settings.keymap_resource, DEFAULT_KEYMAP_RESOURCE);
        assert_eq!(settings.log_table, "ops.pool_log");
    }

    #[test]
    fn test_settings_reject_bad_log_table() {
        let err = Settings::from_lookup(lookup(&[("DB_POOL_LOG_TABLE", "log; DROP TABLE x")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidSetting { name: "DB_POOL_LOG_TABLE", .. }
        ));
    }

    #[test]
    fn test_settings_reject_log_key_as_default() {
        let err = Settings::from_lookup(lookup(&[("DB_ENV", "log")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { name: "DB_ENV", .. }));
    }

    #[test]
    fn test_profile_overlay() {
        let base = PoolOptions::default();
        let merged = base
            .merged_with(&json!({
                "host": "db.internal",
                "port": "6432",
                "user": "app",
                "password": "hunter2",
                "database": "orders",
                "max": 4,
                "query_timeout": null,
                "ssl": {"rejectUnauthorized": false}
            }))
            .unwrap();

        assert_eq!(merged.host.as_deref(), Some("db.internal"));
        assert_eq!(merged.port, Some(6432));
        assert_eq!(merged.max, 4);
        assert_eq!(merged.query_timeout, None);
        assert_eq!(merged.statement_timeout, Some(300_000));
        assert_eq!(merged.connection_timeout_millis, 300_000);
        assert!(merged.extra.contains_key("ssl"));
    }

    #[test]
    fn test_overlay_rejects_non_objects() {
        let err = PoolOptions::default().merged_with(&json!("postgres://x")).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));

        let err = PoolOptions::default()
            .merged_with(&json!({"max": "lots"}))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn test_options_validation() {
        assert!(PoolOptions::default().validate().is_ok());
        assert!(PoolOptions::default().max(0).validate().is_err());

        let mut options = PoolOptions::default().max(2);
        options.min = 3;
        assert!(matches!(
            options.validate(),
            Err(ConfigError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_pool_config_conversion() {
        let mut options = PoolOptions::default().max(7);
        options.connection_timeout_millis = 0;
        options.max_lifetime_seconds = 90;

        let config = options.pool_config();
        assert_eq!(config.max_connections, 7);
        assert_eq!(config.connection_timeout, Duration::ZERO);
        assert_eq!(config.idle_timeout, Duration::from_secs(10));
        assert_eq!(config.max_lifetime, Duration::from_secs(90));
    }

    #[test]
    fn test_statement_budget() {
        assert_eq!(
            PoolOptions::default().statement_budget(),
            Some(Duration::from_secs(300))
        );
        assert_eq!(PoolOptions::default().query_timeout(None).statement_budget(), None);

        let mut zero = PoolOptions::default();
        zero.query_timeout = Some(0);
        assert_eq!(zero.statement_budget(), None);
    }

    #[test]
    fn test_server_settings_skip_disabled() {
        let mut options = PoolOptions::default();
        options.lock_timeout = None;
        assert_eq!(
            options.server_settings(),
            vec![
                ("statement_timeout", 300_000),
                ("idle_in_transaction_session_timeout", 300_000),
            ]
        );
    }

    #[test]
    fn test_pg_config_fields() {
        let options = PoolOptions::default()
            .host("db.internal")
            .port(6432)
            .user("app")
            .password("hunter2")
            .database("orders");
        let config = options.pg_config().unwrap();

        assert_eq!(config.get_user(), Some("app"));
        assert_eq!(config.get_dbname(), Some("orders"));
        assert_eq!(config.get_ports(), &[6432]);
        assert_eq!(
            config.get_options(),
            Some(
                "-c statement_timeout=300000 -c lock_timeout=300000 \
                 -c idle_in_transaction_session_timeout=300000"
            )
        );
    }

    #[test]
    fn test_pg_config_connection_string_is_overridden() {
        let mut options = PoolOptions::default().database("override");
        options.connection_string = Some("host=localhost user=base dbname=base".into());
        let config = options.pg_config().unwrap();
        assert_eq!(config.get_user(), Some("base"));
        assert_eq!(config.get_dbname(), Some("override"));

        options.connection_string = Some("host=localhost port=notaport".into());
        assert!(matches!(
            options.pg_config(),
            Err(ConfigError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_pg_config_keeps_connection_string_options() {
        let mut options = PoolOptions::default();
        options.lock_timeout = None;
        options.idle_in_transaction_session_timeout = None;
        options.connection_string =
            Some("host=localhost options='-c search_path=app'".into());

        let config = options.pg_config().unwrap();
        assert_eq!(
            config.get_options(),
            Some("-c search_path=app -c statement_timeout=300000")
        );
    }

    #[test]
    fn test_false_disables_timeouts() {
        let options = PoolOptions::default()
            .merged_with(&json!({
                "statement_timeout": false,
                "lock_timeout": 2000,
                "idle_in_transaction_session_timeout": null,
                "query_timeout": false,
            }))
            .unwrap();
        assert_eq!(options.statement_timeout, None);
        assert_eq!(options.lock_timeout, Some(2000));
        assert_eq!(options.idle_in_transaction_session_timeout, None);
        assert_eq!(options.query_timeout, None);
        assert_eq!(options.server_settings(), vec![("lock_timeout", 2000)]);

        assert!(matches!(
            PoolOptions::default().merged_with(&json!({"statement_timeout": true})),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut options = PoolOptions::default().password("hunter2");
        options.connection_string = Some("postgres://app:hunter2@db/orders".into());
        let debug = format!("{options:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
