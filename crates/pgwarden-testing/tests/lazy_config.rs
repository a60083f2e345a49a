//! Lazy pool configuration against the in-memory driver.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use pgwarden::{ConfigError, Error, Settings};
use pgwarden_secrets::SecretError;
use pgwarden_testing::{MockDriver, MockSecretResolver, database};
use serde_json::{Value, json};

fn profiles() -> Value {
    json!({
        "development": {"host": "db.internal", "port": "6432", "database": "app", "max": 4},
        "reporting": {"host": "replica.internal", "database": "app"},
    })
}

// =============================================================================
// First Use
// =============================================================================

#[tokio::test]
async fn test_nothing_happens_before_first_use() {
    let driver = MockDriver::new();
    let secrets = MockSecretResolver::new().with_json("connections", &profiles());
    let db = database(&driver, &secrets, Settings::new()).unwrap();

    assert_eq!(secrets.total_fetches(), 0);
    assert_eq!(driver.connect_count(), 0);
    assert!(!db.default_pool().is_configured());
    assert!(!db.log_pool().is_configured());
    assert!(db.default_pool().status().is_none());

    assert_eq!(db.registry().keys(), vec!["development", "log"]);
    assert_eq!(db.log_pool().db_key(), "development");
    assert!(db.log_pool().is_log_pool());
    assert!(!db.default_pool().is_log_pool());
}

#[tokio::test]
async fn test_first_connect_merges_profile_over_base() {
    let driver = MockDriver::new();
    let secrets = MockSecretResolver::new().with_json("connections", &profiles());
    let settings = Settings::new()
        .base_options(pgwarden::PoolOptions::new().user("svc").host("ignored"));
    let db = database(&driver, &secrets, settings).unwrap();

    let row = db.query_first("SELECT 1").await.unwrap().unwrap();
    assert_eq!(row.get::<i32>(0).unwrap(), 1);

    let options = db.default_pool().options().unwrap();
    assert_eq!(options.host.as_deref(), Some("db.internal"));
    assert_eq!(options.port, Some(6432));
    assert_eq!(options.user.as_deref(), Some("svc"));
    assert_eq!(options.max, 4);
    assert_eq!(driver.last_options().unwrap().database.as_deref(), Some("app"));

    // The log pool is still untouched.
    assert!(!db.log_pool().is_configured());
}

#[tokio::test]
async fn test_concurrent_first_use_fetches_once() {
    let driver = MockDriver::new();
    let secrets = MockSecretResolver::new().with_json("connections", &profiles());
    secrets.set_delay(Duration::from_millis(20));
    let db = Arc::new(database(&driver, &secrets, Settings::new()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let db = Arc::clone(&db);
            tokio::spawn(async move {
                let key = if i % 2 == 0 { "development" } else { "reporting" };
                db.pool(key).query("SELECT 1").await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(secrets.fetch_count("connections"), 1);
    assert!(db.default_pool().is_configured());
    assert!(db.pool("reporting").is_configured());
    assert!(Arc::ptr_eq(&db.pool("reporting"), &db.pool("reporting")));
}

#[tokio::test]
async fn test_configure_is_idempotent() {
    let driver = MockDriver::new();
    let secrets = MockSecretResolver::new().with_json("connections", &profiles());
    let db = database(&driver, &secrets, Settings::new()).unwrap();

    db.default_pool().configure().await.unwrap();
    db.default_pool().configure().await.unwrap();
    assert_eq!(secrets.fetch_count("connections"), 1);
    // Configuring opens nothing.
    assert_eq!(driver.connect_count(), 0);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_missing_profile_leaves_pool_unconfigured() {
    let driver = MockDriver::new();
    let secrets = MockSecretResolver::new().with_json("connections", &profiles());
    let db = database(&driver, &secrets, Settings::new()).unwrap();

    let analytics = db.pool("analytics");
    let err = analytics.connect().await.unwrap_err();
    assert!(matches!(
        &err,
        Error::Config(ConfigError::MissingProfile(key)) if key == "analytics"
    ));
    assert!(!analytics.is_configured());
    assert_eq!(driver.connect_count(), 0);

    // Adding the profile is not enough while the old set is cached.
    let mut updated = profiles();
    updated["analytics"] = json!({"host": "olap.internal"});
    secrets.insert_json("connections", &updated);
    assert!(analytics.connect().await.is_err());

    db.refresh_connection_profiles();
    analytics.query("SELECT 1").await.unwrap();
    assert!(analytics.is_configured());
    assert_eq!(secrets.fetch_count("connections"), 2);
}

#[tokio::test]
async fn test_refresh_keeps_configured_pools() {
    let driver = MockDriver::new();
    let secrets = MockSecretResolver::new().with_json("connections", &profiles());
    let db = database(&driver, &secrets, Settings::new()).unwrap();

    db.query("SELECT 1").await.unwrap();
    secrets.insert_json("connections", &json!({"development": {"host": "moved.internal"}}));
    db.refresh_connection_profiles();

    let reloaded = db.connection_profiles().await.unwrap();
    assert_eq!(reloaded["development"]["host"], "moved.internal");
    assert_eq!(
        db.default_pool().options().unwrap().host.as_deref(),
        Some("db.internal")
    );
}

#[tokio::test]
async fn test_transport_failure_is_retried() {
    let driver = MockDriver::new();
    let secrets = MockSecretResolver::new().with_json("connections", &profiles());
    secrets.fail_next(1);
    let db = database(&driver, &secrets, Settings::new()).unwrap();

    let err = db.connect().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::Secret(SecretError::Transport { .. }))
    ));
    assert!(!db.default_pool().is_configured());

    db.query("SELECT 1").await.unwrap();
    assert_eq!(secrets.fetch_count("connections"), 2);
}

#[tokio::test]
async fn test_malformed_secret_is_fetched_again() {
    let driver = MockDriver::new();
    let secrets = MockSecretResolver::new();
    secrets.insert("connections", "{not json");
    let db = database(&driver, &secrets, Settings::new()).unwrap();

    let err = db.connect().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::Secret(SecretError::Malformed { .. }))
    ));
    assert!(!db.default_pool().is_configured());
    assert!(!db.secrets().is_cached("connections"));

    secrets.insert_json("connections", &json!({"development": {"max": 2}}));
    db.connect().await.unwrap();
    assert!(db.default_pool().is_configured());
    assert_eq!(db.default_pool().options().unwrap().max, 2);
    assert_eq!(secrets.fetch_count("connections"), 2);
}

#[tokio::test]
async fn test_missing_secret_resource() {
    let driver = MockDriver::new();
    let secrets = MockSecretResolver::new();
    let db = database(&driver, &secrets, Settings::new()).unwrap();

    let err = db.connect().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::Secret(SecretError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_invalid_profile_options() {
    let driver = MockDriver::new();
    let secrets = MockSecretResolver::new().with_json(
        "connections",
        &json!({"development": {"max": 0}, "reporting": "not an object"}),
    );
    let db = database(&driver, &secrets, Settings::new()).unwrap();

    assert!(matches!(
        db.connect().await.unwrap_err(),
        Error::Config(ConfigError::InvalidOptions(_))
    ));
    assert!(matches!(
        db.pool("reporting").connect().await.unwrap_err(),
        Error::Config(ConfigError::Malformed(_))
    ));
    assert!(!db.default_pool().is_configured());
}

#[tokio::test]
async fn test_connect_failure_keeps_configuration() {
    let driver = MockDriver::new();
    let secrets = MockSecretResolver::new().with_json("connections", &profiles());
    let db = database(&driver, &secrets, Settings::new()).unwrap();

    driver.fail_connects(true);
    let err = db.connect().await.unwrap_err();
    assert!(err.is_connection_error());
    assert!(db.default_pool().is_configured());

    driver.fail_connects(false);
    db.query("SELECT 1").await.unwrap();
    assert_eq!(secrets.fetch_count("connections"), 1);
}

// =============================================================================
// Key Map
// =============================================================================

#[tokio::test]
async fn test_keymap_is_cached_until_refreshed() {
    let driver = MockDriver::new();
    let secrets = MockSecretResolver::new()
        .with_json("connections", &profiles())
        .with_json("keymap", &json!({"billing": "k1"}));
    let db = database(&driver, &secrets, Settings::new()).unwrap();

    assert_eq!(db.keymap().await.unwrap()["billing"], "k1");
    assert_eq!(db.keymap().await.unwrap()["billing"], "k1");
    assert_eq!(secrets.fetch_count("keymap"), 1);

    secrets.insert_json("keymap", &json!({"billing": "k2"}));
    db.refresh_keymap();
    assert_eq!(db.keymap().await.unwrap()["billing"], "k2");
    assert_eq!(secrets.fetch_count("keymap"), 2);
    assert_eq!(secrets.fetch_count("connections"), 0);
}

#[tokio::test]
async fn test_custom_resource_ids() {
    let driver = MockDriver::new();
    let secrets = MockSecretResolver::new().with_json(
        "projects/app/secrets/db",
        &json!({"production": {"host": "prod.internal"}}),
    );
    let settings = Settings::new()
        .connections_resource("projects/app/secrets/db")
        .default_profile("production");
    let db = database(&driver, &secrets, settings).unwrap();

    db.query("SELECT 1").await.unwrap();
    assert_eq!(db.default_pool().key(), "production");
    assert_eq!(db.log_pool().db_key(), "production");
}
