//! Live tests against a PostgreSQL container.
//!
//! Require Docker:
//!
//! ```bash
//! cargo test -p pgwarden-testing --test live -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use pgwarden::{Database, ParamCodec, PgDriver, Settings};
use pgwarden_testing::MockSecretResolver;
use pgwarden_testing::container::PostgresContainer;

async fn setup() -> (PostgresContainer, Database) {
    let container = PostgresContainer::start().await.expect("container should start");
    let secrets = MockSecretResolver::new().with_json("connections", &container.profiles("development"));
    let db = Database::new(Settings::new(), PgDriver, Arc::new(secrets)).unwrap();
    (container, db)
}

// =============================================================================
// Round Trips
// =============================================================================

#[tokio::test]
#[ignore = "Requires Docker"]
async fn test_live_select_and_literals() {
    let (_container, db) = setup().await;

    let sql = format!(
        "SELECT {} AS body, {}::uuid AS id, {} AS n",
        db.string("it's $$ quoted"),
        db.uuid("6f1c1a1e-2b7a-4c1d-9a43-0d8e4d1f6b11").unwrap(),
        db.numeric_literal(42).unwrap(),
    );
    let row = db.query_first(&sql).await.unwrap().unwrap();
    assert_eq!(row.get_by_name::<String>("body").unwrap(), "it's $$ quoted");
    assert_eq!(
        row.get_str(1),
        Some("6f1c1a1e-2b7a-4c1d-9a43-0d8e4d1f6b11")
    );
    assert_eq!(row.get::<i32>(2).unwrap(), 42);

    let options = db.default_pool().options().unwrap();
    assert_eq!(options.database.as_deref(), Some("postgres"));

    let report = db.shutdown().await;
    assert!(report.is_clean());
}

#[tokio::test]
#[ignore = "Requires Docker"]
async fn test_live_statement_timeout_setting() {
    let (_container, db) = setup().await;

    let row = db.query_first("SHOW statement_timeout").await.unwrap().unwrap();
    assert_eq!(row.get_str(0), Some("5min"));
}

#[tokio::test]
#[ignore = "Requires Docker"]
async fn test_live_transaction_and_snapshot_table() {
    let (_container, db) = setup().await;

    db.log_pool()
        .execute("CREATE TABLE db_pool_log (id uuid PRIMARY KEY, session_log jsonb NOT NULL)")
        .await
        .unwrap();

    let mut tx = db.connect().await.unwrap().begin().await.unwrap();
    tx.execute("CREATE TABLE notes (body text)").await.unwrap();
    tx.savepoint("sp1").await.unwrap();
    tx.execute("INSERT INTO notes VALUES ('a')").await.unwrap();
    tx.rollback_to_savepoint("sp1").await.unwrap();
    tx.commit().await.unwrap();

    let count = db.query_first("SELECT count(*) FROM notes").await.unwrap().unwrap();
    assert_eq!(count.get::<i64>(0).unwrap(), 0);

    let status = db.default_pool().status().unwrap();
    let event = db.diagnostics().record("development", status).await.unwrap();
    let stored = db
        .query_first(&format!(
            "SELECT session_log->>'pool' FROM db_pool_log WHERE id = {}",
            db.uuid(event.id).unwrap()
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get_str(0), Some("development"));
    assert!(!event.activity_rows.is_empty());
}
