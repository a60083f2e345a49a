//! # pgwarden-testing
//!
//! Test infrastructure for pgwarden.
//!
//! - [`MockDriver`]: an in-memory [`Driver`](pgwarden::Driver) that records
//!   every statement, answers scripted replies and counts open sessions.
//! - [`MockSecretResolver`]: a secret store with fetch counters and
//!   injectable transport failures.
//! - [`container`]: a throwaway PostgreSQL server for live tests.
//!
//! ## Example
//!
//! ```rust,ignore
//! let driver = MockDriver::new();
//! let secrets = MockSecretResolver::new()
//!     .with_json("connections", &json!({"development": {"max": 2}}));
//! let db = database(&driver, &secrets, Settings::new())?;
//!
//! db.query("SELECT 1").await?;
//! assert_eq!(secrets.fetch_count("connections"), 1);
//! assert_eq!(driver.connect_count(), 1);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod container;
pub mod driver;
pub mod secrets;

use std::sync::Arc;

use pgwarden::{Database, Settings};

pub use driver::{MockDriver, MockSession, rows};
pub use secrets::MockSecretResolver;

/// Build a database context over the in-memory driver and secret store.
pub fn database(
    driver: &MockDriver,
    secrets: &MockSecretResolver,
    settings: Settings,
) -> pgwarden::Result<Database<MockDriver>> {
    Database::new(settings, driver.clone(), Arc::new(secrets.clone()))
}
