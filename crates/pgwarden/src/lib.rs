//! # pgwarden
//!
//! Lazily configured PostgreSQL connection pools.
//!
//! A [`Database`] owns a registry of named [`ManagedPool`]s. A pool is
//! created unconfigured; on its first `connect()` it loads the connection
//! profile set from a secret store (once per process, shared by every
//! pool), picks its own profile, and builds the physical pool. When a pool
//! is found at capacity, a snapshot of server activity is written to a log
//! table through a separate `"log"` pool, at most once a minute per pool.
//!
//! Checked-out [`Connection`]s, pools and the database context all expose
//! the [`ParamCodec`] methods, which turn loosely typed values into SQL
//! literals that cannot break out of their quoting.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pgwarden::{Database, ParamCodec};
//! use pgwarden_secrets::FileSecretResolver;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), pgwarden::Error> {
//!     let resolver = Arc::new(FileSecretResolver::new("/run/secrets"));
//!     let db = Arc::new(Database::from_env(resolver)?);
//!     pgwarden::install_shutdown_hook(Arc::clone(&db));
//!
//!     let mut conn = db.connect().await?;
//!     let rows = conn
//!         .query_rows(&format!(
//!             "SELECT * FROM users WHERE id = {}",
//!             conn.uuid("5f0c6f3e-4d1b-4c52-9a8e-0b6f3f1f2a77")?
//!         ))
//!         .await?;
//!
//!     for row in rows {
//!         let name: String = row.get_by_name("name")?;
//!         println!("User: {name}");
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod connection;
pub mod database;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod instrumentation;
pub mod managed;
pub mod postgres;
pub mod registry;
pub mod row;
pub mod shutdown;
pub mod transaction;

// Re-export commonly used types
pub use codec::ParamCodec;
pub use config::{PoolOptions, Settings};
pub use connection::{Connection, split_script};
pub use database::{Database, Profiles};
pub use diagnostics::{DiagnosticLogger, SaturationEvent, SaturationGate};
pub use driver::{Driver, Session, SessionLifecycle};
pub use error::{ConfigError, DiagnosticError, Error, Result};
pub use managed::ManagedPool;
pub use pgwarden_pool::{PoolMetrics, PoolStatus};
pub use pgwarden_types::{ParamValue, SqlLiteral, ValidationError};
pub use postgres::{PgDriver, PgSession};
pub use registry::PoolRegistry;
pub use row::{QueryResult, Row};
pub use shutdown::{DrainReport, drain_all, drain_on, install_shutdown_hook, wait_for_terminate};
pub use transaction::{IsolationLevel, Transaction};
