//! # pgwarden-pool
//!
//! Bounded async connection pool.
//!
//! The pool is generic over a [`ConnectionLifecycle`], which knows how to
//! open, health-check and recognise a broken connection. Everything about
//! PostgreSQL lives in the `pgwarden` crate; this crate only manages slots.
//!
//! ## Features
//!
//! - Semaphore-bounded checkouts with an acquire timeout
//! - LIFO idle queue with idle-timeout and max-lifetime reaping
//! - Health checks on checkout for connections idle longer than an interval
//! - Broken connections are replaced, never recycled
//! - Live gauges (`total`, `idle`, `in use`, `waiting`) and counters
//! - `close()` drains: rejects new checkouts, waits for outstanding ones and
//!   closes idle connections
//!
//! ## Example
//!
//! ```rust,ignore
//! use pgwarden_pool::{Pool, PoolConfig};
//! use std::time::Duration;
//!
//! let pool = Pool::builder(lifecycle)
//!     .max_connections(20)
//!     .idle_timeout(Duration::from_secs(10))
//!     .build()?;
//!
//! let conn = pool.get().await?;
//! // Use connection...
//! // Connection automatically returned to pool on drop
//!
//! let status = pool.status();
//! println!("Pool utilization: {:.1}%", status.utilization());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod pool;

// Configuration
pub use config::PoolConfig;

// Error types
pub use error::PoolError;

// Pool types
pub use pool::{Pool, PoolBuilder, PoolMetrics, PoolStatus, PooledConnection};

// Lifecycle management
pub use lifecycle::{ConnectionLifecycle, ConnectionMetadata, HealthCheckResult};
