//! # pgwarden-secrets
//!
//! Secret resolution for pgwarden.
//!
//! The transport that actually talks to a secret manager is an external
//! collaborator, modelled as the [`SecretResolver`] trait: an async fetch of
//! raw bytes by resource identifier. On top of it this crate provides:
//!
//! - [`SecretCache`]: a write-once cache per resource identifier. Concurrent
//!   first fetches of the same resource collapse into one request, and a
//!   failed fetch is not cached.
//! - [`SecretDocument`]: a JSON-parsed, cached view of one resource, such as
//!   the connection-profile set.
//! - Bundled resolvers for in-memory, file-backed and environment-backed
//!   secrets.
//!
//! ## Example
//!
//! ```rust
//! # tokio_test::block_on(async {
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use pgwarden_secrets::{SecretCache, SecretDocument, StaticSecretResolver};
//!
//! let resolver = StaticSecretResolver::new()
//!     .with_secret("profiles", r#"{"development": {"host": "localhost"}}"#);
//! let cache = SecretCache::new(Arc::new(resolver));
//!
//! let profiles: SecretDocument<HashMap<String, serde_json::Value>> =
//!     SecretDocument::new("profiles");
//! let loaded = profiles.load(&cache).await.unwrap();
//! assert!(loaded.contains_key("development"));
//! # });
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cache;
pub mod document;
pub mod error;
pub mod resolver;

pub use cache::{Secret, SecretCache};
pub use document::SecretDocument;
pub use error::SecretError;
pub use resolver::{EnvSecretResolver, FileSecretResolver, SecretResolver, StaticSecretResolver};
