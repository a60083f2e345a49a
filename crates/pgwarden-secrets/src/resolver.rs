//! The secret transport seam and bundled resolvers.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::SecretError;

/// An asynchronous key-value fetch by resource identifier.
///
/// Implementations talk to a secret manager (or a test double). They are
/// not expected to cache; [`SecretCache`](crate::SecretCache) does that.
#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// Fetch the raw payload stored under `resource_id`.
    async fn fetch(&self, resource_id: &str) -> Result<Vec<u8>, SecretError>;

    /// Name used in log output.
    fn name(&self) -> &str {
        "secret-resolver"
    }
}

/// Resolver backed by an in-memory map.
///
/// Entries can be replaced at runtime with [`insert`](Self::insert).
#[derive(Default)]
pub struct StaticSecretResolver {
    secrets: RwLock<HashMap<String, Vec<u8>>>,
}

impl StaticSecretResolver {
    /// Create an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret.
    #[must_use]
    pub fn with_secret(self, resource_id: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        self.insert(resource_id, payload);
        self
    }

    /// Add or replace a secret.
    pub fn insert(&self, resource_id: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.secrets.write().insert(resource_id.into(), payload.into());
    }

    /// Remove a secret.
    pub fn remove(&self, resource_id: &str) {
        self.secrets.write().remove(resource_id);
    }
}

impl std::fmt::Debug for StaticSecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticSecretResolver")
            .field("resources", &self.secrets.read().len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SecretResolver for StaticSecretResolver {
    async fn fetch(&self, resource_id: &str) -> Result<Vec<u8>, SecretError> {
        self.secrets
            .read()
            .get(resource_id)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(resource_id.to_string()))
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Resolver reading each resource from a file under a root directory.
///
/// The resource identifier is used as a relative path. Absolute paths and
/// `..` components are rejected as not found.
#[derive(Debug, Clone)]
pub struct FileSecretResolver {
    root: PathBuf,
}

impl FileSecretResolver {
    /// Create a resolver rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, resource_id: &str) -> Option<PathBuf> {
        let relative = Path::new(resource_id);
        let contained = !resource_id.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        contained.then(|| self.root.join(relative))
    }
}

#[async_trait]
impl SecretResolver for FileSecretResolver {
    async fn fetch(&self, resource_id: &str) -> Result<Vec<u8>, SecretError> {
        let path = self
            .path_for(resource_id)
            .ok_or_else(|| SecretError::NotFound(resource_id.to_string()))?;

        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SecretError::NotFound(resource_id.to_string()),
            _ => SecretError::transport(resource_id, e),
        })
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Resolver reading each resource from an environment variable.
///
/// The variable name is the prefix followed by the resource identifier in
/// upper case, with every character outside `[A-Za-z0-9]` replaced by `_`.
/// `projects/app/secrets/db` with prefix `SECRET_` reads
/// `SECRET_PROJECTS_APP_SECRETS_DB`.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretResolver {
    prefix: String,
}

impl EnvSecretResolver {
    /// Create a resolver with the given variable prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The variable consulted for `resource_id`.
    #[must_use]
    pub fn variable_for(&self, resource_id: &str) -> String {
        let mut name = self.prefix.clone();
        name.extend(resource_id.chars().map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        }));
        name
    }
}

#[async_trait]
impl SecretResolver for EnvSecretResolver {
    async fn fetch(&self, resource_id: &str) -> Result<Vec<u8>, SecretError> {
        match std::env::var(self.variable_for(resource_id)) {
            Ok(value) => Ok(value.into_bytes()),
            Err(std::env::VarError::NotPresent) => {
                Err(SecretError::NotFound(resource_id.to_string()))
            }
            Err(std::env::VarError::NotUnicode(_)) => {
                Err(SecretError::Encoding(resource_id.to_string()))
            }
        }
    }

    fn name(&self) -> &str {
        "env"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_resolver_fetch_and_replace() {
        let resolver = StaticSecretResolver::new().with_secret("db", "one");
        assert_eq!(resolver.fetch("db").await.unwrap(), b"one");

        resolver.insert("db", "two");
        assert_eq!(resolver.fetch("db").await.unwrap(), b"two");

        resolver.remove("db");
        assert_eq!(
            resolver.fetch("db").await,
            Err(SecretError::NotFound("db".into()))
        );
    }

    #[tokio::test]
    async fn test_file_resolver_reads_relative_paths_only() {
        let root = std::env::temp_dir().join(format!("pgwarden-secrets-{}", std::process::id()));
        tokio::fs::create_dir_all(root.join("nested")).await.unwrap();
        tokio::fs::write(root.join("nested/db.json"), b"{}").await.unwrap();

        let resolver = FileSecretResolver::new(&root);
        assert_eq!(resolver.fetch("nested/db.json").await.unwrap(), b"{}");
        assert!(matches!(
            resolver.fetch("missing.json").await,
            Err(SecretError::NotFound(_))
        ));
        assert!(matches!(
            resolver.fetch("../etc/passwd").await,
            Err(SecretError::NotFound(_))
        ));
        assert!(matches!(
            resolver.fetch("/etc/passwd").await,
            Err(SecretError::NotFound(_))
        ));

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[test]
    fn test_env_variable_name_mapping() {
        let resolver = EnvSecretResolver::new("SECRET_");
        assert_eq!(
            resolver.variable_for("projects/app/secrets/db"),
            "SECRET_PROJECTS_APP_SECRETS_DB"
        );
        assert_eq!(resolver.variable_for("a-b.c"), "SECRET_A_B_C");
    }

    #[tokio::test]
    async fn test_env_resolver_missing_variable() {
        let resolver = EnvSecretResolver::new("PGWARDEN_TEST_UNSET_");
        assert!(matches!(
            resolver.fetch("nope").await,
            Err(SecretError::NotFound(_))
        ));
    }
}
