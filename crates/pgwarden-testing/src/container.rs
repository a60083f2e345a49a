//! Throwaway PostgreSQL server for live tests.
//!
//! Requires a running Docker daemon. Tests using it are `#[ignore]`d by
//! default:
//!
//! ```bash
//! cargo test -p pgwarden-testing --test live -- --ignored
//! ```

use std::time::Duration;

use pgwarden::PoolOptions;
use serde_json::{Value, json};
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt, TestcontainersError};

const IMAGE: &str = "postgres";
const TAG: &str = "16-alpine";
const PASSWORD: &str = "pgwarden";

/// A running PostgreSQL container. Stopped on drop.
pub struct PostgresContainer {
    container: ContainerAsync<GenericImage>,
    host: String,
    port: u16,
}

impl PostgresContainer {
    /// Start a container and wait until it accepts connections.
    pub async fn start() -> Result<Self, TestcontainersError> {
        let container = GenericImage::new(IMAGE, TAG)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_startup_timeout(Duration::from_secs(120))
            .with_env_var("POSTGRES_PASSWORD", PASSWORD)
            .start()
            .await?;

        let host = container.get_host().await?.to_string();
        let port = container.get_host_port_ipv4(5432).await?;
        tracing::debug!(%host, port, "postgres container started");

        Ok(Self {
            container,
            host,
            port,
        })
    }

    /// Options reaching the container as the superuser.
    #[must_use]
    pub fn options(&self) -> PoolOptions {
        PoolOptions::new()
            .host(self.host.clone())
            .port(self.port)
            .user("postgres")
            .password(PASSWORD)
            .database("postgres")
    }

    /// A connection profile document with one entry named `key`.
    #[must_use]
    pub fn profiles(&self, key: &str) -> Value {
        json!({
            (key): {
                "host": self.host,
                "port": self.port,
                "user": "postgres",
                "password": PASSWORD,
                "database": "postgres",
            }
        })
    }

    /// The underlying container handle.
    #[must_use]
    pub fn container(&self) -> &ContainerAsync<GenericImage> {
        &self.container
    }
}

impl std::fmt::Debug for PostgresContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresContainer")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}
