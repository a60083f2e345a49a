//! [`Driver`] over `tokio-postgres`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_postgres::{NoTls, SimpleQueryMessage};

use crate::config::PoolOptions;
use crate::driver::{Driver, Session};
use crate::error::{Error, Result};
use crate::row::{QueryResult, Row};

/// Plain-TCP PostgreSQL driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgDriver;

impl PgDriver {
    /// Create the driver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Driver for PgDriver {
    type Session = PgSession;

    async fn connect(&self, options: &PoolOptions) -> Result<PgSession> {
        let config = options.pg_config()?;

        tracing::debug!(
            host = ?options.host,
            port = ?options.port,
            database = ?options.database,
            "connecting to PostgreSQL"
        );

        let (client, connection) = config.connect(NoTls).await.map_err(|e| Error::from_pg(&e))?;

        // The connection object drives the socket; it finishes when the
        // client is dropped or the server goes away.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "PostgreSQL connection error");
            }
        });

        Ok(PgSession { client })
    }
}

/// A `tokio-postgres` client.
pub struct PgSession {
    client: tokio_postgres::Client,
}

impl PgSession {
    /// The underlying client, for bound parameters and prepared statements.
    pub fn client(&self) -> &tokio_postgres::Client {
        &self.client
    }
}

impl std::fmt::Debug for PgSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgSession")
            .field("closed", &self.client.is_closed())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Session for PgSession {
    async fn simple_query(&mut self, sql: &str) -> Result<QueryResult> {
        let messages = self
            .client
            .simple_query(sql)
            .await
            .map_err(|e| Error::from_pg(&e))?;

        let mut result = QueryResult::default();
        let mut columns: Option<Arc<[String]>> = None;

        for message in messages {
            match message {
                SimpleQueryMessage::Row(row) => {
                    let names = row.columns();
                    let reuse = columns.as_ref().is_some_and(|known| {
                        known.len() == names.len()
                            && known.iter().zip(names).all(|(a, b)| a == b.name())
                    });
                    if !reuse {
                        columns = Some(names.iter().map(|c| c.name().to_string()).collect());
                    }
                    let values = (0..row.len())
                        .map(|i| row.get(i).map(str::to_string))
                        .collect();
                    let shared = columns.clone().unwrap_or_else(|| Arc::from(Vec::new()));
                    result.rows.push(Row::new(shared, values));
                }
                SimpleQueryMessage::CommandComplete(count) => {
                    result.rows_affected += count;
                }
                _ => {}
            }
        }

        Ok(result)
    }

    fn is_closed(&self) -> bool {
        self.client.is_closed()
    }
}
