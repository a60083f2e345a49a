//! Graceful shutdown: drain every pool when the process is told to stop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tracing::info;

use crate::database::Database;
use crate::driver::Driver;
use crate::error::Error;
use crate::managed::ManagedPool;

/// Outcome of draining a set of pools.
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Keys of pools that drained within budget.
    pub drained: Vec<String>,
    /// Keys of pools that did not, with the reason.
    pub failed: Vec<(String, Error)>,
}

impl DrainReport {
    /// Check whether every pool drained.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Append another report.
    pub fn merge(&mut self, other: DrainReport) {
        self.drained.extend(other.drained);
        self.failed.extend(other.failed);
    }
}

/// Drain `pools` concurrently, each within `timeout` (zero waits forever).
///
/// A pool that fails to drain is recorded and does not stop the others.
pub async fn drain_all<D: Driver>(pools: &[Arc<ManagedPool<D>>], timeout: Duration) -> DrainReport {
    let outcomes = join_all(pools.iter().map(|pool| async move {
        (pool.key().to_string(), pool.drain_within(timeout).await)
    }))
    .await;

    let mut report = DrainReport::default();
    for (key, outcome) in outcomes {
        match outcome {
            Ok(()) => report.drained.push(key),
            Err(e) => {
                tracing::error!(pool = %key, error = %e, "pool failed to drain");
                report.failed.push((key, e));
            }
        }
    }
    report
}

/// Wait for SIGTERM.
#[cfg(unix)]
pub async fn wait_for_terminate() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    sigterm.recv().await;
    info!(signal = "SIGTERM", "signal received");
    Ok(())
}

/// Wait for SIGTERM. Never completes on platforms without it.
#[cfg(not(unix))]
pub async fn wait_for_terminate() -> std::io::Result<()> {
    std::future::pending().await
}

/// Wait for `signal`, then drain every pool of `db`.
pub async fn drain_on<D, F>(db: &Database<D>, signal: F) -> DrainReport
where
    D: Driver,
    F: Future<Output = ()>,
{
    signal.await;
    info!("shutting down database pools");
    db.shutdown().await
}

/// Spawn a task that drains every pool of `db` on SIGTERM and then exits
/// the process with status 0.
///
/// Must be called from inside a Tokio runtime.
pub fn install_shutdown_hook<D: Driver>(db: Arc<Database<D>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = wait_for_terminate().await {
            tracing::error!(error = %e, "failed to install SIGTERM handler");
            return;
        }

        let report = db.shutdown().await;
        if !report.is_clean() {
            tracing::warn!(
                failed = ?report.failed.iter().map(|(key, _)| key.as_str()).collect::<Vec<_>>(),
                "some pools did not drain"
            );
        }
        std::process::exit(0);
    })
}
