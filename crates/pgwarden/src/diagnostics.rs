//! Saturation snapshots.
//!
//! When a primary pool is found at capacity, [`DiagnosticLogger`] reads the
//! server's session list through the dedicated log pool and writes it to
//! the log table. [`SaturationGate`] limits this to one attempt per window
//! per pool.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pgwarden_pool::PoolStatus;
use pgwarden_types::codec;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::driver::Driver;
use crate::error::DiagnosticError;
use crate::instrumentation;
use crate::managed::ManagedPool;

/// Server activity listing captured with every snapshot.
pub const ACTIVITY_QUERY: &str = "SELECT pid, state, client_addr, \
     age(clock_timestamp(), query_start) AS age, usename, datname, query \
     FROM pg_stat_activity ORDER BY query_start DESC";

/// One persisted saturation snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaturationEvent {
    /// Row id in the log table.
    pub id: Uuid,
    /// Registry key of the saturated pool.
    pub pool: String,
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// Open sessions of the saturated pool.
    pub total_count: u32,
    /// Idle sessions of the saturated pool.
    pub idle_count: u32,
    /// Callers queued on the saturated pool.
    pub waiting_count: u32,
    /// Configured maximum of the saturated pool.
    pub max: u32,
    /// `pg_stat_activity` rows.
    pub activity_rows: Vec<Map<String, Value>>,
}

/// Writes saturation snapshots through the log pool.
pub struct DiagnosticLogger<D: Driver> {
    pool: Arc<ManagedPool<D>>,
    table: String,
    timeout: Duration,
}

impl<D: Driver> DiagnosticLogger<D> {
    /// Create a logger writing to `table` through `pool`.
    ///
    /// `table` must already be a validated identifier.
    pub fn new(pool: Arc<ManagedPool<D>>, table: impl Into<String>, timeout: Duration) -> Self {
        Self {
            pool,
            table: table.into(),
            timeout,
        }
    }

    /// The log pool.
    #[must_use]
    pub fn pool(&self) -> &Arc<ManagedPool<D>> {
        &self.pool
    }

    /// The log table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Capture and persist a snapshot for the pool `source` in state
    /// `status`, within the diagnostic timeout.
    pub async fn record(
        &self,
        source: &str,
        status: PoolStatus,
    ) -> Result<SaturationEvent, DiagnosticError> {
        let capture = self
            .capture(source, status)
            .instrument(instrumentation::snapshot_span(source));

        match tokio::time::timeout(self.timeout, capture).await {
            Ok(outcome) => outcome,
            Err(_) => Err(DiagnosticError::Timeout(self.timeout)),
        }
    }

    async fn capture(
        &self,
        source: &str,
        status: PoolStatus,
    ) -> Result<SaturationEvent, DiagnosticError> {
        let mut conn = self.pool.connect().await?;
        let activity_rows = conn
            .query_rows(ACTIVITY_QUERY)
            .await?
            .iter()
            .map(|row| row.to_json())
            .collect();

        let event = SaturationEvent {
            id: codec::new_uuid(),
            pool: source.to_string(),
            timestamp: Utc::now(),
            total_count: status.total,
            idle_count: status.available,
            waiting_count: status.waiting,
            max: status.max,
            activity_rows,
        };

        let sql = format!(
            "INSERT INTO {} (id, session_log) VALUES ({}, {})",
            self.table,
            codec::uuid(event.id)?,
            codec::json_of(&event)?
        );
        conn.execute(&sql).await?;

        Ok(event)
    }
}

impl<D: Driver> std::fmt::Debug for DiagnosticLogger<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticLogger")
            .field("pool", &self.pool.key())
            .field("table", &self.table)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Rate limit for saturation snapshots of one pool.
///
/// The check and the update happen under one lock, so concurrent callers
/// inside a window produce a single attempt.
#[derive(Debug)]
pub struct SaturationGate {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl SaturationGate {
    /// Create a gate that opens at most once per `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Claim the current window. Returns `false` if an attempt was already
    /// made within `interval`.
    ///
    /// A successful claim counts whether or not the snapshot succeeds.
    pub fn try_claim(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock();
        match *last {
            Some(previous) if now.duration_since(previous) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// When the window was last claimed.
    #[must_use]
    pub fn last_claimed(&self) -> Option<Instant> {
        *self.last.lock()
    }

    /// The window length.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_gate_opens_once_per_window() {
        let gate = SaturationGate::new(Duration::from_secs(60));
        assert!(gate.last_claimed().is_none());

        assert!(gate.try_claim());
        let first = gate.last_claimed().unwrap();
        assert!(!gate.try_claim());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!gate.try_claim());
        assert_eq!(gate.last_claimed(), Some(first));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(gate.try_claim());
        assert!(gate.last_claimed().unwrap() > first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_serializes_concurrent_claims() {
        let gate = Arc::new(SaturationGate::new(Duration::from_secs(60)));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move { gate.try_claim() })
            })
            .collect();

        let mut claimed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                claimed += 1;
            }
        }
        assert_eq!(claimed, 1);
    }

    #[test]
    fn test_event_serializes_with_gauge_names() {
        let event = SaturationEvent {
            id: Uuid::nil(),
            pool: "development".into(),
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            total_count: 10,
            idle_count: 0,
            waiting_count: 3,
            max: 10,
            activity_rows: Vec::new(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["totalCount"], 10);
        assert_eq!(json["idleCount"], 0);
        assert_eq!(json["waitingCount"], 3);
        assert_eq!(json["activityRows"], serde_json::json!([]));
        assert_eq!(json["timestamp"], "1970-01-01T00:00:00Z");
    }
}
