//! User-facing storage facades.
//!
//! Provides ergonomic APIs for storage operations:
//! - `StorageWriter`: Sample inserts via the writer actor's channel
//! - `MetricReader`: Query samples by source and time range
//! - `StorageAdmin`: Checkpoint and shutdown

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::SyncSender;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use strum_macros::{AsRefStr, Display, EnumString};
use tokio::sync::oneshot;

use crate::storage::StorageError;
use crate::storage::actor::Command;
use crate::storage::pool::ReadPool;
use crate::storage::types::MetricSample;

// =============================================================================
// Constants
// =============================================================================

/// Rows returned when a query sets no limit.
pub const DEFAULT_LIMIT: u32 = 100;
/// Upper bound on rows returned by one query.
pub const MAX_LIMIT: u32 = 10_000;

// =============================================================================
// Query Types
// =============================================================================

/// Sort order for queries (by timestamp).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, EnumString, AsRefStr, Display,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Query for metric samples.
#[derive(Debug, Clone, Default)]
pub struct SampleQuery {
    /// Only samples from this producer label.
    pub source: Option<String>,
    /// Inclusive lower time bound.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper time bound.
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub order: Option<SortOrder>,
}

impl SampleQuery {
    /// Latest `limit` samples of `source`, newest first.
    pub fn latest(source: impl Into<String>, limit: u32) -> Self {
        Self {
            source: Some(source.into()),
            limit: Some(limit),
            order: Some(SortOrder::Desc),
            ..Default::default()
        }
    }
}

// =============================================================================
// Writer
// =============================================================================

/// Storage writer.
///
/// Uses `try_send`: a sample is dropped (and counted) if the channel is full.
/// Accepted samples are inserted immediately and acknowledged with their id.
#[derive(Clone)]
pub struct StorageWriter {
    tx: SyncSender<Command>,
    dropped_samples: Arc<AtomicU64>,
}

impl std::fmt::Debug for StorageWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageWriter").finish_non_exhaustive()
    }
}

impl StorageWriter {
    pub(crate) fn new(tx: SyncSender<Command>) -> Self {
        Self {
            tx,
            dropped_samples: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get total count of samples dropped due to channel capacity.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples.load(Ordering::Relaxed)
    }

    /// Insert a sample and wait for the store to assign its id.
    pub async fn insert_sample(&self, sample: MetricSample) -> Result<i64, StorageError> {
        let (ack, rx) = oneshot::channel();
        if self
            .tx
            .try_send(Command::InsertSample { sample, ack })
            .is_err()
        {
            tracing::warn!("Channel full, dropping metric sample");
            self.dropped_samples.fetch_add(1, Ordering::Relaxed);
            return Err(StorageError::ChannelSend);
        }
        rx.await.map_err(|_| StorageError::ChannelClosed)?
    }
}

// =============================================================================
// Readers
// =============================================================================

/// Metric sample reader.
#[derive(Clone)]
pub struct MetricReader {
    pool: Arc<ReadPool>,
}

impl std::fmt::Debug for MetricReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricReader").finish_non_exhaustive()
    }
}

impl MetricReader {
    pub(crate) fn new(pool: Arc<ReadPool>) -> Self {
        Self { pool }
    }

    /// Query samples with filters.
    ///
    /// Ties on timestamp are broken by id in the same direction, so results
    /// are stable.
    pub fn query(&self, q: SampleQuery) -> Result<Vec<MetricSample>, StorageError> {
        let conn = self.pool.get()?;
        let limit = q.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let order = q.order.unwrap_or_default();

        let mut sql = String::from(r#"SELECT id, "timestamp", value, source FROM metrics WHERE 1 = 1"#);
        let mut params: Vec<Box<dyn duckdb::ToSql>> = Vec::new();

        if let Some(ref source) = q.source {
            sql.push_str(" AND source = ?");
            params.push(Box::new(source.clone()));
        }
        if let Some(start) = q.start {
            sql.push_str(r#" AND "timestamp" >= ?"#);
            params.push(Box::new(start.timestamp_micros()));
        }
        if let Some(end) = q.end {
            sql.push_str(r#" AND "timestamp" <= ?"#);
            params.push(Box::new(end.timestamp_micros()));
        }

        sql.push_str(&format!(
            r#" ORDER BY "timestamp" {order}, id {order} LIMIT {limit}"#,
            order = order.as_sql(),
        ));

        let param_refs: Vec<&dyn duckdb::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), |row| {
            Ok(MetricSample {
                id: Some(row.get(0)?),
                timestamp: DateTime::from_timestamp_micros(row.get(1)?)
                    .unwrap_or(DateTime::UNIX_EPOCH),
                value: row.get(2)?,
                source: row.get(3)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Latest `limit` samples of `source`, newest first.
    pub fn latest(&self, source: &str, limit: u32) -> Result<Vec<MetricSample>, StorageError> {
        self.query(SampleQuery::latest(source, limit))
    }

    /// Total number of stored samples.
    pub fn count(&self) -> Result<u64, StorageError> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM metrics", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

// =============================================================================
// Admin
// =============================================================================

/// Storage administration.
#[derive(Clone)]
pub struct StorageAdmin {
    tx: SyncSender<Command>,
}

impl std::fmt::Debug for StorageAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageAdmin").finish_non_exhaustive()
    }
}

impl StorageAdmin {
    pub(crate) fn new(tx: SyncSender<Command>) -> Self {
        Self { tx }
    }

    pub fn checkpoint(&self) -> Result<(), StorageError> {
        self.tx
            .try_send(Command::Checkpoint)
            .map_err(|_| StorageError::ChannelSend)
    }

    pub fn shutdown(&self) -> Result<(), StorageError> {
        self.tx
            .try_send(Command::Shutdown)
            .map_err(|_| StorageError::ChannelSend)
    }
}
