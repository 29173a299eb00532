//! Ingest Layer
//!
//! Bulk path that backfills historical records into the analytical store:
//!
//! - [`PaginatedFetcher`]: walks the cursor-paginated source API from a [`Watermark`]
//! - [`normalize`]: reshapes heterogeneous [`RawRecord`]s into uniform [`NormalizedRow`]s
//! - [`backfill`]: fetch → normalize → [`TableWriter`](crate::storage::TableWriter) append
//!
//! # Example
//!
//! ```rust,no_run
//! use chainwatch::ingest::{PaginatedFetcher, Watermark, backfill};
//! use chainwatch::source::{DEFAULT_MIRROR_BASE_URL, DEFAULT_REQUEST_TIMEOUT, build_client};
//! use chainwatch::storage::TableWriter;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let http = build_client(DEFAULT_REQUEST_TIMEOUT)?;
//! let fetcher = PaginatedFetcher::new(http, DEFAULT_MIRROR_BASE_URL)?;
//! let writer = TableWriter::open("data/chain_metrics.duckdb")?;
//! let report = backfill(&fetcher, &writer, "hedera_txn", &Watermark::default(), 100, Some(3)).await?;
//! println!("resume from {}", report.watermark);
//! # Ok(())
//! # }
//! ```

mod backfill;
mod fetcher;
mod normalizer;
mod record;

use thiserror::Error;

use crate::source::SourceError;
use crate::storage::StorageError;

pub use backfill::{BackfillReport, backfill};
pub use fetcher::{DEFAULT_PAGE_DELAY, DEFAULT_PAGE_SIZE, FetchOutcome, PaginatedFetcher};
pub use normalizer::{columns, normalize};
pub use record::{
    Cell, DEFAULT_CURSOR_FIELD, DEFAULT_START_WATERMARK, NormalizedRow, RawRecord, Watermark,
};

/// Errors that can occur during a backfill.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Fetching from the source failed.
    #[error("fetch failed: {0}")]
    Source(#[from] SourceError),

    /// Writing to the analytical store failed.
    #[error("store write failed: {0}")]
    Storage(#[from] StorageError),

    /// Blocking write task panicked or was cancelled.
    #[error("write task failed: {0}")]
    Task(String),
}
