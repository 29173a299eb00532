//! chainwatch - Chain & Market Metrics Collector
//!
//! This crate provides the core functionality for chainwatch. It can be used
//! as a library, or run as a standalone binary with the `chainwatch` executable.
//!
//! # Architecture
//!
//! - **Sources**: Read-only clients for the ledger mirror and sentiment APIs
//! - **Collector**: Recurring loop turning producer values into metric samples
//! - **Ingest**: Paginated backfill of raw transactions into an analytical table
//! - **Storage**: DuckDB metrics store (actor writer) and analytical store
//! - **Server**: JSON API over the metrics store
//!
//! # Example
//!
//! ```rust,no_run
//! use chainwatch::{CollectorLoop, StorageBuilder};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handles = StorageBuilder::new("data/metrics.duckdb").build()?;
//!
//!     let mut collector = CollectorLoop::new(handles.writer.clone(), Duration::from_secs(300));
//!     collector.register_fn("constant", || async { Ok(1.0) })?;
//!     let handle = collector.spawn();
//!
//!     tokio::signal::ctrl_c().await?;
//!     handle.shutdown().await;
//!     handles.shutdown()?;
//!     Ok(())
//! }
//! ```

pub mod collector;
pub mod config;
pub mod ingest;
pub mod server;
pub mod source;
pub mod storage;
pub mod time;

pub use collector::{CollectorError, CollectorHandle, CollectorLoop, Producer};
pub use config::AppConfig;
pub use ingest::{NormalizedRow, PaginatedFetcher, RawRecord, Watermark};
pub use storage::{
    MetricReader, MetricSample, StorageBuilder, StorageError, StorageHandles, StorageWriter,
    TableWriter,
};
pub use time::timestamp_to_utc;
