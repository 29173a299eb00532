//! Storage Layer
//!
//! Two DuckDB-backed stores:
//! - **Metrics store**: append-only `(timestamp, value, source)` samples, written
//!   by a dedicated actor thread fed through a bounded channel and read through
//!   connections sharing the writer's instance
//! - **Analytical store**: tables of normalized records appended by [`TableWriter`]
//!
//! # Components
//!
//! - [`StorageWriter`]: Sample writes via the actor channel
//! - [`MetricReader`]: Sample queries
//! - [`StorageAdmin`]: Checkpoint and shutdown
//! - [`StorageBuilder`] / [`StorageHandles`]: Initialization and lifecycle management
//! - [`TableWriter`]: Incremental batch appends with schema taken from the first batch

mod actor;
mod builder;
mod error;
mod facades;
mod pool;
mod schema;
mod table;
mod types;

pub use builder::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_CHECKPOINT_INTERVAL, StorageBuilder, StorageHandles,
};
pub use error::StorageError;
pub use facades::{
    DEFAULT_LIMIT, MAX_LIMIT, MetricReader, SampleQuery, SortOrder, StorageAdmin, StorageWriter,
};
pub use table::{ColumnType, TableWriter};
pub use types::{MetricSample, SOURCE_CRYPTO_GREED_FEAR, SOURCE_HEDERA_TX_COUNT, SOURCE_HEDERA_USDC};
