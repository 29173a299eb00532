//! Collector Layer
//!
//! Recurring collection of scalar metrics into the metrics store. One
//! [`CollectorLoop`] task calls every registered [`Producer`] in order, stores
//! each value as a sample, then sleeps for the full interval.
//!
//! # Architecture
//!
//! - [`Producer`]: Named async source of one value per cycle
//! - [`CollectorLoop`]: Runs producers on a fixed interval, isolating failures
//! - [`CollectorHandle`]: Stops a spawned loop
//!
//! # Example
//!
//! ```rust,no_run
//! use chainwatch::StorageBuilder;
//! use chainwatch::collector::{CollectorLoop, TransactionCountProducer};
//! use chainwatch::source::{DEFAULT_MIRROR_BASE_URL, DEFAULT_REQUEST_TIMEOUT, MirrorClient, build_client};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let handles = StorageBuilder::new("/tmp/metrics.db").build()?;
//! let mirror = MirrorClient::new(build_client(DEFAULT_REQUEST_TIMEOUT)?, DEFAULT_MIRROR_BASE_URL);
//!
//! let mut collector = CollectorLoop::new(handles.writer.clone(), Duration::from_secs(300));
//! collector.register(TransactionCountProducer::new(mirror))?;
//! let handle = collector.spawn();
//! // ...
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod producers;
mod runner;
mod traits;

pub use producers::{SentimentIndexProducer, TokenSupplyProducer, TransactionCountProducer};
pub use runner::{
    CollectorHandle, CollectorLoop, CycleReport, DEFAULT_CALL_TIMEOUT, DEFAULT_INTERVAL,
};
pub use traits::{CollectorError, FnProducer, MIN_INTERVAL, Producer};
