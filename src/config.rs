//! Configuration module for chainwatch.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Server settings (port, bind address)
//! - Metrics store settings (path, channel capacity, checkpoint interval)
//! - Collector loop settings (interval, request timeout)
//! - Upstream source URLs
//! - Backfill settings (analytical store, table, paging)

mod app;
mod validation;

pub use app::{
    AppConfig, CollectorConfig, DatabaseConfig, IngestConfig, ServerConfig, SourcesConfig,
};
pub use validation::{ConfigError, expand_env_vars, parse_duration};
