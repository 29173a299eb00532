//! Application configuration structures.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collector::{DEFAULT_CALL_TIMEOUT, DEFAULT_INTERVAL, MIN_INTERVAL};
use crate::ingest::{DEFAULT_PAGE_DELAY, DEFAULT_PAGE_SIZE, DEFAULT_START_WATERMARK};
use crate::source::{
    DEFAULT_MIRROR_BASE_URL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SENTIMENT_URL, DEFAULT_USDC_TOKEN_ID,
};
use crate::storage::DEFAULT_CHANNEL_CAPACITY;

use super::validation::{ConfigError, expand_env_vars, parse_duration};

// =============================================================================
// Constants
// =============================================================================

/// Default metrics store path.
pub const DEFAULT_DATABASE_PATH: &str = "data/metrics.duckdb";

/// Default analytical store path.
pub const DEFAULT_INGEST_PATH: &str = "data/chain_metrics.duckdb";

/// Default backfill table.
pub const DEFAULT_INGEST_TABLE: &str = "hedera_txn";

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

fn default_checkpoint_interval() -> String {
    "5s".to_string()
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (default: "0.0.0.0").
    pub bind: String,

    /// Server port (default: 8080).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

// =============================================================================
// Database Configuration
// =============================================================================

/// Metrics store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path.
    pub path: String,

    /// MPSC channel capacity for write operations (default: 1024).
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Checkpoint interval (default: "5s").
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: String,
}

impl DatabaseConfig {
    /// Parsed checkpoint interval. Call after [`AppConfig::validate`].
    pub fn checkpoint_interval(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.checkpoint_interval).map_err(|e| {
            ConfigError::ValidationError(format!("database checkpoint_interval: {e}"))
        })
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DATABASE_PATH.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            checkpoint_interval: default_checkpoint_interval(),
        }
    }
}

// =============================================================================
// Collector Configuration
// =============================================================================

/// Recurring collector loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Whether `serve` starts the loop (default: true).
    pub enabled: bool,

    /// Time between cycles (default: 5m, minimum: 1s).
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Upper bound on one producer call (default: 10s).
    #[serde(with = "humantime_serde")]
    pub call_timeout: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: DEFAULT_INTERVAL,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

// =============================================================================
// Sources Configuration
// =============================================================================

/// Upstream API endpoints.
///
/// String fields support `${VAR}` and `${VAR:-default}` expansion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Ledger mirror REST base URL, including the API prefix.
    pub mirror_base_url: String,

    /// Fear & greed index URL.
    pub sentiment_url: String,

    /// Token whose supply is collected as `hedera_usdc`.
    pub usdc_token_id: String,

    /// Per-request HTTP timeout (default: 10s).
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            mirror_base_url: DEFAULT_MIRROR_BASE_URL.to_string(),
            sentiment_url: DEFAULT_SENTIMENT_URL.to_string(),
            usdc_token_id: DEFAULT_USDC_TOKEN_ID.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

// =============================================================================
// Ingest Configuration
// =============================================================================

/// Backfill configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Analytical store path.
    pub path: String,

    /// Target table.
    pub table: String,

    /// Records requested per page (default: 100).
    pub page_size: usize,

    /// Stop after this many pages; unset means follow links to the end.
    pub max_pages: Option<usize>,

    /// Pause between page requests (default: 100ms).
    #[serde(with = "humantime_serde")]
    pub page_delay: Duration,

    /// Exclusive lower bound for the first page.
    pub start_watermark: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_INGEST_PATH.to_string(),
            table: DEFAULT_INGEST_TABLE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: None,
            page_delay: DEFAULT_PAGE_DELAY,
            start_watermark: DEFAULT_START_WATERMARK.to_string(),
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Web server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Metrics store configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Collector loop configuration.
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Upstream API endpoints.
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Backfill configuration.
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse, expand environment variables and validate.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yaml::from_str(content)?;
        config.expand_env();
        config.validate()?;
        Ok(config)
    }

    fn expand_env(&mut self) {
        for field in [
            &mut self.database.path,
            &mut self.sources.mirror_base_url,
            &mut self.sources.sentiment_url,
            &mut self.sources.usdc_token_id,
            &mut self.ingest.path,
        ] {
            *field = expand_env_vars(field);
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate server bind address
        self.server.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "invalid server bind address: '{}'",
                self.server.bind
            ))
        })?;

        // Validate server port
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server port must be non-zero".to_string(),
            ));
        }

        if self.database.path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "database path must not be empty".to_string(),
            ));
        }

        // Validate channel capacity
        if self.database.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "database channel_capacity must be positive".to_string(),
            ));
        }

        // Validate checkpoint interval
        self.database.checkpoint_interval()?;

        if self.collector.interval < MIN_INTERVAL {
            return Err(ConfigError::ValidationError(format!(
                "collector interval must be at least {MIN_INTERVAL:?}"
            )));
        }
        if self.collector.call_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "collector call_timeout must be positive".to_string(),
            ));
        }

        for (name, value) in [
            ("sources.mirror_base_url", &self.sources.mirror_base_url),
            ("sources.sentiment_url", &self.sources.sentiment_url),
        ] {
            url::Url::parse(value).map_err(|e| {
                ConfigError::ValidationError(format!("{name}: invalid URL '{value}': {e}"))
            })?;
        }
        if self.sources.usdc_token_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "sources.usdc_token_id must not be empty".to_string(),
            ));
        }
        if self.sources.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "sources request_timeout must be positive".to_string(),
            ));
        }

        if self.ingest.table.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "ingest table must not be empty".to_string(),
            ));
        }
        if self.ingest.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "ingest page_size must be positive".to_string(),
            ));
        }
        crate::time::parse_consensus_timestamp(&self.ingest.start_watermark).map_err(|e| {
            ConfigError::ValidationError(format!("ingest start_watermark: {e}"))
        })?;

        Ok(())
    }
}
