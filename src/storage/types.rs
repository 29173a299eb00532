//! Core data types for the storage layer.
//!
//! - [`MetricSample`]: one `(timestamp, value, source)` observation in the `metrics` table

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source label for the mirror transaction count.
pub const SOURCE_HEDERA_TX_COUNT: &str = "hedera_tx_count";
/// Source label for the USDC total supply.
pub const SOURCE_HEDERA_USDC: &str = "hedera_usdc";
/// Source label for the fear & greed index.
pub const SOURCE_CRYPTO_GREED_FEAR: &str = "crypto_greed_fear";

/// A metric sample stored in the `metrics` table.
///
/// Samples are immutable and append-only. `id` is assigned by the store.
///
/// # Example
///
/// ```
/// use chainwatch::storage::MetricSample;
///
/// let sample = MetricSample::new("hedera_tx_count", 25.0);
/// assert!(sample.id.is_none());
/// assert_eq!(sample.source, "hedera_tx_count");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Store-assigned identifier (None before insert).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Observation time (UTC).
    pub timestamp: DateTime<Utc>,
    /// Observed value.
    pub value: f64,
    /// Producer label.
    pub source: String,
}

impl MetricSample {
    /// Create a sample timestamped now.
    pub fn new(source: impl Into<String>, value: f64) -> Self {
        Self::at(source, value, Utc::now())
    }

    /// Create a sample with an explicit timestamp.
    pub fn at(source: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            timestamp,
            value,
            source: source.into(),
        }
    }
}
