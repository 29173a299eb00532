//! Timestamp conversions between upstream representations and UTC.
//!
//! The ledger mirror reports consensus timestamps as `"<seconds>.<nanos>"`
//! strings. These helpers turn them into canonical ISO-8601 UTC strings and
//! back into watermarks.

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

/// Number of fractional digits in a consensus timestamp.
const NANOS_DIGITS: usize = 9;

/// Errors produced while parsing timestamps.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    /// Input was empty or whitespace.
    #[error("timestamp is empty")]
    Empty,

    /// Input is not `<seconds>[.<fraction>]`.
    #[error("malformed timestamp '{0}'")]
    Malformed(String),

    /// Seconds value cannot be represented as a UTC instant.
    #[error("timestamp '{0}' is out of range")]
    OutOfRange(String),
}

/// Convert a consensus timestamp string to an ISO-8601 UTC string.
///
/// The fractional part is truncated, so the output always has whole-second
/// precision and ends in `Z`.
///
/// ```
/// use chainwatch::time::timestamp_to_utc;
///
/// assert_eq!(timestamp_to_utc("1745634000").unwrap(), "2025-04-26T02:20:00Z");
/// assert_eq!(timestamp_to_utc("1745634000.999999999").unwrap(), "2025-04-26T02:20:00Z");
/// ```
pub fn timestamp_to_utc(ts: &str) -> Result<String, TimestampError> {
    let (secs, _) = split_consensus(ts)?;
    let dt = DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| TimestampError::OutOfRange(ts.to_string()))?;
    Ok(dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Parse a consensus timestamp with full nanosecond precision.
pub fn parse_consensus_timestamp(ts: &str) -> Result<DateTime<Utc>, TimestampError> {
    let (secs, nanos) = split_consensus(ts)?;
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .ok_or_else(|| TimestampError::OutOfRange(ts.to_string()))
}

/// Format a UTC instant as a consensus timestamp (`"<secs>.<9-digit nanos>"`).
///
/// Useful for deriving a fetch watermark from a calendar time.
pub fn format_consensus_timestamp(dt: DateTime<Utc>) -> String {
    format!("{}.{:09}", dt.timestamp(), dt.timestamp_subsec_nanos())
}

/// Convert unix seconds to ISO-8601 UTC, keeping any fractional seconds.
///
/// Returns `None` for non-finite or out-of-range input.
pub fn unix_to_iso8601(secs: f64) -> Option<String> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    let (whole, nanos) = if nanos >= 1_000_000_000 {
        (whole + 1.0, 0)
    } else {
        (whole, nanos)
    };
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    DateTime::<Utc>::from_timestamp(whole as i64, nanos)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

fn split_consensus(ts: &str) -> Result<(i64, u32), TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let (secs_part, frac_part) = match ts.split_once('.') {
        Some((s, f)) => (s, Some(f)),
        None => (ts, None),
    };

    if secs_part.is_empty() || !secs_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimestampError::Malformed(ts.to_string()));
    }
    let secs: i64 = secs_part
        .parse()
        .map_err(|_| TimestampError::OutOfRange(ts.to_string()))?;

    let nanos = match frac_part {
        None => 0,
        Some(f) => {
            if f.is_empty() || f.len() > NANOS_DIGITS || !f.bytes().all(|b| b.is_ascii_digit()) {
                return Err(TimestampError::Malformed(ts.to_string()));
            }
            let padded = format!("{f:0<width$}", width = NANOS_DIGITS);
            padded
                .parse::<u32>()
                .map_err(|_| TimestampError::Malformed(ts.to_string()))?
        }
    };

    Ok((secs, nanos))
}
