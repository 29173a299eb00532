//! Upstream API clients.
//!
//! Thin read-only clients for the public data sources chainwatch polls:
//!
//! - [`MirrorClient`]: ledger mirror REST API (transactions, tokens)
//! - [`SentimentClient`]: crypto fear & greed index
//!
//! All requests go through [`get_json`], which applies the client timeout,
//! rejects non-2xx responses and decodes the body as JSON.

mod error;
mod mirror;
mod sentiment;

use std::time::Duration;

use reqwest::Client;

pub use error::SourceError;
pub use mirror::{DEFAULT_MIRROR_BASE_URL, DEFAULT_USDC_TOKEN_ID, MirrorClient};
pub use sentiment::{DEFAULT_SENTIMENT_URL, SentimentClient};

/// Default per-request timeout (10 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a reqwest client with the given request timeout.
pub fn build_client(timeout: Duration) -> Result<Client, SourceError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("chainwatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(SourceError::Client)
}

/// GET `url` and decode the body as JSON.
///
/// Any non-success status is returned as [`SourceError::Status`] with the URL.
pub(crate) async fn get_json(client: &Client, url: &str) -> Result<serde_json::Value, SourceError> {
    tracing::debug!(url, "GET");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| SourceError::Transport {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            url: url.to_string(),
            status,
        });
    }

    response
        .json::<serde_json::Value>()
        .await
        .map_err(|source| SourceError::Decode {
            url: url.to_string(),
            source,
        })
}

/// Read a numeric field that may be encoded as a JSON number or a numeric string.
pub(crate) fn numeric_field(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}
