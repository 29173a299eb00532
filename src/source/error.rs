//! Upstream source error types.

use thiserror::Error;

/// Errors raised while talking to an upstream API.
///
/// `Transport`, `Status` and `Decode` abort the current call. `DataShape`
/// means the response arrived but did not contain what the caller expected.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Network failure or request timeout.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Upstream answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Body could not be decoded as JSON.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Expected field missing or malformed.
    #[error("unexpected response from {url}: {reason}")]
    DataShape { url: String, reason: String },

    /// A URL could not be parsed or resolved.
    #[error("invalid url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl SourceError {
    pub(crate) fn data_shape(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataShape {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error came from the network layer (including HTTP status).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Status { .. } | Self::Client(_)
        )
    }
}
