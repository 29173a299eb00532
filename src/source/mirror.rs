//! Ledger mirror REST client.

use reqwest::Client;
use serde_json::Value;

use super::{SourceError, get_json, numeric_field};

/// Public mainnet mirror node.
pub const DEFAULT_MIRROR_BASE_URL: &str = "https://mainnet-public.mirrornode.hedera.com/api/v1";

/// USDC token identifier on the mirror's network.
pub const DEFAULT_USDC_TOKEN_ID: &str = "0.0.456858";

/// Client for the ledger mirror API.
#[derive(Clone)]
pub struct MirrorClient {
    http: Client,
    base_url: String,
}

impl std::fmt::Debug for MirrorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl MirrorClient {
    /// Create a client rooted at `base_url` (e.g. `https://host/api/v1`).
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying HTTP client.
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Number of transactions in the mirror's default `/transactions` page.
    pub async fn transaction_count(&self) -> Result<usize, SourceError> {
        let url = format!("{}/transactions", self.base_url);
        let body = get_json(&self.http, &url).await?;
        count_transactions(&url, &body)
    }

    /// Total supply of a token, as reported by `/tokens/{id}`.
    pub async fn token_total_supply(&self, token_id: &str) -> Result<f64, SourceError> {
        let url = format!("{}/tokens/{}", self.base_url, token_id);
        let body = get_json(&self.http, &url).await?;
        parse_total_supply(&url, &body)
    }
}

fn count_transactions(url: &str, body: &Value) -> Result<usize, SourceError> {
    body.get("transactions")
        .and_then(Value::as_array)
        .map(Vec::len)
        .ok_or_else(|| SourceError::data_shape(url, "missing 'transactions' array"))
}

fn parse_total_supply(url: &str, body: &Value) -> Result<f64, SourceError> {
    let field = body
        .get("total_supply")
        .ok_or_else(|| SourceError::data_shape(url, "missing 'total_supply'"))?;
    numeric_field(field).ok_or_else(|| {
        SourceError::data_shape(url, format!("'total_supply' is not numeric: {field}"))
    })
}
