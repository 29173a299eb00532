//! Crypto fear & greed index client.

use reqwest::Client;
use serde_json::Value;

use super::{SourceError, get_json};

/// Public fear & greed index endpoint.
pub const DEFAULT_SENTIMENT_URL: &str = "https://api.alternative.me/fng/";

/// Client for the sentiment index API.
///
/// Response shape: `{"data": [{"value": "<int-as-string>", ...}]}`.
#[derive(Clone)]
pub struct SentimentClient {
    http: Client,
    url: String,
}

impl std::fmt::Debug for SentimentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentClient")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl SentimentClient {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    /// Latest index value (0-100).
    pub async fn index(&self) -> Result<i64, SourceError> {
        let body = get_json(&self.http, &self.url).await?;
        parse_index(&self.url, &body)
    }
}

fn parse_index(url: &str, body: &Value) -> Result<i64, SourceError> {
    let first = body
        .get("data")
        .and_then(Value::as_array)
        .and_then(|data| data.first())
        .ok_or_else(|| SourceError::data_shape(url, "no data available"))?;

    match first.get("value") {
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| SourceError::data_shape(url, format!("'value' is not an integer: {s}"))),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| SourceError::data_shape(url, format!("'value' is not an integer: {n}"))),
        _ => Err(SourceError::data_shape(url, "missing 'value' in first data entry")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const URL: &str = "https://sentiment.test/fng/";

    #[test]
    fn test_parse_index() {
        let body = json!({
            "name": "Fear and Greed Index",
            "data": [{"value": "72", "value_classification": "Greed", "timestamp": "1745625600"}]
        });
        assert_eq!(parse_index(URL, &body).unwrap(), 72);
    }

    #[test]
    fn test_parse_index_numeric_value() {
        let body = json!({"data": [{"value": 15}]});
        assert_eq!(parse_index(URL, &body).unwrap(), 15);
    }

    #[test]
    fn test_parse_index_empty_data_is_error() {
        for body in [json!({"data": []}), json!({}), json!({"data": null})] {
            let err = parse_index(URL, &body).unwrap_err();
            assert!(matches!(err, SourceError::DataShape { .. }));
            assert!(err.to_string().contains("no data available"));
        }
    }

    #[test]
    fn test_parse_index_bad_value() {
        let err = parse_index(URL, &json!({"data": [{"value": "high"}]})).unwrap_err();
        assert!(matches!(err, SourceError::DataShape { .. }));

        let err = parse_index(URL, &json!({"data": [{"other": 1}]})).unwrap_err();
        assert!(err.to_string().contains("missing 'value'"));
    }
}
