//! Cursor-paginated fetcher for the ledger mirror API.
//!
//! Walks `?timestamp=gt:<watermark>&limit=<n>&order=asc` pages, following the
//! `links.next` cursor until it runs out or the page limit is reached.
//! Any failed request aborts the whole fetch.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::record::{DEFAULT_CURSOR_FIELD, RawRecord, Watermark};
use crate::source::{MirrorClient, SourceError, get_json};

/// Default page size.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Default pause between page requests.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);

/// Default collection endpoint, relative to the base URL.
const DEFAULT_ENDPOINT: &str = "/transactions";

/// Default key holding the record array in each page.
const DEFAULT_RECORDS_KEY: &str = "transactions";

/// Result of a paginated fetch.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// All records, in ascending source order.
    pub records: Vec<RawRecord>,
    /// Number of pages requested.
    pub pages: usize,
    /// Watermark after the last fetched record.
    pub watermark: Watermark,
}

/// One decoded page.
#[derive(Debug)]
struct Page {
    records: Vec<RawRecord>,
    next: Option<String>,
}

/// Paginated fetcher over a cursor-based REST collection.
#[derive(Clone)]
pub struct PaginatedFetcher {
    http: Client,
    base_url: String,
    base_path: String,
    origin: String,
    endpoint: String,
    records_key: String,
    cursor_field: String,
    page_delay: Duration,
}

impl std::fmt::Debug for PaginatedFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginatedFetcher")
            .field("base_url", &self.base_url)
            .field("endpoint", &self.endpoint)
            .field("page_delay", &self.page_delay)
            .finish_non_exhaustive()
    }
}

impl PaginatedFetcher {
    /// Create a fetcher rooted at `base_url` (e.g. `https://host/api/v1`).
    ///
    /// # Errors
    /// Returns `SourceError::InvalidUrl` if `base_url` is not an absolute URL.
    pub fn new(http: Client, base_url: &str) -> Result<Self, SourceError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_url).map_err(|source| SourceError::InvalidUrl {
            url: base_url.clone(),
            source,
        })?;

        Ok(Self {
            http,
            base_path: parsed.path().trim_end_matches('/').to_string(),
            origin: parsed.origin().ascii_serialization(),
            base_url,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            records_key: DEFAULT_RECORDS_KEY.to_string(),
            cursor_field: DEFAULT_CURSOR_FIELD.to_string(),
            page_delay: DEFAULT_PAGE_DELAY,
        })
    }

    /// Create a fetcher sharing the mirror client's HTTP client and base URL.
    pub fn from_mirror(client: &MirrorClient) -> Result<Self, SourceError> {
        Self::new(client.http().clone(), client.base_url())
    }

    /// Set the collection endpoint (default: `/transactions`).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.endpoint = if endpoint.starts_with('/') {
            endpoint
        } else {
            format!("/{endpoint}")
        };
        self
    }

    /// Set the key holding the record array (default: `transactions`).
    pub fn with_records_key(mut self, key: impl Into<String>) -> Self {
        self.records_key = key.into();
        self
    }

    /// Set the record field used to advance the watermark.
    pub fn with_cursor_field(mut self, field: impl Into<String>) -> Self {
        self.cursor_field = field.into();
        self
    }

    /// Set the pause between page requests.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// URL of the first page after `watermark`.
    pub fn first_page_url(&self, watermark: &Watermark, page_size: usize) -> String {
        format!(
            "{}{}?timestamp=gt:{}&limit={}&order=asc",
            self.base_url,
            self.endpoint,
            watermark,
            page_size.max(1)
        )
    }

    /// Resolve a `links.next` value to a fully-qualified URL.
    ///
    /// Accepts an absolute URL, a path that already carries the base path
    /// (joined onto the host only), or a path relative to the base URL.
    pub fn resolve_next(&self, link: &str) -> Result<String, SourceError> {
        let link = link.trim();
        let resolved = if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            let path = if link.starts_with('/') {
                link.to_string()
            } else {
                format!("/{link}")
            };
            if self.is_under_base_path(&path) {
                format!("{}{}", self.origin, path)
            } else {
                format!("{}{}", self.base_url, path)
            }
        };

        Url::parse(&resolved).map_err(|source| SourceError::InvalidUrl {
            url: resolved.clone(),
            source,
        })?;
        Ok(resolved)
    }

    /// Fetch all records after `start`.
    ///
    /// Stops when a page has no next link or after `max_pages` pages.
    /// `None` means no page limit. `Some(0)` is a real limit of zero pages:
    /// no request is made and the result is empty.
    pub async fn fetch(
        &self,
        start: &Watermark,
        page_size: usize,
        max_pages: Option<usize>,
    ) -> Result<Vec<RawRecord>, SourceError> {
        Ok(self.fetch_pages(start, page_size, max_pages).await?.records)
    }

    /// Like [`fetch`](Self::fetch), also reporting page count and the advanced watermark.
    pub async fn fetch_pages(
        &self,
        start: &Watermark,
        page_size: usize,
        max_pages: Option<usize>,
    ) -> Result<FetchOutcome, SourceError> {
        let mut next_url = Some(self.first_page_url(start, page_size));
        let mut records = Vec::new();
        let mut pages = 0usize;

        while let Some(url) = next_url.take() {
            if max_pages.is_some_and(|max| pages >= max) {
                tracing::debug!(pages, "Page limit reached");
                break;
            }
            if pages > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            tracing::info!(url = %url, page = pages + 1, "Fetching page");
            let body = get_json(&self.http, &url).await?;
            let page = self.parse_page(&url, body)?;
            pages += 1;

            tracing::debug!(url = %url, records = page.records.len(), "Page fetched");
            records.extend(page.records);
            next_url = page
                .next
                .map(|link| self.resolve_next(&link))
                .transpose()?;
        }

        let watermark = start.advanced(&records, &self.cursor_field);
        tracing::info!(
            pages,
            records = records.len(),
            watermark = %watermark,
            "Fetch complete"
        );

        Ok(FetchOutcome {
            records,
            pages,
            watermark,
        })
    }

    fn is_under_base_path(&self, path: &str) -> bool {
        if self.base_path.is_empty() {
            return false;
        }
        match path.strip_prefix(self.base_path.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
            None => false,
        }
    }

    fn parse_page(&self, url: &str, body: Value) -> Result<Page, SourceError> {
        let Value::Object(mut body) = body else {
            return Err(SourceError::data_shape(url, "page body is not a JSON object"));
        };

        let records = match body.remove(&self.records_key) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(record) => Ok(record),
                    other => Err(SourceError::data_shape(
                        url,
                        format!("'{}' entry is not an object: {other}", self.records_key),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(SourceError::data_shape(
                    url,
                    format!("'{}' is not an array: {other}", self.records_key),
                ));
            }
        };

        let next = body
            .get("links")
            .and_then(|links| links.get("next"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string);

        Ok(Page { records, next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://mainnet-public.mirrornode.hedera.com/api/v1";

    fn fetcher() -> PaginatedFetcher {
        PaginatedFetcher::new(Client::new(), BASE).unwrap()
    }

    #[test]
    fn test_first_page_url() {
        let url = fetcher().first_page_url(&Watermark::new("1745634000.000000000"), 100);
        assert_eq!(
            url,
            format!("{BASE}/transactions?timestamp=gt:1745634000.000000000&limit=100&order=asc")
        );
    }

    #[test]
    fn test_first_page_url_custom_endpoint() {
        let f = fetcher().with_endpoint("accounts");
        let url = f.first_page_url(&Watermark::new("1"), 0);
        assert_eq!(url, format!("{BASE}/accounts?timestamp=gt:1&limit=1&order=asc"));
    }

    #[test]
    fn test_resolve_absolute_link() {
        let link = "https://other.example.com/api/v1/transactions?limit=5";
        assert_eq!(fetcher().resolve_next(link).unwrap(), link);
    }

    #[test]
    fn test_resolve_host_relative_link() {
        let link = "/api/v1/transactions?limit=100&order=asc&timestamp=gt:1745634000.5";
        assert_eq!(
            fetcher().resolve_next(link).unwrap(),
            format!("https://mainnet-public.mirrornode.hedera.com{link}")
        );
    }

    #[test]
    fn test_resolve_bare_path_link() {
        let link = "/transactions?limit=100&timestamp=gt:1745634000.5";
        assert_eq!(fetcher().resolve_next(link).unwrap(), format!("{BASE}{link}"));

        // Missing leading slash is tolerated
        assert_eq!(
            fetcher().resolve_next("transactions?limit=1").unwrap(),
            format!("{BASE}/transactions?limit=1")
        );
    }

    #[test]
    fn test_resolve_does_not_match_partial_base_path() {
        let link = "/api/v1x/items";
        assert_eq!(fetcher().resolve_next(link).unwrap(), format!("{BASE}{link}"));
    }

    #[test]
    fn test_resolve_with_port_and_no_base_path() {
        let f = PaginatedFetcher::new(Client::new(), "http://127.0.0.1:8080/").unwrap();
        assert_eq!(
            f.resolve_next("/transactions?x=1").unwrap(),
            "http://127.0.0.1:8080/transactions?x=1"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = PaginatedFetcher::new(Client::new(), "not a url").unwrap_err();
        assert!(matches!(err, SourceError::InvalidUrl { .. }));
    }

    #[test]
    fn test_parse_page() {
        let f = fetcher();
        let page = f
            .parse_page(
                "u",
                json!({"transactions": [{"a": 1}, {"b": 2}], "links": {"next": "/api/v1/transactions?x"}}),
            )
            .unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.next.as_deref(), Some("/api/v1/transactions?x"));

        let last = f
            .parse_page("u", json!({"transactions": [], "links": {"next": null}}))
            .unwrap();
        assert!(last.records.is_empty());
        assert!(last.next.is_none());

        let missing = f.parse_page("u", json!({})).unwrap();
        assert!(missing.records.is_empty());
        assert!(missing.next.is_none());
    }

    #[test]
    fn test_parse_page_rejects_bad_shapes() {
        let f = fetcher();
        assert!(f.parse_page("u", json!([1, 2])).is_err());
        assert!(f.parse_page("u", json!({"transactions": {"a": 1}})).is_err());
        assert!(f.parse_page("u", json!({"transactions": [1]})).is_err());
    }
}
