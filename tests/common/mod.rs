//! In-process stand-ins for the upstream APIs.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Running mock upstream.
pub struct MockUpstream {
    /// `http://127.0.0.1:<port>`
    pub origin: String,
    /// Request URIs (path + query) in arrival order.
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    /// Mirror base URL, including the API prefix.
    pub fn mirror_base_url(&self) -> String {
        format!("{}/api/v1", self.origin)
    }

    pub fn sentiment_url(&self) -> String {
        format!("{}/fng/", self.origin)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose path starts with `prefix`.
    pub fn requests_to(&self, prefix: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.starts_with(prefix))
            .collect()
    }
}

#[derive(Clone)]
struct MockState {
    origin: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockState {
    fn record(&self, uri: &Uri) {
        let entry = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());
        self.requests.lock().unwrap().push(entry);
    }
}

fn txn(ts: &str, extra: Value) -> Value {
    let mut record = json!({
        "consensus_timestamp": ts,
        "name": "CRYPTOTRANSFER",
        "result": "SUCCESS",
        "charged_tx_fee": 84_112,
    });
    if let (Value::Object(record), Value::Object(extra)) = (&mut record, extra) {
        record.extend(extra);
    }
    record
}

/// Four pages of two records; each `links.next` uses a different form:
/// absolute URL, host-relative path with the API prefix, path relative to
/// the base URL, then `null`.
async fn transactions(
    State(state): State<MockState>,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    state.record(&uri);
    let page: u32 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);

    let (records, next) = match page {
        1 => (
            vec![
                txn("1745634000.000000001", json!({})),
                txn("1745634000.000000002", json!({})),
            ],
            json!(format!("{}/api/v1/transactions?page=2", state.origin)),
        ),
        2 => (
            vec![
                txn("1745634001.000000000", json!({"memo_base64": "aGk="})),
                txn(
                    "1745634001.500000000",
                    json!({"transfers": [{"account": "0.0.98", "amount": 1_000}]}),
                ),
            ],
            json!("/api/v1/transactions?page=3"),
        ),
        3 => (
            vec![
                txn("1745634002.000000000", json!({})),
                txn("1745634003.000000000", json!({})),
            ],
            json!("/transactions?page=4"),
        ),
        _ => (
            vec![
                txn("1745634004.000000000", json!({})),
                txn("1745634005.123456789", json!({})),
            ],
            Value::Null,
        ),
    };

    Json(json!({ "transactions": records, "links": { "next": next } }))
}

async fn token(State(state): State<MockState>, uri: Uri) -> Json<Value> {
    state.record(&uri);
    Json(json!({ "token_id": "0.0.456858", "total_supply": "5000000000" }))
}

async fn fear_greed(State(state): State<MockState>, uri: Uri) -> Json<Value> {
    state.record(&uri);
    Json(json!({ "name": "Fear and Greed Index", "data": [{ "value": "42", "value_classification": "Fear" }] }))
}

async fn broken(State(state): State<MockState>, uri: Uri) -> (StatusCode, &'static str) {
    state.record(&uri);
    (StatusCode::SERVICE_UNAVAILABLE, "maintenance")
}

/// Start the mock on a random local port.
pub async fn start_mock_upstream() -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");
    let origin = format!("http://{addr}");
    let requests = Arc::new(Mutex::new(Vec::new()));

    let state = MockState {
        origin: origin.clone(),
        requests: Arc::clone(&requests),
    };
    let router = Router::new()
        .route("/api/v1/transactions", get(transactions))
        .route("/api/v1/tokens/{id}", get(token))
        .route("/api/v1/broken", get(broken))
        .route("/fng/", get(fear_greed))
        .with_state(state);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    MockUpstream { origin, requests }
}
