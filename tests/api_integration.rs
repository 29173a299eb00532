//! API Integration Tests for chainwatch
//!
//! Covers the HTTP endpoints, and the collector loop feeding them from
//! in-process upstream mocks.

mod common;

use std::time::Duration;

use chainwatch::StorageBuilder;
use chainwatch::collector::{
    CollectorLoop, SentimentIndexProducer, TokenSupplyProducer, TransactionCountProducer,
};
use chainwatch::server::{AppState, create_router};
use chainwatch::source::{MirrorClient, SentimentClient, build_client};
use chainwatch::storage::MetricSample;
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

// =============================================================================
// Test Helpers
// =============================================================================

/// Build storage in a temp dir.
fn create_test_storage() -> (chainwatch::StorageHandles, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let handles = StorageBuilder::new(dir.path().join("metrics.duckdb"))
        .channel_capacity(100)
        .build()
        .expect("Failed to build storage");
    (handles, dir)
}

/// Start test server and return base URL.
async fn start_test_server(handles: &chainwatch::StorageHandles) -> String {
    let state = AppState {
        metric_reader: handles.metric_reader.clone(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://{}", addr)
}

async fn get_json(client: &reqwest::Client, url: String) -> Value {
    let resp = client.get(&url).send().await.expect("request failed");
    assert_eq!(resp.status(), 200, "GET {url}");
    resp.json().await.expect("Failed to parse JSON body")
}

// =============================================================================
// Health Probe Tests
// =============================================================================

#[tokio::test]
async fn test_health_probes() {
    let (handles, _dir) = create_test_storage();
    let base_url = start_test_server(&handles).await;
    let client = reqwest::Client::new();

    let body = get_json(&client, format!("{}/healthz", base_url)).await;
    assert_eq!(body["status"], "ok");

    let body = get_json(&client, format!("{}/readyz", base_url)).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db"], "ready");

    handles.shutdown().unwrap();
}

// =============================================================================
// Metrics API Tests
// =============================================================================

#[tokio::test]
async fn test_series_endpoints_filter_by_source() {
    let (handles, _dir) = create_test_storage();
    for (source, value) in [
        ("hedera_tx_count", 25.0),
        ("hedera_usdc", 5.0e9),
        ("crypto_greed_fear", 42.0),
        ("hedera_tx_count", 30.0),
    ] {
        handles
            .writer
            .insert_sample(MetricSample::new(source, value))
            .await
            .unwrap();
    }
    let base_url = start_test_server(&handles).await;
    let client = reqwest::Client::new();

    let body = get_json(&client, format!("{}/api/metrics/hedera/tx-count", base_url)).await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i["source"] == "hedera_tx_count"));
    assert_eq!(items[0]["value"], 30.0);

    let body = get_json(&client, format!("{}/api/metrics/hedera/usdc-minted", base_url)).await;
    assert_eq!(body[0]["value"], 5.0e9);

    let body = get_json(&client, format!("{}/api/metrics/crypto/greed-fear", base_url)).await;
    assert_eq!(body[0]["value"], 42.0);
    assert!(body[0]["timestamp"].as_str().unwrap().ends_with('Z'));

    let body = get_json(&client, format!("{}/api/metrics/debug/raw", base_url)).await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 4);
    assert!(items.iter().all(|i| i["id"].is_i64()));

    handles.shutdown().unwrap();
}

#[tokio::test]
async fn test_generic_metrics_api() {
    let (handles, _dir) = create_test_storage();
    for i in 0..15 {
        handles
            .writer
            .insert_sample(MetricSample::new("crypto_greed_fear", f64::from(i)))
            .await
            .unwrap();
    }
    let base_url = start_test_server(&handles).await;
    let client = reqwest::Client::new();

    let body = get_json(
        &client,
        format!("{}/api/metrics?source=crypto_greed_fear&limit=5&order=asc", base_url),
    )
    .await;
    let values: Vec<f64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["value"].as_f64().unwrap())
        .collect();
    assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);

    let body = get_json(&client, format!("{}/api/metrics?range=1h", base_url)).await;
    assert_eq!(body.as_array().unwrap().len(), 15);

    let body = get_json(&client, format!("{}/api/metrics?source=unknown", base_url)).await;
    assert!(body.as_array().unwrap().is_empty());

    let resp = client
        .get(format!("{}/api/metrics/nope", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    handles.shutdown().unwrap();
}

#[tokio::test]
async fn test_cors_headers_present() {
    let (handles, _dir) = create_test_storage();
    let base_url = start_test_server(&handles).await;

    let resp = reqwest::Client::new()
        .get(format!("{}/api/metrics/debug/raw", base_url))
        .header("Origin", "http://localhost:3000")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().contains_key("access-control-allow-origin"));

    handles.shutdown().unwrap();
}

// =============================================================================
// Collector → API
// =============================================================================

#[tokio::test]
async fn test_collector_cycle_visible_through_api() {
    let mock = common::start_mock_upstream().await;
    let (handles, _dir) = create_test_storage();

    let http = build_client(Duration::from_secs(5)).unwrap();
    let mirror = MirrorClient::new(http.clone(), mock.mirror_base_url());
    let sentiment = SentimentClient::new(http, mock.sentiment_url());

    let mut collector = CollectorLoop::new(handles.writer.clone(), Duration::from_secs(300));
    collector
        .register(TransactionCountProducer::new(mirror.clone()))
        .unwrap();
    collector.register(TokenSupplyProducer::usdc(mirror)).unwrap();
    collector
        .register(SentimentIndexProducer::new(sentiment))
        .unwrap();

    let report = collector.run_cycle().await;
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(
        report.succeeded,
        vec!["hedera_tx_count", "hedera_usdc", "crypto_greed_fear"]
    );
    assert_eq!(
        mock.requests_to("/api/v1/tokens"),
        vec!["/api/v1/tokens/0.0.456858"]
    );

    let base_url = start_test_server(&handles).await;
    let client = reqwest::Client::new();

    let body = get_json(&client, format!("{}/api/metrics/hedera/tx-count", base_url)).await;
    assert_eq!(body[0]["value"], 2.0);
    let body = get_json(&client, format!("{}/api/metrics/hedera/usdc-minted", base_url)).await;
    assert_eq!(body[0]["value"], 5_000_000_000.0);
    let body = get_json(&client, format!("{}/api/metrics/crypto/greed-fear", base_url)).await;
    assert_eq!(body[0]["value"], 42.0);

    handles.shutdown().unwrap();
}

#[tokio::test]
async fn test_failing_upstream_does_not_block_other_producers() {
    let (handles, _dir) = create_test_storage();
    let mock = common::start_mock_upstream().await;

    let http = build_client(Duration::from_secs(2)).unwrap();
    // Nothing listens on port 1
    let dead_mirror = MirrorClient::new(http.clone(), "http://127.0.0.1:1/api/v1");
    let sentiment = SentimentClient::new(http, mock.sentiment_url());

    let mut collector = CollectorLoop::new(handles.writer.clone(), Duration::from_secs(300));
    collector
        .register(TransactionCountProducer::new(dead_mirror))
        .unwrap();
    collector
        .register(SentimentIndexProducer::new(sentiment))
        .unwrap();

    let report = collector.run_cycle().await;
    assert_eq!(report.succeeded, vec!["crypto_greed_fear"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "hedera_tx_count");
    assert_eq!(handles.metric_reader.count().unwrap(), 1);

    handles.shutdown().unwrap();
}
