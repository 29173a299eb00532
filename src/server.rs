//! Web server module for chainwatch.
//!
//! Provides read-only JSON endpoints over the metrics store.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::config::parse_duration;
use crate::storage::{
    MetricReader, MetricSample, SOURCE_CRYPTO_GREED_FEAR, SOURCE_HEDERA_TX_COUNT,
    SOURCE_HEDERA_USDC, SampleQuery, SortOrder, StorageError,
};

/// Samples returned by the per-source endpoints.
const SERIES_LIMIT: u32 = 100;

/// Samples returned by the raw debug endpoint.
const DEBUG_LIMIT: u32 = 10;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub metric_reader: MetricReader,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    db: Option<String>,
}

/// One point of a metric series.
#[derive(Debug, Serialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub source: String,
}

impl From<MetricSample> for SeriesPoint {
    fn from(s: MetricSample) -> Self {
        Self {
            timestamp: s.timestamp,
            value: s.value,
            source: s.source,
        }
    }
}

/// Query parameters for the generic metrics API.
#[derive(Debug, Deserialize)]
pub struct MetricsQueryParams {
    pub source: Option<String>,
    pub limit: Option<u32>,
    pub order: Option<String>,
    pub range: Option<String>,
}

/// Parse sort order from string.
fn parse_sort_order(s: Option<String>) -> Option<SortOrder> {
    s.and_then(|order| order.to_lowercase().parse().ok())
}

/// Parse a look-back window (`1h`, `24h`, `7d`, `90m`, ...) into a start time.
fn parse_range(range: Option<String>) -> Option<DateTime<Utc>> {
    let window = parse_duration(&range?).ok()?;
    let window = chrono::Duration::from_std(window).ok()?;
    Utc::now().checked_sub_signed(window)
}

fn error_response(e: StorageError) -> Response {
    tracing::error!(error = %e, "Metrics query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "detail": e.to_string() })),
    )
        .into_response()
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .route("/api/metrics", get(metrics_handler))
        .route("/api/metrics/hedera/tx-count", get(tx_count_handler))
        .route("/api/metrics/hedera/usdc-minted", get(usdc_minted_handler))
        .route("/api/metrics/crypto/greed-fear", get(greed_fear_handler))
        .route("/api/metrics/debug/raw", get(debug_raw_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Liveness probe.
async fn healthz_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        db: None,
    })
}

/// Readiness probe that checks DuckDB availability.
async fn readyz_handler(State(state): State<Arc<AppState>>) -> Response {
    let db_status = state
        .metric_reader
        .count()
        .map(|_| "ready".to_string())
        .map_err(|e| e.to_string());

    match db_status {
        Ok(db) => Json(HealthResponse {
            status: "ok".to_string(),
            db: Some(db),
        })
        .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "not_ready".to_string(),
                    db: Some(err),
                }),
            )
                .into_response()
        }
    }
}

/// Latest samples of one source, newest first.
fn series(state: &AppState, source: &str) -> Response {
    match state.metric_reader.latest(source, SERIES_LIMIT) {
        Ok(samples) => {
            Json(samples.into_iter().map(SeriesPoint::from).collect::<Vec<_>>()).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn tx_count_handler(State(state): State<Arc<AppState>>) -> Response {
    series(&state, SOURCE_HEDERA_TX_COUNT)
}

async fn usdc_minted_handler(State(state): State<Arc<AppState>>) -> Response {
    series(&state, SOURCE_HEDERA_USDC)
}

async fn greed_fear_handler(State(state): State<Arc<AppState>>) -> Response {
    series(&state, SOURCE_CRYPTO_GREED_FEAR)
}

/// Latest samples of any source, with ids.
async fn debug_raw_handler(State(state): State<Arc<AppState>>) -> Response {
    let query = SampleQuery {
        limit: Some(DEBUG_LIMIT),
        order: Some(SortOrder::Desc),
        ..Default::default()
    };
    match state.metric_reader.query(query) {
        Ok(samples) => Json(samples).into_response(),
        Err(e) => error_response(e),
    }
}

/// Generic metrics API endpoint - returns JSON samples.
async fn metrics_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MetricsQueryParams>,
) -> Response {
    let query = SampleQuery {
        source: params.source.filter(|s| !s.is_empty()),
        start: parse_range(params.range),
        end: None,
        limit: params.limit,
        order: parse_sort_order(params.order),
    };

    match state.metric_reader.query(query) {
        Ok(samples) => Json(samples).into_response(),
        Err(e) => error_response(e),
    }
}
