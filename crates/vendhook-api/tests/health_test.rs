//! Health check endpoint tests.
//!
//! Tests the `/health`, `/ready`, and `/live` endpoints including store
//! connectivity checks, status mapping, and response formatting.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use vendhook_api::server::{create_router, AppState};
use vendhook_api::store::mock::MockSaleStore;
use vendhook_core::TestClock;

/// Router over a mock store with the clock frozen at a known instant.
fn test_app(store: Arc<MockSaleStore>) -> Router {
    let clock = Arc::new(TestClock::with_start_time(
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
    ));
    create_router(AppState::new(store, clock, "health-test-secret"))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).expect("build request")
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body =
        axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("read response body");
    serde_json::from_slice(&body).expect("parse response json")
}

/// Test health check returns success when the store is reachable.
///
/// Verifies the structured response: overall status, the database
/// component check, the service version, and a timestamp taken from
/// the injected clock.
#[tokio::test]
async fn health_reports_healthy_when_store_is_reachable() {
    let app = test_app(Arc::new(MockSaleStore::new()));

    let response = app.oneshot(get("/health")).await.expect("execute request");

    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["checks"]["database"]["status"], json!("up"));
    assert!(body["checks"]["database"].get("message").is_none());
    assert!(body["version"].is_string());
    assert_eq!(body["timestamp"], json!("2023-11-14T22:13:20Z"));
}

/// Test health check reports unhealthy when the store ping fails.
///
/// The endpoint must flip to 503 and surface the failure message in the
/// database component check.
#[tokio::test]
async fn health_reports_unhealthy_when_store_ping_fails() {
    let store = Arc::new(MockSaleStore::new());
    store.inject_ping_error("pool exhausted").await;
    let app = test_app(store);

    let response = app.oneshot(get("/health")).await.expect("execute request");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = response_json(response).await;
    assert_eq!(body["status"], json!("unhealthy"));
    assert_eq!(body["checks"]["database"]["status"], json!("down"));
    let message = body["checks"]["database"]["message"].as_str().expect("message string");
    assert!(message.contains("pool exhausted"));
}

/// Test the liveness probe answers without touching the store.
#[tokio::test]
async fn liveness_always_responds() {
    let store = Arc::new(MockSaleStore::new());
    // A broken store must not fail liveness.
    store.inject_ping_error("pool exhausted").await;
    let app = test_app(store);

    let response = app.oneshot(get("/live")).await.expect("execute request");

    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], json!("alive"));
    assert_eq!(body["service"], json!("vendhook-api"));
}

/// Test the readiness probe follows database health.
#[tokio::test]
async fn readiness_tracks_database_health() {
    let app = test_app(Arc::new(MockSaleStore::new()));
    let response = app.oneshot(get("/ready")).await.expect("execute request");
    assert_eq!(response.status(), StatusCode::OK);

    let store = Arc::new(MockSaleStore::new());
    store.inject_ping_error("pool exhausted").await;
    let app = test_app(store);
    let response = app.oneshot(get("/ready")).await.expect("execute request");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
