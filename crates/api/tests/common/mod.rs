#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use lockbank_api::config::ServerConfig;
use lockbank_api::router::build_app_router;
use lockbank_api::state::AppState;
use lockbank_core::association::AssociationPolicy;
use lockbank_db::{Store, StoreConfig};
use tempfile::TempDir;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5010".to_string()],
        request_timeout_secs: 30,
        allowed_email_domains: vec!["epitech.eu".to_string(), "epitech.digital".to_string()],
    }
}

/// A store on a fresh database file. Keep the `TempDir` alive for the test.
pub async fn temp_store() -> (TempDir, Store) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = Store::open(&StoreConfig::new(dir.path().join("lockbank.db")))
        .await
        .expect("open store");
    (dir, store)
}

/// Build the full application router with all middleware layers, exactly as
/// `main.rs` does.
pub fn build_test_app(store: Store) -> Router {
    let config = test_config();
    let state = AppState::new(store, AssociationPolicy::default(), config.clone());
    build_app_router(state, &config)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
