#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use gatehouse_api::config::ServerConfig;
use gatehouse_api::router::build_app_router;
use gatehouse_api::state::AppState;
use gatehouse_pipeline::caddy::CaddyfileParser;
use gatehouse_pipeline::hosts::HostService;
use gatehouse_pipeline::import::ImportService;
use gatehouse_pipeline::memory::{
    MemoryImportSessionStore, MemoryProxyHostStore, RecordingApplier,
};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(import_dir: &std::path::Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        caddy_admin_url: "http://localhost:2019".to_string(),
        import_dir: import_dir.to_path_buf(),
        import_caddyfile: None,
    }
}

/// The app under test plus handles on its in-memory collaborators.
pub struct TestApp {
    pub router: Router,
    pub hosts: Arc<MemoryProxyHostStore>,
    pub sessions: Arc<MemoryImportSessionStore>,
    pub applier: Arc<RecordingApplier>,
    pub dir: tempfile::TempDir,
}

/// Build the full application router on in-memory stores and a
/// throwaway import directory.
pub fn build_test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("imports"));

    let hosts = Arc::new(MemoryProxyHostStore::new());
    let sessions = Arc::new(MemoryImportSessionStore::new());
    let applier = Arc::new(RecordingApplier::new());

    let state = AppState {
        pool: None,
        config: Arc::new(config.clone()),
        imports: Arc::new(ImportService::new(
            config.import_config(),
            sessions.clone(),
            hosts.clone(),
            Arc::new(CaddyfileParser),
            applier.clone(),
        )),
        hosts: Arc::new(HostService::new(hosts.clone(), applier.clone())),
    };

    TestApp {
        router: build_app_router(state, &config),
        hosts,
        sessions,
        applier,
        dir,
    }
}

pub async fn send(app: &TestApp, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &TestApp, uri: &str) -> Response {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: &TestApp, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: &TestApp, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn delete(app: &TestApp, uri: &str) -> Response {
    send(app, Method::DELETE, uri, None).await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
