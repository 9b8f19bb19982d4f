#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use wps_api::config::{LogFormat, ServerConfig};
use wps_api::router::build_app_router;
use wps_api::state::AppState;
use wps_engine::processes::builtin::builtin_registry;
use wps_engine::processes::LocalExecutor;
use wps_engine::{EngineConfig, JobEngine};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_grace_secs: 1,
        log_format: LogFormat::Text,
        engine: EngineConfig::default(),
    }
}

/// Build the full application router over an engine running the built-in
/// processes. The engine is returned too so tests can inspect it directly.
pub fn build_test_app() -> (Router, Arc<JobEngine>) {
    let config = test_config();
    let executor = Arc::new(LocalExecutor::new(
        builtin_registry().expect("builtins register"),
    ));
    let engine = Arc::new(JobEngine::new(executor, config.engine));
    let state = AppState {
        engine: Arc::clone(&engine),
        config: Arc::new(config),
    };
    (build_app_router(state), engine)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, Body::empty()).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Body::empty()).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Body::from(body.to_string())).await
}

async fn send(app: Router, method: Method, uri: &str, body: Body) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll `GET /api/v1/jobs/{id}` until the job reports a terminal state.
pub async fn wait_for_terminal(app: &Router, job_id: &str, timeout: Duration) -> serde_json::Value {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let json = body_json(get(app.clone(), &format!("/api/v1/jobs/{job_id}")).await).await;
        let state = json["data"]["state"].as_str().unwrap_or_default().to_string();
        if state == "succeeded" || state == "failed" {
            return json["data"].clone();
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {job_id} still {state} after {timeout:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
