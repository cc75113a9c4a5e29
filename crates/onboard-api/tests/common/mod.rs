//! Shared helpers for router-level tests.

#![allow(dead_code)]

use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, Response};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use onboard_api::config::{BackendConfig, RateLimitConfig};
use onboard_api::{create_router, ApiConfig, AppState};

pub const APP_ORIGIN: &str = "https://app.example";

pub const CORS_HEADERS: [(&str, &str); 4] = [
    ("access-control-allow-origin", "*"),
    (
        "access-control-allow-headers",
        "authorization, x-client-info, apikey, content-type",
    ),
    (
        "access-control-allow-methods",
        "GET, POST, PUT, PATCH, DELETE, OPTIONS",
    ),
    ("access-control-max-age", "86400"),
];

pub fn test_config(max_requests: u32, backend_url: Option<String>) -> ApiConfig {
    ApiConfig {
        allowed_origins: vec![APP_ORIGIN.to_string()],
        rate_limit: RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
        },
        backend: backend_url.map(|url| BackendConfig {
            url,
            api_key: "test-key".to_string(),
            timeout: Duration::from_secs(5),
        }),
        environment: "test".to_string(),
        ..ApiConfig::default()
    }
}

pub fn test_state(max_requests: u32, backend_url: Option<String>) -> AppState {
    AppState::new(test_config(max_requests, backend_url)).expect("valid test config")
}

pub fn test_router(state: AppState) -> Router {
    create_router(state, None)
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("router is infallible")
}

/// JSON `POST` with extra headers.
pub fn post_json(uri: &str, body: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body.to_string())).expect("valid request")
}

pub fn get(uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).expect("valid request")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

/// Every CORS header is present exactly once with its fixed value.
pub fn assert_cors_headers(headers: &HeaderMap) {
    for (name, expected) in CORS_HEADERS {
        let values: Vec<_> = headers.get_all(name).iter().collect();
        assert_eq!(values.len(), 1, "header {} should appear once", name);
        assert_eq!(values[0], expected, "header {}", name);
    }
}
