//! Router-level tests for the CORS gate, rate limiter and classifier.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware;
use axum::routing;
use axum::Router;
use serde_json::json;

use onboard_api::middleware::{cors_gate, rate_limit_middleware};
use onboard_api::{AllowedOrigins, ApiError, HandlerError, RateLimitConfig, RateLimiter};

use common::*;

#[tokio::test]
async fn test_preflight_ignores_origin() {
    let app = test_router(test_state(5, None));

    let response = send(
        &app,
        Request::builder()
            .method("OPTIONS")
            .uri("/signup")
            .header("origin", "https://evil.example")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors_headers(response.headers());
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_disallowed_origin_never_reaches_handler() {
    let state = test_state(5, None);
    let limiter = state.rate_limiter.clone();
    let app = test_router(state);

    let response = send(
        &app,
        post_json(
            "/signup",
            r#"{"email":"ada@example.com","password":"secret1"}"#,
            &[("origin", "https://evil.example"), ("x-forwarded-for", "203.0.113.7")],
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_cors_headers(response.headers());
    assert_eq!(body_text(response).await, "CORS: Origin not allowed");
    assert!(limiter.is_empty(), "rate limiter must not see rejected origins");
}

#[tokio::test]
async fn test_allowed_origin_and_missing_origin_proceed() {
    let app = test_router(test_state(5, None));

    let response = send(&app, get("/health", &[("origin", APP_ORIGIN)])).await;
    assert_eq!(response.status(), StatusCode::OK);
    // The allow-origin header stays a wildcard even for a validated origin.
    assert_cors_headers(response.headers());

    let response = send(&app, get("/health", &[])).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_cors_headers(response.headers());
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["environment"], "test");
}

#[tokio::test]
async fn test_rate_limit_rejects_over_quota_client() {
    let state = test_state(2, None);
    let limiter = state.rate_limiter.clone();
    let app = test_router(state);
    let client = [("x-forwarded-for", "203.0.113.7, 10.0.0.1")];

    // Under quota the request reaches the handler, which fails without a backend.
    for _ in 0..2 {
        let response = send(
            &app,
            post_json("/signup", r#"{"email":"ada@example.com","password":"secret1"}"#, &client),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    let response = send(
        &app,
        post_json("/signup", r#"{"email":"ada@example.com","password":"secret1"}"#, &client),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_cors_headers(response.headers());
    let retry_after: u64 = response.headers()["retry-after"].to_str().unwrap().parse().unwrap();
    assert!(retry_after > 0 && retry_after <= 60);

    let body = body_json(response).await;
    assert_eq!(body["code"], "RATE_LIMIT_ERROR");
    assert_eq!(body["details"]["retryAfter"], json!(retry_after));

    assert_eq!(limiter.entry("203.0.113.7").unwrap().count, 2);

    // Another client has its own window.
    let response = send(
        &app,
        post_json(
            "/signup",
            r#"{"email":"ada@example.com","password":"secret1"}"#,
            &[("x-real-ip", "198.51.100.2")],
        ),
    )
    .await;
    assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_clients_without_address_share_one_bucket() {
    let state = test_state(1, None);
    let limiter = state.rate_limiter.clone();
    let app = test_router(state);

    let first = send(&app, post_json("/signup", "{}", &[])).await;
    assert_ne!(first.status(), StatusCode::TOO_MANY_REQUESTS);

    let second = send(&app, post_json("/signup", "{}", &[])).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limiter.entry("unknown").is_some());
}

#[tokio::test]
async fn test_health_is_not_rate_limited() {
    let app = test_router(test_state(1, None));

    for _ in 0..5 {
        let response = send(&app, get("/health", &[])).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_unknown_route_is_classified_not_found() {
    let app = test_router(test_state(5, None));

    let response = send(&app, get("/nope", &[])).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_cors_headers(response.headers());
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Route not found", "code": "NOT_FOUND" })
    );
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = test_router(test_state(5, None));

    let response = send(&app, get("/health", &[("x-request-id", "req-123")])).await;
    assert_eq!(response.headers()["x-request-id"], "req-123");

    let response = send(&app, get("/health", &[])).await;
    assert!(response.headers().contains_key("x-request-id"));

    // Unusable client ids are replaced rather than echoed.
    let response = send(&app, get("/health", &[("x-request-id", "two words")])).await;
    let id = response.headers()["x-request-id"].to_str().unwrap();
    assert_ne!(id, "two words");
    assert!(uuid_like(id));
}

fn uuid_like(id: &str) -> bool {
    id.len() == 36 && id.chars().filter(|c| *c == '-').count() == 4
}

/// A bare pipeline around handlers that fail in different ways.
fn failing_app(max_requests: u32) -> Router {
    let limiter = RateLimiter::new(RateLimitConfig {
        max_requests,
        ..RateLimitConfig::default()
    });
    let allowed = Arc::new(AllowedOrigins::new([APP_ORIGIN]));

    Router::new()
        .route(
            "/missing",
            routing::get(|| async { Err::<(), _>(HandlerError::msg("User not found")) }),
        )
        .route(
            "/token",
            routing::get(|| async { Err::<(), _>(HandlerError::msg("JWT expired")) }),
        )
        .route(
            "/io",
            routing::get(|| async {
                let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
                Err::<(), HandlerError>(err.into())
            }),
        )
        .route(
            "/typed",
            routing::get(|| async {
                Err::<(), _>(ApiError::authorization("Admins only").with_details(json!({ "role": "user" })))
            }),
        )
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .layer(middleware::from_fn_with_state(allowed, cors_gate))
}

#[tokio::test]
async fn test_untyped_not_found_failure() {
    let app = failing_app(10);

    let response = send(&app, get("/missing", &[("origin", APP_ORIGIN)])).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_cors_headers(response.headers());
    assert_eq!(
        body_json(response).await,
        json!({ "error": "User not found", "code": "NOT_FOUND" })
    );
}

#[tokio::test]
async fn test_untyped_token_failure() {
    let app = failing_app(10);

    let response = send(&app, get("/token", &[])).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Invalid or expired token", "code": "AUTHENTICATION_ERROR" })
    );
}

#[tokio::test]
async fn test_unrecognised_failure_is_internal() {
    let app = failing_app(10);

    let response = send(&app, get("/io", &[])).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors_headers(response.headers());

    let body = body_json(response).await;
    assert_eq!(body["error"], "disk full");
    assert!(body.get("code").is_none());
    assert!(body["details"]["type"].as_str().unwrap().contains("io"));
}

#[tokio::test]
async fn test_typed_failure_keeps_details() {
    let app = failing_app(10);

    let response = send(&app, get("/typed", &[])).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await,
        json!({
            "error": "Admins only",
            "code": "AUTHORIZATION_ERROR",
            "details": { "role": "user" }
        })
    );
}

#[tokio::test]
async fn test_every_exit_path_is_decorated_once() {
    let app = failing_app(1);
    let client = ("x-forwarded-for", "192.0.2.1");

    let business_failure = send(&app, get("/missing", &[client])).await;
    let rate_limited = send(&app, get("/missing", &[client])).await;
    let cors_rejected = send(&app, get("/missing", &[("origin", "https://evil.example")])).await;

    assert_eq!(business_failure.status(), StatusCode::NOT_FOUND);
    assert_eq!(rate_limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(cors_rejected.status(), StatusCode::FORBIDDEN);

    for response in [business_failure, rate_limited, cors_rejected] {
        assert_cors_headers(response.headers());
    }
}
