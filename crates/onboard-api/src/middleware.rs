//! API middleware.
//!
//! Request order through the pipeline:
//!
//! ```text
//! request_id → request_logging → metrics → cors_gate → body limit
//!     → rate_limit_middleware → handler (failures → classifier)
//! ```
//!
//! `cors_gate` decorates every response on its way back out, including the
//! ones it and the rate limiter produce themselves.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::cors::{self, Admission, AllowedOrigins};
use crate::metrics;
use crate::rate_limit::{client_key, rate_limited_response, RateLimitDecision, RateLimiter};

/// CORS admission gate.
/// Must be layered outside every handler and the rate limiter.
pub async fn cors_gate(
    State(allowed): State<Arc<AllowedOrigins>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    match cors::admit(&allowed, request.method(), request.headers()) {
        Admission::Terminate(response) => {
            if response.status() == StatusCode::FORBIDDEN {
                warn!(
                    origin = ?request.headers().get("origin"),
                    uri = %request.uri(),
                    "Rejected request from disallowed origin"
                );
                metrics::record_cors_rejection();
            }
            response
        }
        Admission::Continue => cors::decorate(next.run(request).await),
    }
}

/// Rate limiting middleware keyed by client address.
/// This should be applied to routes that need rate limiting.
pub async fn rate_limit_middleware(
    State(rate_limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let key = client_key(request.headers());

    match rate_limiter.check_and_consume(&key) {
        RateLimitDecision::Allowed { .. } => next.run(request).await,
        RateLimitDecision::Rejected { retry_after_secs } => {
            warn!(client = %key, retry_after_secs, "Rate limit exceeded");
            metrics::record_rate_limit_hit(request.uri().path());
            rate_limited_response(retry_after_secs)
        }
    }
}

/// Header carrying the request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest client-supplied request id that is echoed back.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request ID middleware.
///
/// Everything further down the pipeline runs inside a `request` span carrying
/// the id, so gate rejections and classified failures are correlated in logs.
pub async fn request_id(request: Request<Body>, next: Next) -> Response<Body> {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|id| is_acceptable_request_id(id))
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = info_span!("request", request_id = %request_id);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }

    response
}

fn is_acceptable_request_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id.bytes().all(|b| b.is_ascii_graphic())
}

/// Request logging middleware.
///
/// Preflights and health probes are not logged; server errors are logged at
/// error level, everything else at info.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let client = client_key(request.headers());
    let start = Instant::now();

    let response = next.run(request).await;

    if !is_logged(&method, uri.path()) {
        return response;
    }

    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;
    if status.is_server_error() {
        error!(%method, %uri, %client, status = status.as_u16(), duration_ms, "Request completed");
    } else {
        info!(%method, %uri, %client, status = status.as_u16(), duration_ms, "Request completed");
    }

    response
}

/// Paths polled by orchestrators and metric scrapers.
const PROBE_PATHS: [&str; 3] = ["/health", "/healthz", "/metrics"];

fn is_logged(method: &Method, path: &str) -> bool {
    *method != Method::OPTIONS && !PROBE_PATHS.contains(&path)
}
