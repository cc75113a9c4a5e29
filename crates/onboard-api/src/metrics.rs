//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

use crate::error::ErrorKind;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "onboard_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "onboard_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "onboard_http_requests_in_flight";

    // Middleware metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "onboard_rate_limit_hits_total";
    pub const RATE_LIMIT_ENTRIES: &str = "onboard_rate_limit_entries";
    pub const CORS_REJECTIONS_TOTAL: &str = "onboard_cors_rejections_total";
    pub const ERRORS_TOTAL: &str = "onboard_errors_total";
}

/// Label used for requests that matched no route.
const UNMATCHED_PATH: &str = "unmatched";

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Update the tracked rate limit keys gauge.
pub fn set_rate_limit_entries(count: usize) {
    gauge!(names::RATE_LIMIT_ENTRIES).set(count as f64);
}

/// Record a request refused by the CORS gate.
pub fn record_cors_rejection() {
    counter!(names::CORS_REJECTIONS_TOTAL).increment(1);
}

/// Record a classified handler failure.
pub fn record_error(kind: ErrorKind) {
    let labels = [("kind", kind.as_str().to_string())];
    counter!(names::ERRORS_TOTAL, &labels).increment(1);
}

/// Route template for metric labels, so path parameters and probes of
/// unknown URLs do not explode label cardinality.
fn route_label(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string())
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = route_label(&request);
    let start = Instant::now();

    // Increment in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    // Decrement in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_label_without_match() {
        let request = Request::builder().uri("/wp-admin/setup.php").body(Body::empty()).unwrap();
        assert_eq!(route_label(&request), UNMATCHED_PATH);
    }
}
