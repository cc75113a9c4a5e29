//! Failure classification.
//!
//! Every failure that escapes a handler is turned into exactly one JSON
//! response here, and logged once on the way out.
//!
//! Classification order, first match wins:
//! 1. A structured [`ApiError`] keeps its own kind, message and details.
//! 2. An untyped failure is matched against [`MESSAGE_RULES`] in order.
//! 3. Anything else is [`ErrorKind::Internal`], reporting the message and
//!    the concrete error type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use onboard_models::ErrorBody;
use serde_json::json;
use tracing::{error, warn};

use crate::error::{status_for, ApiError, ErrorKind, HandlerError};
use crate::metrics;

/// Message substrings recognised on untyped failures.
///
/// Order matters: a message containing both `permission` and `not found`
/// is an authorization failure.
pub const MESSAGE_RULES: &[(&str, ErrorKind)] = &[
    ("JWT", ErrorKind::Authentication),
    ("permission", ErrorKind::Authorization),
    ("not found", ErrorKind::NotFound),
];

/// Client-facing message for token failures; the raw JWT error is not echoed.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired token";

/// Outcome of classifying one failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub kind: ErrorKind,
    pub status: StatusCode,
    pub body: ErrorBody,
}

/// Classify a failure without side effects.
pub fn classify(err: &HandlerError) -> Classification {
    if let Some(api) = err.as_api_error() {
        return from_api_error(api);
    }

    let message = err.message();

    let matched = MESSAGE_RULES
        .iter()
        .find(|(needle, _)| message.contains(*needle))
        .map(|(_, kind)| *kind);

    match matched {
        Some(ErrorKind::Authentication) => classification(
            ErrorKind::Authentication,
            ErrorBody::for_kind(ErrorKind::Authentication, INVALID_TOKEN_MESSAGE),
        ),
        Some(kind) => classification(kind, ErrorBody::for_kind(kind, message)),
        None => classification(
            ErrorKind::Internal,
            ErrorBody::new(message).with_details(json!({ "type": err.type_name() })),
        ),
    }
}

fn from_api_error(api: &ApiError) -> Classification {
    let mut body = ErrorBody::for_kind(api.kind(), api.message());
    body.details = api.details().cloned();
    classification(api.kind(), body)
}

fn classification(kind: ErrorKind, body: ErrorBody) -> Classification {
    Classification {
        kind,
        status: status_for(kind),
        body,
    }
}

/// Classify, log and render a failure.
pub fn handle_error(err: HandlerError) -> Response {
    let classified = classify(&err);
    log_failure(&err, &classified);
    metrics::record_error(classified.kind);
    (classified.status, Json(classified.body)).into_response()
}

fn log_failure(err: &HandlerError, classified: &Classification) {
    let timestamp = Utc::now().to_rfc3339();
    let causes = err.causes().join(": ");

    if classified.status.is_server_error() {
        error!(
            kind = %classified.kind,
            code = classified.body.code.as_deref().unwrap_or(""),
            status = classified.status.as_u16(),
            error_type = err.type_name(),
            message = %err,
            causes = %causes,
            timestamp = %timestamp,
            "Request failed"
        );
    } else {
        warn!(
            kind = %classified.kind,
            code = classified.body.code.as_deref().unwrap_or(""),
            status = classified.status.as_u16(),
            error_type = err.type_name(),
            message = %err,
            causes = %causes,
            timestamp = %timestamp,
            "Request failed"
        );
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        handle_error(self)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        handle_error(HandlerError::from(self))
    }
}
