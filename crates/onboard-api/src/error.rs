//! API error types.
//!
//! [`ApiError`] is the structured error a handler raises when it knows what
//! went wrong. Anything else a handler propagates with `?` becomes an
//! untyped [`HandlerError`], which the classifier maps by message.

use std::error::Error as StdError;
use std::fmt;

use axum::http::StatusCode;
use serde_json::Value;
use thiserror::Error;

pub use onboard_models::ErrorKind;

pub type ApiResult<T> = Result<T, HandlerError>;

/// A structured, classified API error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    details: Option<Value>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, msg)
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, msg)
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }

    pub fn rate_limit(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimit, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, msg)
    }

    /// Attach a structured payload returned to the client as `details`.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    pub fn code(&self) -> Option<&'static str> {
        self.kind.code()
    }

    pub fn status_code(&self) -> StatusCode {
        status_for(self.kind)
    }
}

/// HTTP status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Any failure raised while handling a request.
///
/// Converts from every `std::error::Error`, remembering the concrete type
/// name for diagnostics. Like `anyhow::Error` it does not implement
/// `std::error::Error` itself.
pub struct HandlerError {
    inner: Box<dyn StdError + Send + Sync + 'static>,
    type_name: &'static str,
}

impl HandlerError {
    /// An untyped failure that only carries a message.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self {
            inner: Box::new(MessageError(message.to_string())),
            type_name: "Error",
        }
    }

    /// The structured error, if this failure is one.
    pub fn as_api_error(&self) -> Option<&ApiError> {
        self.inner.downcast_ref::<ApiError>()
    }

    /// Concrete type name of the wrapped error.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn message(&self) -> String {
        self.inner.to_string()
    }

    /// Messages of the underlying causes, outermost first.
    pub fn causes(&self) -> Vec<String> {
        let mut causes = Vec::new();
        let mut source = self.inner.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        causes
    }
}

impl<E> From<E> for HandlerError
where
    E: StdError + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self {
            inner: Box::new(err),
            type_name: std::any::type_name::<E>(),
        }
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerError")
            .field("type", &self.type_name)
            .field("inner", &self.inner)
            .finish()
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

#[derive(Debug)]
struct MessageError(String);

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for MessageError {}
