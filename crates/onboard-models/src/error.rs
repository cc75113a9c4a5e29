//! Error kinds and the uniform error body.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Closed set of error kinds the API reports.
///
/// Each kind maps to one HTTP status and, except for [`ErrorKind::Internal`],
/// a stable machine-readable code clients can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Authentication,
    Authorization,
    NotFound,
    RateLimit,
    /// Catch-all for anything unrecognised.
    Internal,
}

impl ErrorKind {
    /// Every kind, in table order.
    pub const ALL: [ErrorKind; 6] = [
        ErrorKind::Validation,
        ErrorKind::Authentication,
        ErrorKind::Authorization,
        ErrorKind::NotFound,
        ErrorKind::RateLimit,
        ErrorKind::Internal,
    ];

    /// HTTP status code for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 422,
            ErrorKind::Authentication => 401,
            ErrorKind::Authorization => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::RateLimit => 429,
            ErrorKind::Internal => 500,
        }
    }

    /// Stable error code, if the kind has one.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ErrorKind::Validation => Some("VALIDATION_ERROR"),
            ErrorKind::Authentication => Some("AUTHENTICATION_ERROR"),
            ErrorKind::Authorization => Some("AUTHORIZATION_ERROR"),
            ErrorKind::NotFound => Some("NOT_FOUND"),
            ErrorKind::RateLimit => Some("RATE_LIMIT_ERROR"),
            ErrorKind::Internal => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Authorization => "authorization",
            ErrorKind::NotFound => "not_found",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
            details: None,
        }
    }

    /// Body for `kind`, carrying the kind's default code.
    pub fn for_kind(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: kind.code().map(str::to_string),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}
