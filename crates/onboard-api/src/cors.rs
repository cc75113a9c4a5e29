//! CORS admission and response decoration.
//!
//! Admission and decoration are separate concerns: the gate checks the
//! request `Origin` against [`AllowedOrigins`], while every outgoing response
//! carries the same fixed header set with a wildcard allow-origin.

use std::collections::HashSet;

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, ORIGIN,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};

/// Marker admitting any origin.
pub const WILDCARD: &str = "*";

/// Body of the 403 sent to a disallowed origin.
pub const ORIGIN_REJECTED_MESSAGE: &str = "CORS: Origin not allowed";

const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
/// 24 hours.
const MAX_AGE_SECS: &str = "86400";

/// Headers added to every response.
pub fn cors_headers() -> [(HeaderName, HeaderValue); 4] {
    [
        (ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static(WILDCARD)),
        (ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS)),
        (ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS)),
        (ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE_SECS)),
    ]
}

/// Origins admitted by the gate. Built once at start-up, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedOrigins {
    origins: HashSet<String>,
    wildcard: bool,
}

impl AllowedOrigins {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = HashSet::new();
        let mut wildcard = false;
        for origin in origins {
            let origin = origin.into();
            let origin = origin.trim();
            if origin == WILDCARD {
                wildcard = true;
            } else if !origin.is_empty() {
                set.insert(origin.to_string());
            }
        }
        Self {
            origins: set,
            wildcard,
        }
    }

    /// Whether a request from `origin` may proceed.
    pub fn allows(&self, origin: &str) -> bool {
        self.wildcard || self.origins.contains(origin)
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty() && !self.wildcard
    }
}

/// Gate verdict for one request.
pub enum Admission {
    /// Respond immediately; the handler never runs.
    Terminate(Response),
    Continue,
}

/// Decide whether a request may reach its handler.
///
/// Preflights are always answered with 200 and no origin check. Other
/// requests carrying an `Origin` outside the allowed set are refused with 403.
/// Requests without `Origin` proceed.
pub fn admit(allowed: &AllowedOrigins, method: &Method, headers: &HeaderMap) -> Admission {
    if *method == Method::OPTIONS {
        return Admission::Terminate(decorate((StatusCode::OK, "ok").into_response()));
    }

    if let Some(origin) = headers.get(ORIGIN) {
        let admitted = origin
            .to_str()
            .map(|o| allowed.allows(o))
            .unwrap_or(allowed.is_wildcard());
        if !admitted {
            return Admission::Terminate(decorate(
                (StatusCode::FORBIDDEN, ORIGIN_REJECTED_MESSAGE).into_response(),
            ));
        }
    }

    Admission::Continue
}

/// Rebuild `response` with the CORS header set, replacing any existing values.
pub fn decorate(response: Response) -> Response {
    let (mut parts, body) = response.into_parts();
    for (name, value) in cors_headers() {
        parts.headers.insert(name, value);
    }
    Response::from_parts(parts, body)
}
