//! Axum HTTP API server.
//!
//! This crate provides:
//! - A uniform error taxonomy and a classifier turning any handler failure
//!   into one JSON response
//! - Per-client fixed-window rate limiting with background eviction
//! - A CORS admission gate that runs before every handler
//! - Thin entry points (signup, health) in front of a hosted backend
//! - Prometheus metrics

pub mod classifier;
pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod services;
pub mod state;

pub use classifier::{classify, handle_error, Classification};
pub use config::{ApiConfig, RateLimitConfig};
pub use cors::AllowedOrigins;
pub use error::{ApiError, ApiResult, ErrorKind, HandlerError};
pub use rate_limit::{RateLimitDecision, RateLimiter, SweeperHandle};
pub use routes::create_router;
pub use state::AppState;
