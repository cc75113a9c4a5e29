//! Request handlers.

pub mod health;
pub mod signup;

pub use health::*;
pub use signup::*;

use crate::error::ApiError;

/// Fallback for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
