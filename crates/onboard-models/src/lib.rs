//! Wire models for the onboard API.
//!
//! This crate provides Serde-serializable types for:
//! - The uniform error body and the closed set of error kinds
//! - Signup requests
//! - Health responses

pub mod error;
pub mod health;
pub mod signup;

// Re-export common types
pub use error::{ErrorBody, ErrorKind};
pub use health::HealthResponse;
pub use signup::{SignupRequest, MIN_PASSWORD_LENGTH};
