//! Application state.

use std::sync::Arc;

use thiserror::Error;

use crate::config::{ApiConfig, ConfigError};
use crate::cors::AllowedOrigins;
use crate::rate_limit::RateLimiter;
use crate::services::{BackendClient, BackendError};

/// Errors building the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to create backend client: {0}")]
    Backend(#[from] BackendError),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub allowed_origins: Arc<AllowedOrigins>,
    pub rate_limiter: RateLimiter,
    /// Absent when no backend is configured; signup then fails as internal.
    pub backend: Option<Arc<BackendClient>>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: ApiConfig) -> Result<Self, StateError> {
        config.validate()?;

        let backend = config
            .backend
            .as_ref()
            .map(BackendClient::new)
            .transpose()?
            .map(Arc::new);

        Ok(Self {
            allowed_origins: Arc::new(AllowedOrigins::new(config.allowed_origins.iter().cloned())),
            rate_limiter: RateLimiter::new(config.rate_limit),
            backend,
            config: Arc::new(config),
        })
    }
}
