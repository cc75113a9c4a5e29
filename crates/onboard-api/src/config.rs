//! API configuration.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

/// Origin allowed when `ALLOWED_ORIGINS` is unset.
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Configuration errors detected at start-up.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("rate limit max requests must be greater than zero")]
    ZeroMaxRequests,

    #[error("rate limit window must be greater than zero")]
    ZeroWindow,

    #[error("rate limit sweep interval must be greater than zero")]
    ZeroSweepInterval,

    #[error("at least one allowed origin is required")]
    NoAllowedOrigins,
}

/// Rate limiter knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests permitted per client per window
    pub max_requests: u32,
    /// Fixed window length
    pub window: Duration,
    /// How often expired entries are evicted
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Hosted backend the signup handler forwards to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://project.backend.example`
    pub url: String,
    /// Project API key, sent as `apikey` and bearer token
    pub api_key: String,
    pub timeout: Duration,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Origins admitted by the CORS gate; `*` admits any origin
    pub allowed_origins: Vec<String>,
    pub rate_limit: RateLimitConfig,
    /// Max request body size
    pub max_body_size: usize,
    /// Signup forwarding target, if configured
    pub backend: Option<BackendConfig>,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
            rate_limit: RateLimitConfig::default(),
            max_body_size: 1024 * 1024, // 1MB
            backend: None,
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let rate_defaults = defaults.rate_limit;

        let backend = std::env::var("BACKEND_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|url| BackendConfig {
                url: url.trim().trim_end_matches('/').to_string(),
                api_key: std::env::var("BACKEND_API_KEY").unwrap_or_default(),
                timeout: Duration::from_secs(env_or("BACKEND_TIMEOUT_SECS", 10)),
            });

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_or("API_PORT", defaults.port),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .map(|s| parse_origins(&s))
                .unwrap_or(defaults.allowed_origins),
            rate_limit: RateLimitConfig {
                max_requests: env_or("RATE_LIMIT_MAX_REQUESTS", rate_defaults.max_requests),
                window: env_millis_or("RATE_LIMIT_WINDOW_MS", rate_defaults.window),
                sweep_interval: env_millis_or(
                    "RATE_LIMIT_SWEEP_INTERVAL_MS",
                    rate_defaults.sweep_interval,
                ),
            },
            max_body_size: env_or("MAX_BODY_SIZE", defaults.max_body_size),
            backend,
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::ZeroMaxRequests);
        }
        if self.rate_limit.window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }
        if self.rate_limit.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroSweepInterval);
        }
        if self.allowed_origins.is_empty() {
            return Err(ConfigError::NoAllowedOrigins);
        }
        Ok(())
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, "Ignoring unparseable setting");
            default
        }),
        Err(_) => default,
    }
}

fn env_millis_or(name: &str, default: Duration) -> Duration {
    Duration::from_millis(env_or(name, default.as_millis() as u64))
}
