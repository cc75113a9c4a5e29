//! Client for the hosted backend platform.
//!
//! The API does not own any records. Signup requests are forwarded to the
//! backend's auth endpoint and its reply is passed back to the caller.

use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use onboard_models::SignupRequest;

use crate::config::BackendConfig;

/// Path of the backend's signup endpoint.
pub const SIGNUP_PATH: &str = "/auth/v1/signup";

/// Backend call failures. Not [`ApiError`](crate::error::ApiError)s; the
/// classifier maps them by message.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Rejected { status: u16, message: String },
}

/// Hosted backend client.
pub struct BackendClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl BackendClient {
    /// Create a new backend client.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    /// Create an account. Returns the backend's JSON reply.
    pub async fn signup(&self, request: &SignupRequest) -> Result<Value, BackendError> {
        let url = format!("{}{}", self.base_url, SIGNUP_PATH);
        debug!(url = %url, "Forwarding signup");

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(status, &body);
        warn!(status = status.as_u16(), message = %message, "Backend rejected signup");

        Err(BackendError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

/// Best human-readable message from a backend error body.
fn extract_error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|json| {
        ["msg", "message", "error_description", "error"]
            .iter()
            .find_map(|field| json.get(field).and_then(Value::as_str).map(str::to_string))
    });

    from_json.unwrap_or_else(|| {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("backend returned status {}", status.as_u16()))
    })
}
