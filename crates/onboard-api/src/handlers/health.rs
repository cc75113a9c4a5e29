//! Health check handlers.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use onboard_models::HealthResponse;

use crate::state::AppState;

/// Health check endpoint (liveness probe).
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.clone(),
        timestamp: Utc::now(),
    })
}
