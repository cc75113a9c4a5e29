//! Signup handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

use onboard_models::SignupRequest;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Create an account on the hosted backend.
///
/// The request is validated locally, then forwarded as-is. Backend
/// failures propagate untyped and are classified by message.
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(request) = payload.map_err(|rejection| ApiError::validation(rejection.body_text()))?;

    let invalid = request.invalid_fields();
    if !invalid.is_empty() {
        return Err(ApiError::validation("Invalid signup request")
            .with_details(json!({ "fields": invalid }))
            .into());
    }

    let backend = state
        .backend
        .as_ref()
        .ok_or_else(|| ApiError::internal("signup backend not configured"))?;

    let created = backend.signup(&request).await?;
    info!("Signup forwarded to backend");

    Ok((StatusCode::CREATED, Json(created)))
}
