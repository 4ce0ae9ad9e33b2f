// ============================================================================
// Authentication Routes
// ============================================================================
//
// Endpoints:
// - POST /auth/login - Local login, issues an HS256 access token
//
// ============================================================================

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppError;
use crate::gateway::GatewayState;
use crate::response::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token for subsequent requests
    pub token: String,
    /// Token expiration timestamp (Unix epoch seconds)
    pub expires_at: i64,
}

/// POST /auth/login
///
/// Validates the configured gateway credentials and issues an access token.
pub async fn login(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::validation(e.body_text()))?;

    if state.config.admin_password.is_empty() {
        tracing::warn!("Login rejected: GATEWAY_ADMIN_PASSWORD is not configured");
        return Err(AppError::unauthenticated("Login is not configured"));
    }

    if request.username != state.config.admin_username
        || request.password != state.config.admin_password
    {
        tracing::warn!(username = %request.username, "Login failed: invalid credentials");
        return Err(AppError::unauthenticated("Invalid credentials"));
    }

    let (token, expires_at) = state
        .auth_manager
        .create_token(&request.username)
        .map_err(|e| AppError::internal(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Login successful",
        Some(LoginResponse { token, expires_at }),
    )))
}
