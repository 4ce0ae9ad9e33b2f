// ============================================================================
// Health Routes
// ============================================================================
//
// Endpoints:
// - GET /                  - Welcome envelope
// - GET /health            - Gateway liveness
// - GET /health/{service}  - Probe one backend's /health endpoint
//
// ============================================================================

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::error::AppError;
use crate::gateway::{GatewayState, Service};
use crate::response::ApiResponse;

pub async fn welcome() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success("Welcome to the Portico API gateway", None))
}

pub async fn health() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success("API gateway is healthy", None))
}

/// GET /health/{service}
///
/// Probes the named backend's own /health endpoint.
pub async fn upstream_health(
    State(state): State<Arc<GatewayState>>,
    Path(service): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let Some(service) = Service::from_name(&service) else {
        return Err(AppError::NotFound(format!("Unknown service: {}", service)));
    };

    let base_url = state
        .discovery
        .resolve(service)
        .map_err(|e| AppError::UpstreamUnavailable(e.to_string()))?;

    if state.service_client.check_health(&base_url).await {
        Ok(Json(ApiResponse::success(
            format!("{} service is healthy", service.name()),
            None,
        )))
    } else {
        Err(AppError::UpstreamUnavailable(format!(
            "{} service failed its health check",
            service.name()
        )))
    }
}
