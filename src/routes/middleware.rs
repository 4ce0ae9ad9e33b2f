// ============================================================================
// Pipeline Middleware
// ============================================================================
//
// The ordered, short-circuiting request pipeline:
// - request_logging: method/path/status/duration for every request
// - rate_limiting: fixed-window quota with subscriber bypass (/api/** only)
// - authentication: bearer token verification with a public allow-list
//
// A rejecting stage stops the chain and emits the failure envelope; later
// stages never run.
//
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::auth::AuthError;
use crate::error::AppError;
use crate::gateway::rate_limit::Decision;
use crate::gateway::GatewayState;
use crate::utils::client_ip_from_request;

/// Request logging middleware
pub async fn request_logging(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    tracing::debug!(method = %method, path = %path, "Incoming request");

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis(),
        "Request completed"
    );

    response
}

/// Rate limiting middleware
///
/// Applies to forwarded routes only; local endpoints (health, login) are
/// not metered. The subject is extracted best-effort from the bearer token
/// so subscribers can be recognized; an invalid token is not an error here,
/// the authentication stage decides that.
pub async fn rate_limiting(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !request.uri().path().starts_with("/api/") {
        return Ok(next.run(request).await);
    }

    let client_ip = client_ip_from_request(&request);
    let subject = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .and_then(|token| state.auth_manager.verify_token(token).ok())
        .map(|claims| claims.sub);

    match state
        .rate_limiter
        .check(&client_ip, subject.as_deref(), request.headers())
        .await
    {
        Decision::Proceed => Ok(next.run(request).await),
        Decision::Reject => Err(AppError::RateLimited),
    }
}

/// Bearer token authentication middleware
pub async fn authentication(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path();

    if is_public_path(path) {
        return Ok(next.run(request).await);
    }

    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(path = %path, "Missing Authorization header");
            AppError::unauthenticated("Missing bearer token")
        })?;

    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::warn!(path = %path, "Invalid Authorization header format");
        AppError::unauthenticated("Malformed Authorization header")
    })?;

    match state.auth_manager.verify_token(token) {
        Ok(claims) => {
            tracing::debug!(subject = %claims.sub, path = %path, "Token verified");
            Ok(next.run(request).await)
        }
        Err(AuthError::Expired) => {
            tracing::warn!(path = %path, "Rejected expired token");
            Err(AppError::unauthenticated("Token expired"))
        }
        Err(AuthError::Invalid) => {
            tracing::warn!(path = %path, "Rejected invalid token");
            Err(AppError::unauthenticated("Invalid token"))
        }
    }
}

/// Check if a path is public (doesn't require authentication)
fn is_public_path(path: &str) -> bool {
    matches!(path, "/" | "/health" | "/auth/login")
        || path.starts_with("/health/")
        // Login/signup/oauth flows under the user service stay reachable
        // for clients that do not hold a token yet
        || path.starts_with("/api/users/auth/")
        || path.starts_with("/api/users/login/")
        || path.starts_with("/api/users/oauth2/authorization/")
}
