use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

use crate::response::ApiResponse;

pub type AppResult<T> = Result<T, AppError>;

/// Application error taxonomy.
///
/// Every failure that terminates a request early is classified into one of
/// these kinds before it reaches the client; nothing unclassified crosses the
/// boundary. Upstream 4xx responses are relayed verbatim by the forwarder and
/// never become an `AppError`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing, malformed, invalid or expired credential on a protected route
    #[error("authentication failed: {0}")]
    Unauthenticated(String),

    /// Fixed-window quota exhausted and no active subscription
    #[error("rate limit exceeded")]
    RateLimited,

    /// No route prefix matches the inbound path
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed request body or parameters
    #[error("validation error: {0}")]
    Validation(String),

    /// Upstream returned a 5xx response
    #[error("upstream server error: {0}")]
    UpstreamServer(String),

    /// Connection failure or timeout reaching an upstream or dependency
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Any unclassified failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamServer(_) => StatusCode::BAD_GATEWAY,
            AppError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Envelope `message` label for this error kind
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "Unauthorized",
            AppError::RateLimited => "Rate limit exceeded",
            AppError::NotFound(_) => "Resource not found",
            AppError::Validation(_) => "Bad request",
            AppError::UpstreamServer(_) => "Bad gateway",
            AppError::UpstreamUnavailable(_) => "Service unavailable",
            AppError::Internal(_) => "Internal server error",
        }
    }

    /// Envelope `error` detail; internal details never leak for 5xx
    fn detail(&self) -> String {
        match self {
            AppError::Unauthenticated(msg) => msg.clone(),
            AppError::RateLimited => "Too many requests, retry after the current window".to_string(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::UpstreamServer(_) => "Upstream service returned an error".to_string(),
            AppError::UpstreamUnavailable(_) => {
                "Upstream service is unreachable or timed out".to_string()
            }
            AppError::Internal(_) => {
                "An unexpected error occurred. Please try again later.".to_string()
            }
        }
    }

    /// Log this error with appropriate level and context
    pub fn log(&self) {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else if matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::TOO_MANY_REQUESTS
        ) {
            tracing::warn!(error = %self, status = status.as_u16(), "Request rejected");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Client error");
        }
    }

    /// Create an authentication error
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        AppError::Unauthenticated(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Create an internal server error
    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        self.log();

        let status = self.status_code();
        let envelope: ApiResponse<serde_json::Value> =
            ApiResponse::failure(status.as_u16(), self.user_message(), self.detail());

        (status, Json(envelope)).into_response()
    }
}
