// ============================================================================
// Gateway Configuration
// ============================================================================
//
// All configuration is read once from the environment at startup and kept
// immutable behind Arc for the process lifetime. Components receive the
// sections they need at construction time.
//
// ============================================================================

use anyhow::{Context, Result};

/// Rate limiting configuration
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Maximum requests per window for non-subscribed clients (default: 60)
    pub requests_per_minute: i64,
    /// Window length in seconds (default: 60)
    pub window_secs: u64,
}

impl RateLimitConfig {
    fn from_env() -> Self {
        Self {
            requests_per_minute: std::env::var("RATE_LIMIT_REQUESTS_PER_MINUTE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            window_secs: std::env::var("RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
        }
    }
}

/// Upstream microservices configuration
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    /// User Service URL (e.g., "http://user-service:8001" or "http://localhost:8001")
    pub user_service_url: String,
    /// Core Service URL (e.g., "http://core-service:8002")
    pub core_service_url: String,
    /// Streaming Service URL (e.g., "http://streaming-service:8003")
    pub streaming_service_url: String,
    /// Messaging Service URL (e.g., "http://messaging-service:8004")
    pub messaging_service_url: String,
    /// Service discovery mode: "static" | "dns" (default: "static")
    pub discovery_mode: String,
    /// Timeout for upstream requests in seconds (default: 30)
    pub service_timeout_secs: u64,
}

impl UpstreamConfig {
    fn from_env() -> Self {
        Self {
            user_service_url: std::env::var("USER_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8001".to_string()),
            core_service_url: std::env::var("CORE_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8002".to_string()),
            streaming_service_url: std::env::var("STREAMING_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8003".to_string()),
            messaging_service_url: std::env::var("MESSAGING_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8004".to_string()),
            discovery_mode: std::env::var("SERVICE_DISCOVERY_MODE")
                .unwrap_or_else(|_| "static".to_string()),
            service_timeout_secs: std::env::var("SERVICE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

/// Gateway configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Port the gateway listens on (default: 8080)
    pub port: u16,
    /// Shared secret for HS256 token signing and verification (required)
    pub jwt_secret: String,
    /// Issuer claim stamped into and required from tokens
    pub jwt_issuer: String,
    /// Access token lifetime in seconds (default: 3600)
    pub access_token_ttl_secs: i64,
    /// Username accepted by the local login endpoint
    pub admin_username: String,
    /// Password accepted by the local login endpoint
    pub admin_password: String,
    /// Redis URL for the counter store; unset falls back to the in-memory store
    pub redis_url: Option<String>,
    pub rate_limit: RateLimitConfig,
    pub upstreams: UpstreamConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .context("JWT_SECRET must be set (shared HS256 signing secret)")?;
        if jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        Ok(Self {
            port: std::env::var("GATEWAY_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            jwt_secret,
            jwt_issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "portico".to_string()),
            access_token_ttl_secs: std::env::var("ACCESS_TOKEN_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
            admin_username: std::env::var("GATEWAY_ADMIN_USERNAME")
                .unwrap_or_else(|_| "admin".to_string()),
            admin_password: std::env::var("GATEWAY_ADMIN_PASSWORD").unwrap_or_default(),
            redis_url: std::env::var("REDIS_URL").ok(),
            rate_limit: RateLimitConfig::from_env(),
            upstreams: UpstreamConfig::from_env(),
        })
    }
}
