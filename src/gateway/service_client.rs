// ============================================================================
// Service Client
// ============================================================================
//
// HTTP client for the backend services. Handles:
// - Request forwarding with the outbound header set
// - Response relaying (2xx/3xx/4xx pass through unchanged)
// - Failure translation (5xx -> 502, connect/timeout -> 503, other -> 500)
//
// No retries at this layer.
//
// ============================================================================

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Response};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const HEADER_CORRELATION_ID: &str = "x-correlation-id";
const HEADER_FORWARDED_USER_AGENT: &str = "x-forwarded-user-agent";
const HEADER_FORWARDED_FOR: &str = "x-forwarded-for";

/// HTTP client for forwarding requests to backend services
#[derive(Clone)]
pub struct ServiceClient {
    client: reqwest::Client,
}

impl ServiceClient {
    pub fn new(timeout_secs: u64) -> Self {
        // Connection pooling and keep-alive
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Forward a request to `base_url` + `path_and_query` and relay the
    /// upstream response.
    ///
    /// Upstream 4xx responses are relayed with the upstream's status and
    /// body; 5xx responses and transport failures are translated into the
    /// error taxonomy instead.
    pub async fn forward(
        &self,
        base_url: &str,
        path_and_query: &str,
        method: Method,
        headers: HeaderMap,
        body: Bytes,
    ) -> AppResult<Response<Body>> {
        let url = format!("{}{}", base_url, path_and_query);

        let mut request = self.client.request(method.clone(), &url).headers(headers);
        if !body.is_empty() {
            request = request.body(body);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_server_error() {
                    tracing::error!(
                        method = %method,
                        url = %url,
                        status = status.as_u16(),
                        "Upstream returned server error"
                    );
                    return Err(AppError::UpstreamServer(format!(
                        "{} returned {}",
                        url, status
                    )));
                }

                let mut relayed = Response::builder().status(status);
                for (key, value) in response.headers() {
                    relayed = relayed.header(key, value);
                }

                let body_bytes = response
                    .bytes()
                    .await
                    .map_err(|e| AppError::internal(format!("Failed to read upstream body: {}", e)))?;

                relayed
                    .body(Body::from(body_bytes))
                    .map_err(|e| AppError::internal(format!("Failed to build response: {}", e)))
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                tracing::error!(method = %method, url = %url, error = %e, "Upstream unreachable");
                Err(AppError::UpstreamUnavailable(e.to_string()))
            }
            Err(e) => {
                tracing::error!(method = %method, url = %url, error = %e, "Upstream call failed");
                Err(AppError::internal(e.to_string()))
            }
        }
    }

    /// GET a JSON document from a backend service.
    ///
    /// Returns `Ok(None)` for any non-2xx response; transport failures
    /// surface as errors for the caller to classify.
    pub async fn get_json(
        &self,
        base_url: &str,
        path: &str,
        headers: HeaderMap,
    ) -> AppResult<Option<serde_json::Value>> {
        let url = format!("{}{}", base_url, path);

        let response = self
            .client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    AppError::UpstreamUnavailable(e.to_string())
                } else {
                    AppError::internal(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            tracing::debug!(url = %url, status = response.status().as_u16(), "Lookup returned non-success");
            return Ok(None);
        }

        let value = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| AppError::internal(format!("Failed to parse response from {}: {}", url, e)))?;
        Ok(Some(value))
    }

    /// Check if a service answers its health endpoint
    pub async fn check_health(&self, base_url: &str) -> bool {
        let health_url = format!("{}/health", base_url);
        match self
            .client
            .get(&health_url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(url = %health_url, error = %e, "Service health check failed");
                false
            }
        }
    }
}

/// Build the outbound header set for a forwarded request.
///
/// Always sets Content-Type; propagates Authorization verbatim; propagates
/// or generates X-Correlation-ID; maps the inbound User-Agent to
/// X-Forwarded-User-Agent; carries the computed client IP as
/// X-Forwarded-For.
pub fn build_forward_headers(inbound: &HeaderMap, client_ip: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );

    if let Some(auth) = inbound.get(header::AUTHORIZATION) {
        headers.insert(header::AUTHORIZATION, auth.clone());
    }

    let correlation_id = inbound
        .get(HEADER_CORRELATION_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        headers.insert(HeaderName::from_static(HEADER_CORRELATION_ID), value);
    }

    if let Some(user_agent) = inbound.get(header::USER_AGENT) {
        headers.insert(
            HeaderName::from_static(HEADER_FORWARDED_USER_AGENT),
            user_agent.clone(),
        );
    }

    if let Ok(value) = HeaderValue::from_str(client_ip) {
        headers.insert(HeaderName::from_static(HEADER_FORWARDED_FOR), value);
    }

    headers
}
