// ============================================================================
// Gateway Router
// ============================================================================
//
// Routes requests to backend services based on path prefix:
// - /api/users/**     -> user-service
// - /api/core/**      -> core-service
// - /api/streaming/** -> streaming-service
// - /api/messaging/** -> messaging-service
//
// The longest matching prefix wins and is stripped before forwarding.
// Anything else is a local 404.
//
// ============================================================================

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::Response;

use super::discovery::{create_service_discovery, ServiceDiscovery};
use super::rate_limit::RateLimiter;
use super::service_client::{build_forward_headers, ServiceClient};
use super::subscription::SubscriptionResolver;
use super::Service;
use crate::auth::AuthManager;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::store::CounterStore;
use crate::utils::client_ip_from_request;

/// Forwarded bodies are buffered; reject anything unreasonable.
const MAX_FORWARD_BODY_BYTES: usize = 10 * 1024 * 1024;

struct Route {
    prefix: &'static str,
    service: Service,
}

/// Static path-prefix route table, immutable for the process lifetime
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn standard() -> Self {
        Self {
            routes: vec![
                Route {
                    prefix: "/api/users",
                    service: Service::User,
                },
                Route {
                    prefix: "/api/core",
                    service: Service::Core,
                },
                Route {
                    prefix: "/api/streaming",
                    service: Service::Streaming,
                },
                Route {
                    prefix: "/api/messaging",
                    service: Service::Messaging,
                },
            ],
        }
    }

    /// Match `path` against the longest configured prefix. Returns the
    /// target service and the path with the prefix stripped.
    pub fn resolve(&self, path: &str) -> Option<(Service, String)> {
        let mut best: Option<&Route> = None;
        for route in &self.routes {
            if let Some(rest) = path.strip_prefix(route.prefix) {
                // Prefix must end on a segment boundary: /api/usersearch
                // must not match /api/users
                if !rest.is_empty() && !rest.starts_with('/') {
                    continue;
                }
                if best.is_none_or(|b| route.prefix.len() > b.prefix.len()) {
                    best = Some(route);
                }
            }
        }
        best.map(|route| (route.service, path[route.prefix.len()..].to_string()))
    }
}

/// Shared state for the gateway pipeline
pub struct GatewayState {
    pub config: Arc<Config>,
    pub auth_manager: Arc<AuthManager>,
    pub discovery: Arc<dyn ServiceDiscovery>,
    pub service_client: ServiceClient,
    pub routes: RouteTable,
    pub rate_limiter: RateLimiter,
}

impl GatewayState {
    pub fn new(config: Arc<Config>, store: Arc<dyn CounterStore>) -> Arc<Self> {
        let auth_manager = Arc::new(AuthManager::new(&config));
        let discovery: Arc<dyn ServiceDiscovery> =
            create_service_discovery(Arc::new(config.upstreams.clone())).into();
        let service_client = ServiceClient::new(config.upstreams.service_timeout_secs);
        let subscriptions =
            SubscriptionResolver::new(store.clone(), service_client.clone(), discovery.clone());
        let rate_limiter = RateLimiter::new(store, subscriptions, &config.rate_limit);

        Arc::new(Self {
            config,
            auth_manager,
            discovery,
            service_client,
            routes: RouteTable::standard(),
            rate_limiter,
        })
    }
}

/// Fallback handler: forward the request to the service owning its prefix
pub async fn route_request(
    State(state): State<Arc<GatewayState>>,
    request: Request,
) -> AppResult<Response<Body>> {
    let path = request.uri().path().to_string();

    let Some((service, upstream_path)) = state.routes.resolve(&path) else {
        return Err(AppError::NotFound(format!("No route for {}", path)));
    };

    let base_url = state.discovery.resolve(service).map_err(|e| {
        tracing::error!(error = %e, service = service.name(), "Failed to resolve service address");
        AppError::UpstreamUnavailable(e.to_string())
    })?;

    let method = request.method().clone();
    let path_and_query = match request.uri().query() {
        Some(query) => format!("{}?{}", upstream_path, query),
        None => upstream_path,
    };

    let client_ip = client_ip_from_request(&request);
    let headers = build_forward_headers(request.headers(), &client_ip);

    let body = axum::body::to_bytes(request.into_body(), MAX_FORWARD_BODY_BYTES)
        .await
        .map_err(|e| AppError::validation(format!("Failed to read request body: {}", e)))?;

    match state
        .service_client
        .forward(&base_url, &path_and_query, method.clone(), headers, body)
        .await
    {
        Ok(response) => Ok(response),
        Err(e) => {
            tracing::error!(
                method = %method,
                path = %path,
                service = service.name(),
                "Failed to forward request"
            );
            Err(e)
        }
    }
}
