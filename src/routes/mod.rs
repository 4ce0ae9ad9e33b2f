// ============================================================================
// Router Assembly
// ============================================================================
//
// Local endpoints plus the forwarding fallback, wrapped in the pipeline
// middleware. Stage order is fixed for every request:
//
//   trace -> request logging -> rate limiting -> authentication -> routing
//
// ServiceBuilder applies layers top-down, so the first layer is outermost.
//
// ============================================================================

mod auth;
mod health;
mod middleware;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::gateway::{router::route_request, GatewayState};

/// Create the gateway router with all routes and pipeline middleware
pub fn create_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        // Local endpoints
        .route("/", get(health::welcome))
        .route("/health", get(health::health))
        .route("/health/{service}", get(health::upstream_health))
        .route("/auth/login", post(auth::login))
        // Everything else is matched against the route table and forwarded
        .fallback(route_request)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    middleware::rate_limiting,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    middleware::authentication,
                )),
        )
        .with_state(state)
}
