use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use portico::config::Config;
use portico::gateway::GatewayState;
use portico::routes;
use portico::store::{CounterStore, MemoryCounterStore, RedisCounterStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let store: Arc<dyn CounterStore> = match config.redis_url.as_deref() {
        Some(url) => {
            let store = RedisCounterStore::connect(url)
                .await
                .context("Failed to connect to Redis")?;
            tracing::info!("Connected to Redis counter store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("REDIS_URL not set, using the in-memory counter store (single node only)");
            Arc::new(MemoryCounterStore::new())
        }
    };

    let state = GatewayState::new(config.clone(), store);
    let app = routes::create_router(state);

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Portico gateway listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutdown signal received");
    })
    .await?;

    Ok(())
}
