//! Storefront Service - purchase engine HTTP API
//!
//! This is the main entry point for the storefront service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_service::{create_router, AppState, ServiceConfig};
use storefront_store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,storefront=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Storefront Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        database_configured = %config.database_url.is_some(),
        isolation = %config.database_isolation,
        badge_webhook_configured = %config.badge_webhook_url.is_some(),
        purchase_timeout_ms = %config.purchase_timeout_ms,
        "Service configuration loaded"
    );

    let store: Arc<dyn Store> = if let Some(url) = &config.database_url {
        tracing::info!(
            max_connections = %config.database_max_connections,
            "Connecting to PostgreSQL"
        );
        let store = PgStore::connect(url, config.database_max_connections)
            .await?
            .with_isolation(config.database_isolation);
        store.migrate().await?;
        Arc::new(store)
    } else {
        tracing::warn!("DATABASE_URL not set - using in-memory store, state is lost on exit");
        Arc::new(MemoryStore::new())
    };

    // Build app state
    let state = AppState::new(store, config.clone());

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
