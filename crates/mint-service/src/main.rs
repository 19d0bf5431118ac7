//! Mint Service
//!
//! HTTP service that mints against verified zero-knowledge burn proofs

use anyhow::{Context, Result};
use mint_service::{create_router, AppState, Config, MintService};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mint_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mint Service...");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Replay store: {:?}", config.store_backend);
    info!("Ledger: {:?}", config.ledger_backend);
    info!("Verifier: {}", config.verifier_command.join(" "));

    let service = MintService::from_config(&config)
        .await
        .context("Failed to initialize mint service")?;
    service
        .health_check()
        .await
        .context("Replay store health check failed")?;

    let app = create_router(AppState::new(service, config.request_timeout()));

    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Mint Service running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Mint Service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
