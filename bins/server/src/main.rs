//! Bóveda API Server
//!
//! Main entry point for the vault ledger service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boveda_api::{AppState, create_router};
use boveda_db::VaultLedger;
use boveda_shared::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boveda=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let ledger = VaultLedger::in_memory(&config)
        .await
        .context("Failed to seed vaults")?;
    info!(
        vaults = config.vaults.len(),
        threshold_pct = %config.ledger.reconciliation.match_threshold_pct,
        step_timeout_ms = config.ledger.saga_step_timeout_ms,
        "Ledger ready"
    );

    let app = create_router(AppState {
        ledger: Arc::new(ledger),
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // no signal handler; run until killed
        std::future::pending::<()>().await;
    }
}
