use std::sync::Arc;

use anyhow::{Error, Result};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use campaign_service::{
    api::{AppState, run_api_server},
    clients::{database::DatabaseClient, gateway::EvolutionClient, health::HealthChecker},
    config::Config,
    engine::CampaignEngine,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load()?;

    let store = Arc::new(DatabaseClient::connect(&config.database_url).await?);
    store.run_migrations().await?;

    let gateway = Arc::new(EvolutionClient::new(&config)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (engine, dispatcher) =
        CampaignEngine::new(gateway.clone(), store.clone(), shutdown_rx.clone());
    tokio::spawn(dispatcher.run());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let state = Arc::new(AppState {
        engine,
        gateway,
        store,
        health_checker: HealthChecker::new(config.clone()),
        media_limits: config.media_limits(),
        default_delay_seconds: config.default_delay_seconds,
    });

    run_api_server(config, state, shutdown_rx).await
}
