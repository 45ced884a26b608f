use stock_forecast_backend::{
    build_router, config::AppConfig, jobs::refresh_sync::start_refresh_sync_job, AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    for name in config.placeholder_credentials() {
        tracing::warn!("{} is using its placeholder default; set it before deploying", name);
    }

    let bind_addr = config.bind_addr.clone();
    let state = AppState::from_config(config)?;
    tracing::info!("Using {} time-series store", state.store.name());

    // Background refresh (no-op when REFRESH_SYMBOLS is empty)
    start_refresh_sync_job(state.clone()).await;

    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
