// src/lib.rs

use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::{AppConfig, StoreBackend};
use error::AppError;
use services::{
    alpha_vantage::AlphaVantageClient, forecast::ForecastEngine, influx::InfluxStore,
    market_data::MarketDataSource, memory_store::MemoryStore, store::PriceStore,
};

/// Collaborators shared by every handler; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub market_data: Arc<dyn MarketDataSource>,
    pub store: Arc<dyn PriceStore>,
    pub forecaster: ForecastEngine,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        market_data: Arc<dyn MarketDataSource>,
        store: Arc<dyn PriceStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            market_data,
            store,
            forecaster: ForecastEngine::default(),
            config: Arc::new(config),
        }
    }

    /// Wire the real Alpha Vantage client and the configured store
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AppError::validation(format!("Failed to build HTTP client: {}", e)))?;

        let market_data = AlphaVantageClient::new(
            client.clone(),
            config.alpha_vantage_api_key.clone(),
            config.alpha_vantage_base_url.clone(),
        );

        let store: Arc<dyn PriceStore> = match config.store_backend {
            StoreBackend::Influx => Arc::new(InfluxStore::from_config(client, &config)),
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };

        Ok(Self::new(Arc::new(market_data), store, config))
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index::index_page))
        .route("/fetch", post(handlers::fetch::fetch_symbol))
        .route("/history", get(handlers::history::get_history))
        .route("/forecast", get(handlers::forecast::get_forecast))
        .route("/visualize", get(handlers::visualize::visualize_history))
        .route("/health", get(handlers::health::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub mod config;
pub mod error;

pub mod services {
    pub mod alpha_vantage;
    pub mod chart;
    pub mod forecast;
    pub mod influx;
    pub mod ingest;
    pub mod market_data;
    pub mod memory_store;
    pub mod store;
}

pub mod models;
pub mod handlers;
pub mod jobs;
