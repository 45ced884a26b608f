#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use chrono::{Days, NaiveDate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use stock_forecast_backend::config::{AppConfig, StoreBackend};
use stock_forecast_backend::error::AppError;
use stock_forecast_backend::models::price::{OutputSize, PriceRow, QueryWindow, Series};
use stock_forecast_backend::models::symbol::Symbol;
use stock_forecast_backend::services::market_data::MarketDataSource;
use stock_forecast_backend::services::store::PriceStore;
use stock_forecast_backend::{build_router, AppState};

/// Serve `app` on an ephemeral local port, returning its base URL
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });

    format!("http://{}", addr)
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("Invalid test date")
}

pub fn symbol(s: &str) -> Symbol {
    Symbol::parse(s).expect("Invalid test symbol")
}

/// Deterministic random walk starting near 100
pub fn random_walk(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    let mut price = 100.0;
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let noise = (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5;
            price += noise * 2.0;
            price
        })
        .collect()
}

/// One row per calendar day, the last one on `last`
pub fn series_ending(last: &str, closes: &[f64]) -> Series {
    let last = date(last);
    let n = closes.len() as u64;
    let rows = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let day = last
                .checked_sub_days(Days::new(n - 1 - i as u64))
                .expect("Date out of range");
            PriceRow::new(day, close - 0.5, close + 1.0, close - 1.0, close, 1_000_000.0)
        })
        .collect();
    Series::new(rows)
}

pub fn wide_window() -> QueryWindow {
    QueryWindow::between(date("2000-01-01"), date("2099-12-31")).unwrap()
}

/// Market-data double that returns a fixed series and counts calls
pub struct RecordingSource {
    series: Result<Series, AppError>,
    calls: AtomicUsize,
}

impl RecordingSource {
    pub fn returning(series: Series) -> Arc<Self> {
        Arc::new(Self {
            series: Ok(series),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(error: AppError) -> Arc<Self> {
        Arc::new(Self {
            series: Err(error),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for RecordingSource {
    async fn fetch_daily(&self, _symbol: &Symbol, _size: OutputSize) -> Result<Series, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.series.clone()
    }
}

/// Store double where every operation fails
pub struct FailingStore;

#[async_trait]
impl PriceStore for FailingStore {
    async fn write_series(&self, _symbol: &Symbol, _series: &Series) -> Result<usize, AppError> {
        Err(AppError::store_write("connection refused"))
    }

    async fn query_series(&self, _symbol: &Symbol, _window: QueryWindow) -> Result<Series, AppError> {
        Err(AppError::store_query("connection refused"))
    }

    async fn health(&self) -> Result<(), AppError> {
        Err(AppError::store_query("connection refused"))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        store_backend: StoreBackend::Memory,
        alpha_vantage_api_key: "test-key".to_string(),
        ..AppConfig::default()
    }
}

pub fn test_server(market_data: Arc<dyn MarketDataSource>, store: Arc<dyn PriceStore>) -> TestServer {
    let state = AppState::new(market_data, store, test_config());
    TestServer::new(build_router(state)).expect("Failed to start test server")
}
