use std::env;
use std::time::Duration;

use crate::error::AppError;

/// Which time-series backend the server talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Influx,
    Memory,
}

/// Service configuration read from the environment (and `.env`, if present).
///
/// Every credential has a placeholder default so the server starts locally;
/// real deployments must override them.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub log_level: String,

    // Market data
    pub alpha_vantage_api_key: String,
    pub alpha_vantage_base_url: String,
    pub http_timeout: Duration,

    // Time-series store
    pub store_backend: StoreBackend,
    pub influx_url: String,
    pub influx_token: String,
    pub influx_org: String,
    pub influx_bucket: String,
    pub influx_batch_size: usize,

    // Read paths
    pub history_lookback_days: u32,
    pub forecast_lookback_days: u32,

    // Background refresh, disabled when empty
    pub refresh_symbols: Vec<String>,
    pub refresh_interval: Duration,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_list(name: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let store_backend = match env_str("STORE_BACKEND", "influx").to_lowercase().as_str() {
            "influx" | "influxdb" => StoreBackend::Influx,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(AppError::validation(format!(
                    "Unknown STORE_BACKEND '{}'. Use 'influx' or 'memory'",
                    other
                )));
            }
        };

        Ok(Self {
            bind_addr: env_str("BIND_ADDR", "0.0.0.0:3000"),
            log_level: env_str("LOG_LEVEL", "debug").to_lowercase(),
            alpha_vantage_api_key: env_str("ALPHA_VANTAGE_API_KEY", "YOUR_ALPHA_VANTAGE_API_KEY"),
            alpha_vantage_base_url: env_str(
                "ALPHA_VANTAGE_BASE_URL",
                "https://www.alphavantage.co",
            ),
            http_timeout: Duration::from_secs(env_u64("HTTP_TIMEOUT_SECS", 30)),
            store_backend,
            influx_url: env_str("INFLUXDB_URL", "http://localhost:8086"),
            influx_token: env_str("INFLUXDB_TOKEN", "YOUR_INFLUXDB_TOKEN"),
            influx_org: env_str("INFLUXDB_ORG", "YOUR_ORG"),
            influx_bucket: env_str("INFLUXDB_BUCKET", "stock_data"),
            influx_batch_size: env_u64("INFLUXDB_BATCH_SIZE", 500).max(1) as usize,
            history_lookback_days: env_u32("HISTORY_LOOKBACK_DAYS", 30).max(1),
            forecast_lookback_days: env_u32("FORECAST_LOOKBACK_DAYS", 365).max(1),
            refresh_symbols: env_list("REFRESH_SYMBOLS"),
            refresh_interval: Duration::from_secs(env_u64("REFRESH_INTERVAL_SECS", 86_400).max(60)),
        })
    }

    /// Default tracing filter when RUST_LOG is not set
    pub fn log_filter(&self) -> String {
        format!("{level},stock_forecast_backend={level}", level = self.log_level)
    }

    pub fn placeholder_credentials(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.alpha_vantage_api_key == "YOUR_ALPHA_VANTAGE_API_KEY" {
            names.push("ALPHA_VANTAGE_API_KEY");
        }
        if self.store_backend == StoreBackend::Influx && self.influx_token == "YOUR_INFLUXDB_TOKEN" {
            names.push("INFLUXDB_TOKEN");
        }
        names
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            log_level: "debug".to_string(),
            alpha_vantage_api_key: "YOUR_ALPHA_VANTAGE_API_KEY".to_string(),
            alpha_vantage_base_url: "https://www.alphavantage.co".to_string(),
            http_timeout: Duration::from_secs(30),
            store_backend: StoreBackend::Influx,
            influx_url: "http://localhost:8086".to_string(),
            influx_token: "YOUR_INFLUXDB_TOKEN".to_string(),
            influx_org: "YOUR_ORG".to_string(),
            influx_bucket: "stock_data".to_string(),
            influx_batch_size: 500,
            history_lookback_days: 30,
            forecast_lookback_days: 365,
            refresh_symbols: Vec::new(),
            refresh_interval: Duration::from_secs(86_400),
        }
    }
}
