use async_trait::async_trait;

use crate::error::AppError;
use crate::models::price::{OutputSize, Series};
use crate::models::symbol::Symbol;

/// Source of daily OHLCV series
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// One upstream request; the returned series carries every field on every row.
    async fn fetch_daily(&self, symbol: &Symbol, size: OutputSize) -> Result<Series, AppError>;
}
