use async_trait::async_trait;

use crate::error::AppError;
use crate::models::price::{QueryWindow, Series};
use crate::models::symbol::Symbol;

/// Time-series persistence for daily price series.
///
/// One record per row: tagged with the symbol, timestamped at midnight UTC of
/// the row's date. Writing a date that already exists overwrites the fields
/// that were written and keeps the others.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Persist every row of `series`, returning the number of rows written.
    /// Rows written before a failure stay committed.
    async fn write_series(&self, symbol: &Symbol, series: &Series) -> Result<usize, AppError>;

    /// Rows for `symbol` inside `window`, sorted by date. No matches is an
    /// empty series, not an error.
    async fn query_series(&self, symbol: &Symbol, window: QueryWindow) -> Result<Series, AppError>;

    async fn health(&self) -> Result<(), AppError>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}
