use crate::error::AppError;
use crate::models::price::OutputSize;
use crate::models::symbol::Symbol;
use crate::services::market_data::MarketDataSource;
use crate::services::store::PriceStore;

/// Fetch a symbol's daily series and persist it; returns rows written.
///
/// Not atomic: if the store fails midway, rows already written stay.
pub async fn ingest_symbol(
    market_data: &dyn MarketDataSource,
    store: &dyn PriceStore,
    symbol: &Symbol,
    size: OutputSize,
) -> Result<usize, AppError> {
    let series = market_data.fetch_daily(symbol, size).await?;
    let written = store.write_series(symbol, &series).await?;

    tracing::info!(
        "Ingested {} rows for {} into {} store",
        written,
        symbol,
        store.name()
    );
    Ok(written)
}
