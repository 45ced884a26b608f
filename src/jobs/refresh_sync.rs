use std::time::Duration;
use tokio::time::interval;

use crate::models::price::OutputSize;
use crate::models::symbol::Symbol;
use crate::services::ingest::ingest_symbol;
use crate::AppState;

// Alpha Vantage free tier allows 5 requests per minute
const SYMBOL_DELAY: Duration = Duration::from_secs(12);

/// Re-ingest `config.refresh_symbols` on `config.refresh_interval`.
/// Failures are logged and the job moves on to the next symbol.
pub async fn start_refresh_sync_job(state: AppState) {
    let symbols = parse_symbols(&state.config.refresh_symbols);
    if symbols.is_empty() {
        tracing::info!("No refresh symbols configured, refresh job disabled");
        return;
    }

    tokio::spawn(async move {
        let mut interval = interval(state.config.refresh_interval);

        loop {
            // first tick completes immediately, so this also runs on startup
            interval.tick().await;
            tracing::info!("Starting scheduled refresh for {} symbols", symbols.len());
            sync_symbols(&state, &symbols).await;
        }
    });
}

async fn sync_symbols(state: &AppState, symbols: &[Symbol]) {
    for (i, symbol) in symbols.iter().enumerate() {
        match ingest_symbol(
            state.market_data.as_ref(),
            state.store.as_ref(),
            symbol,
            OutputSize::Compact,
        )
        .await
        {
            Ok(count) => tracing::info!("Refreshed {} rows for {}", count, symbol),
            Err(e) => tracing::error!("Failed to refresh {}: {}", symbol, e),
        }

        if i + 1 < symbols.len() {
            tokio::time::sleep(SYMBOL_DELAY).await;
        }
    }

    tracing::info!("Scheduled refresh complete");
}

fn parse_symbols(raw: &[String]) -> Vec<Symbol> {
    let mut symbols: Vec<Symbol> = raw
        .iter()
        .filter_map(|s| match Symbol::parse(s) {
            Ok(symbol) => Some(symbol),
            Err(e) => {
                tracing::warn!("Skipping refresh symbol '{}': {}", s, e);
                None
            }
        })
        .collect();
    symbols.sort();
    symbols.dedup();
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::models::price::{PriceRow, QueryWindow, Series};
    use crate::services::market_data::MarketDataSource;
    use crate::error::AppError;
    use crate::services::memory_store::MemoryStore;
    use crate::services::store::PriceStore;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Arc;

    struct OneDay;

    #[async_trait]
    impl MarketDataSource for OneDay {
        async fn fetch_daily(&self, symbol: &Symbol, _size: OutputSize) -> Result<Series, AppError> {
            if symbol.as_str() == "FAIL" {
                return Err(AppError::upstream("Invalid API call."));
            }
            let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
            Ok(Series::new(vec![PriceRow::new(date, 1.0, 2.0, 0.5, 1.5, 100.0)]))
        }
    }

    #[test]
    fn parse_symbols_normalizes_and_drops_invalid() {
        let raw: Vec<String> = ["msft", "AAPL", "bad symbol", "MSFT"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let symbols: Vec<String> = parse_symbols(&raw).iter().map(|s| s.to_string()).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_symbol_does_not_stop_the_run() {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(Arc::new(OneDay), store.clone(), AppConfig::default());
        let symbols = vec![Symbol::parse("FAIL").unwrap(), Symbol::parse("IBM").unwrap()];

        sync_symbols(&state, &symbols).await;

        let ibm = Symbol::parse("IBM").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let window = QueryWindow::between(date, date).unwrap();
        assert_eq!(store.query_series(&ibm, window).await.unwrap().len(), 1);
    }
}
