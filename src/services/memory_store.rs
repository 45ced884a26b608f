use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use crate::error::AppError;
use crate::models::price::{PriceRow, QueryWindow, Series};
use crate::models::symbol::Symbol;
use crate::services::store::PriceStore;

/// In-process store for local runs without InfluxDB.
///
/// Follows the same upsert rule as the real store: a write to an existing
/// (symbol, date) replaces the written fields only.
#[derive(Default)]
pub struct MemoryStore {
    series: RwLock<HashMap<Symbol, BTreeMap<NaiveDate, PriceRow>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows for a symbol, across all dates
    pub fn row_count(&self, symbol: &Symbol) -> usize {
        self.series.read().get(symbol).map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl PriceStore for MemoryStore {
    async fn write_series(&self, symbol: &Symbol, series: &Series) -> Result<usize, AppError> {
        let mut guard = self.series.write();
        let stored = guard.entry(symbol.clone()).or_default();

        for row in series.rows() {
            let slot = stored
                .entry(row.date)
                .or_insert_with(|| PriceRow::empty(row.date));
            for (field, value) in row.fields() {
                slot.set(field, value);
            }
        }

        tracing::debug!("Stored {} rows for {} in memory", series.len(), symbol);
        Ok(series.len())
    }

    async fn query_series(&self, symbol: &Symbol, window: QueryWindow) -> Result<Series, AppError> {
        let guard = self.series.read();
        let rows = guard
            .get(symbol)
            .map(|stored| {
                stored
                    .range(window.start..=window.end)
                    .map(|(_, row)| row.clone())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Series::new(rows))
    }

    async fn health(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
