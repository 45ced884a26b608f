use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Numeric columns of a price row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Open,
        Field::High,
        Field::Low,
        Field::Close,
        Field::Volume,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Open => "open",
            Field::High => "high",
            Field::Low => "low",
            Field::Close => "close",
            Field::Volume => "volume",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One trading day for a symbol.
///
/// Rows built from the market-data API always carry every field. Rows read
/// back from the store only carry the fields that were actually persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl PriceRow {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
        }
    }

    /// A row with a date and no fields yet (used while pivoting store records)
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
        }
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::Open => self.open,
            Field::High => self.high,
            Field::Low => self.low,
            Field::Close => self.close,
            Field::Volume => self.volume,
        }
    }

    pub fn set(&mut self, field: Field, value: f64) {
        let slot = match field {
            Field::Open => &mut self.open,
            Field::High => &mut self.high,
            Field::Low => &mut self.low,
            Field::Close => &mut self.close,
            Field::Volume => &mut self.volume,
        };
        *slot = Some(value);
    }

    /// Present fields in column order
    pub fn fields(&self) -> impl Iterator<Item = (Field, f64)> + '_ {
        Field::ALL
            .into_iter()
            .filter_map(move |f| self.get(f).map(|v| (f, v)))
    }
}

/// Daily price rows for one symbol, strictly increasing by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    rows: Vec<PriceRow>,
}

impl Series {
    /// Sorts rows by date and collapses duplicate dates; the last row given
    /// for a date wins.
    pub fn new(mut rows: Vec<PriceRow>) -> Self {
        // stable, so input order decides which duplicate is "last"
        rows.sort_by_key(|r| r.date);

        let mut deduped: Vec<PriceRow> = Vec::with_capacity(rows.len());
        for row in rows {
            match deduped.last_mut() {
                Some(last) if last.date == row.date => *last = row,
                _ => deduped.push(row),
            }
        }

        Self { rows: deduped }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<PriceRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    /// A column is present when the series has rows and every row carries it
    pub fn has_column(&self, field: Field) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|r| r.get(field).is_some())
    }

    pub fn require_column(&self, field: Field) -> Result<(), AppError> {
        if self.has_column(field) {
            Ok(())
        } else {
            Err(AppError::data_shape(format!(
                "Historical data not found or missing '{}' field.",
                field
            )))
        }
    }

    /// Values of one column in date order
    pub fn column(&self, field: Field) -> Result<Vec<f64>, AppError> {
        self.require_column(field)?;
        Ok(self.rows.iter().filter_map(|r| r.get(field)).collect())
    }
}

/// Size mode of an upstream daily series request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputSize {
    #[default]
    Compact, // latest 100 data points
    Full,    // full available history
}

impl OutputSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputSize::Compact => "compact",
            OutputSize::Full => "full",
        }
    }
}

impl FromStr for OutputSize {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" => Ok(OutputSize::Compact),
            "full" => Ok(OutputSize::Full),
            other => Err(AppError::input(format!(
                "Invalid outputsize '{}'. Use 'compact' or 'full'",
                other
            ))),
        }
    }
}

/// Inclusive calendar-date range used to filter stored records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl QueryWindow {
    pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;

    pub fn between(start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        if start > end {
            return Err(AppError::input(
                "start_date must be before or equal to end_date",
            ));
        }
        Ok(Self { start, end })
    }

    /// The `days` days up to and including `today`
    pub fn last_days(days: u32, today: NaiveDate) -> Self {
        Self {
            start: today - Duration::days(i64::from(days)),
            end: today,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn row(date: &str, close: f64) -> PriceRow {
        PriceRow::new(d(date), close, close, close, close, 1000.0)
    }

    #[test]
    fn series_is_sorted_and_deduplicated() {
        let series = Series::new(vec![
            row("2024-01-03", 3.0),
            row("2024-01-01", 1.0),
            row("2024-01-02", 2.0),
            row("2024-01-01", 1.5),
        ]);

        let dates: Vec<_> = series.rows().iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-03")]);
        // later duplicate replaces the earlier one
        assert_eq!(series.rows()[0].close, Some(1.5));
    }

    #[test]
    fn missing_close_column_is_a_data_shape_error() {
        let mut partial = PriceRow::empty(d("2024-01-01"));
        partial.set(Field::Open, 10.0);
        let series = Series::new(vec![partial]);

        assert!(!series.has_column(Field::Close));
        assert!(matches!(
            series.require_column(Field::Close),
            Err(AppError::DataShape(_))
        ));
    }

    #[test]
    fn empty_series_has_no_columns() {
        assert!(!Series::empty().has_column(Field::Close));
        assert_eq!(Series::empty().last_date(), None);
    }

    #[test]
    fn row_serializes_only_present_fields() {
        let mut r = PriceRow::empty(d("2024-01-10"));
        r.set(Field::Close, 185.5);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json, serde_json::json!({ "date": "2024-01-10", "close": 185.5 }));
    }

    #[test]
    fn output_size_parses_case_insensitively() {
        assert_eq!("FULL".parse::<OutputSize>().unwrap(), OutputSize::Full);
        assert_eq!(" compact ".parse::<OutputSize>().unwrap(), OutputSize::Compact);
        assert!(matches!("weekly".parse::<OutputSize>(), Err(AppError::Input(_))));
    }

    #[test]
    fn query_window_rejects_inverted_range() {
        assert!(QueryWindow::between(d("2024-02-01"), d("2024-01-01")).is_err());

        let window = QueryWindow::last_days(30, d("2024-01-31"));
        assert_eq!(window.start, d("2024-01-01"));
        assert!(window.contains(d("2024-01-31")));
        assert!(!window.contains(d("2023-12-31")));
    }
}
