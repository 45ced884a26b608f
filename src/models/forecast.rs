use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One projected closing price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Projected closing prices on consecutive calendar days
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForecastResult {
    pub points: Vec<ForecastPoint>,
}

impl ForecastResult {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    /// `{"YYYY-MM-DD": value}`; ISO dates keep the map in date order
    pub fn to_date_map(&self) -> BTreeMap<String, f64> {
        self.points
            .iter()
            .map(|p| (p.date.format("%Y-%m-%d").to_string(), p.value))
            .collect()
    }
}
