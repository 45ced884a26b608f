use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::AppError;
use crate::models::price::{OutputSize, PriceRow, QueryWindow};

pub const DEFAULT_FORECAST_STEPS: usize = 10;
pub const MAX_FORECAST_STEPS: usize = 365;
const MAX_LOOKBACK_DAYS: u32 = 36_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// `{status, message}` body used by /fetch and by every failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: ResponseStatus,
    pub message: String,
}

impl StatusResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub status: ResponseStatus,
    pub data: Vec<PriceRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub status: ResponseStatus,
    pub forecast: BTreeMap<String, f64>, // "YYYY-MM-DD" -> predicted close
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ResponseStatus,
    pub store: String,
}

/// Form body for POST /fetch
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchForm {
    pub symbol: Option<String>,
    pub outputsize: Option<String>, // "compact" (default) or "full"
}

impl FetchForm {
    pub fn output_size(&self) -> Result<OutputSize, AppError> {
        match non_blank(&self.outputsize) {
            Some(raw) => raw.parse(),
            None => Ok(OutputSize::default()),
        }
    }
}

/// Query parameters for GET /history
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub symbol: Option<String>,
    pub days: Option<String>,       // lookback in days, default 30
    pub start_date: Option<String>, // YYYY-MM-DD format
    pub end_date: Option<String>,   // YYYY-MM-DD format
}

impl HistoryQuery {
    pub fn window(&self, default_days: u32, today: NaiveDate) -> Result<QueryWindow, AppError> {
        resolve_window(
            &self.days,
            &self.start_date,
            &self.end_date,
            default_days,
            today,
        )
    }
}

/// Query parameters for GET /forecast
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastQuery {
    pub symbol: Option<String>,
    pub steps: Option<String>, // default 10
    pub days: Option<String>,  // history used for fitting
}

impl ForecastQuery {
    pub fn steps(&self) -> Result<usize, AppError> {
        let Some(raw) = non_blank(&self.steps) else {
            return Ok(DEFAULT_FORECAST_STEPS);
        };

        match raw.parse::<usize>() {
            Ok(steps) if (1..=MAX_FORECAST_STEPS).contains(&steps) => Ok(steps),
            _ => Err(AppError::input(format!(
                "steps must be an integer between 1 and {}",
                MAX_FORECAST_STEPS
            ))),
        }
    }

    pub fn window(&self, default_days: u32, today: NaiveDate) -> Result<QueryWindow, AppError> {
        resolve_window(&self.days, &None, &None, default_days, today)
    }
}

/// Query parameters for GET /visualize
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisualizeQuery {
    pub symbol: Option<String>,
    pub days: Option<String>,
}

impl VisualizeQuery {
    pub fn window(&self, default_days: u32, today: NaiveDate) -> Result<QueryWindow, AppError> {
        resolve_window(&self.days, &None, &None, default_days, today)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(raw: &str, name: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::input(format!("Invalid {} format. Use YYYY-MM-DD", name)))
}

/// Explicit dates win over `days`; with neither, the last `default_days` days.
fn resolve_window(
    days: &Option<String>,
    start_date: &Option<String>,
    end_date: &Option<String>,
    default_days: u32,
    today: NaiveDate,
) -> Result<QueryWindow, AppError> {
    let start = non_blank(start_date)
        .map(|s| parse_date(s, "start_date"))
        .transpose()?;
    let end = non_blank(end_date)
        .map(|s| parse_date(s, "end_date"))
        .transpose()?;

    if start.is_some() || end.is_some() {
        let end = end.unwrap_or(today);
        let start = match start {
            Some(start) => start,
            None => end
                .checked_sub_days(Days::new(u64::from(default_days)))
                .ok_or_else(|| AppError::input(format!("end_date {} is out of range", end)))?,
        };
        return QueryWindow::between(start, end);
    }

    let days = match non_blank(days) {
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if (1..=MAX_LOOKBACK_DAYS).contains(&n) => n,
            _ => {
                return Err(AppError::input(format!(
                    "days must be an integer between 1 and {}",
                    MAX_LOOKBACK_DAYS
                )));
            }
        },
        None => default_days,
    };

    Ok(QueryWindow::last_days(days, today))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn steps_default_and_bounds() {
        let mut q = ForecastQuery::default();
        assert_eq!(q.steps().unwrap(), DEFAULT_FORECAST_STEPS);

        q.steps = Some("5".into());
        assert_eq!(q.steps().unwrap(), 5);

        for bad in ["0", "-3", "ten", "366"] {
            q.steps = Some(bad.into());
            assert!(matches!(q.steps(), Err(AppError::Input(_))), "{bad}");
        }
    }

    #[test]
    fn history_window_defaults_to_lookback() {
        let q = HistoryQuery::default();
        let window = q.window(30, d("2024-03-31")).unwrap();
        assert_eq!(window.start, d("2024-03-01"));
        assert_eq!(window.end, d("2024-03-31"));
    }

    #[test]
    fn explicit_dates_override_days() {
        let q = HistoryQuery {
            symbol: Some("AAPL".into()),
            days: Some("5".into()),
            start_date: Some("2024-01-01".into()),
            end_date: Some("2024-01-10".into()),
        };
        let window = q.window(30, d("2024-03-31")).unwrap();
        assert_eq!(window, QueryWindow::between(d("2024-01-01"), d("2024-01-10")).unwrap());
    }

    #[test]
    fn malformed_dates_are_input_errors() {
        let q = HistoryQuery {
            start_date: Some("01/02/2024".into()),
            ..Default::default()
        };
        assert_eq!(
            q.window(30, d("2024-03-31")),
            Err(AppError::input("Invalid start_date format. Use YYYY-MM-DD"))
        );
    }

    #[test]
    fn end_date_near_calendar_minimum_is_an_input_error() {
        let q = HistoryQuery {
            symbol: Some("IBM".into()),
            end_date: Some("-262143-01-15".into()),
            ..Default::default()
        };
        assert!(matches!(q.window(30, d("2024-01-01")), Err(AppError::Input(_))));

        // an explicit start keeps the window valid
        let q = HistoryQuery {
            start_date: Some("-262143-01-01".into()),
            ..q
        };
        assert!(q.window(30, d("2024-01-01")).is_ok());
    }

    #[test]
    fn status_body_shape() {
        let json = serde_json::to_value(StatusResponse::error("boom")).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "error", "message": "boom" }));
    }

    #[test]
    fn outputsize_defaults_to_compact() {
        let form = FetchForm {
            symbol: Some("IBM".into()),
            outputsize: None,
        };
        assert_eq!(form.output_size().unwrap(), OutputSize::Compact);
    }
}
