use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::AppError;
use crate::models::price::{OutputSize, PriceRow, Series};
use crate::models::symbol::Symbol;
use crate::services::market_data::MarketDataSource;

const TIME_SERIES_KEY: &str = "Time Series (Daily)";

// Keys the API uses instead of a series when it refuses a request
const UPSTREAM_MESSAGE_KEYS: [&str; 3] = ["Error Message", "Note", "Information"];

#[derive(Clone)]
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

impl AlphaVantageClient {
    pub fn new(client: Client, api_key: String, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MarketDataSource for AlphaVantageClient {
    async fn fetch_daily(&self, symbol: &Symbol, size: OutputSize) -> Result<Series, AppError> {
        tracing::info!(
            "Fetching daily series for {} ({}) from Alpha Vantage",
            symbol,
            size.as_str()
        );

        let url = format!("{}/query", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol.as_str()),
                ("apikey", self.api_key.as_str()),
                ("outputsize", size.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::upstream(format!("Error fetching data for {}: {}", symbol, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(format!(
                "Alpha Vantage API error {} for {}: {}",
                status, symbol, error_text
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            AppError::upstream(format!("Invalid response for {}: {}", symbol, e))
        })?;

        let series = parse_daily_series(symbol, &body)?;

        if let (Some(first), Some(last)) = (series.first_date(), series.last_date()) {
            tracing::info!(
                "Fetched {} daily rows for {} ({} to {})",
                series.len(),
                symbol,
                first,
                last
            );
        }

        Ok(series)
    }
}

/// Turn a `TIME_SERIES_DAILY` payload into a series sorted by date
pub fn parse_daily_series(symbol: &Symbol, body: &Value) -> Result<Series, AppError> {
    let Some(time_series) = body.get(TIME_SERIES_KEY) else {
        let detail = UPSTREAM_MESSAGE_KEYS
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string());
        return Err(AppError::upstream(format!(
            "Error fetching data for {}: {}",
            symbol, detail
        )));
    };

    let bars: BTreeMap<String, DailyBar> = serde_json::from_value(time_series.clone())
        .map_err(|e| AppError::upstream(format!("Unexpected series shape for {}: {}", symbol, e)))?;

    let rows = bars
        .into_iter()
        .map(|(date, bar)| {
            let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| {
                AppError::upstream(format!("Invalid date '{}' in series for {}", date, symbol))
            })?;
            Ok(PriceRow::new(
                date,
                parse_number(&bar.open, "open", date)?,
                parse_number(&bar.high, "high", date)?,
                parse_number(&bar.low, "low", date)?,
                parse_number(&bar.close, "close", date)?,
                parse_number(&bar.volume, "volume", date)?,
            ))
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(Series::new(rows))
}

fn parse_number(raw: &str, field: &str, date: NaiveDate) -> Result<f64, AppError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::upstream(format!("Invalid {} value '{}' on {}", field, raw, date)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ibm() -> Symbol {
        Symbol::parse("IBM").unwrap()
    }

    #[test]
    fn parses_and_sorts_daily_bars() {
        let body = json!({
            "Meta Data": { "2. Symbol": "IBM" },
            "Time Series (Daily)": {
                "2024-01-10": {
                    "1. open": "161.0", "2. high": "162.5", "3. low": "160.1",
                    "4. close": "161.9", "5. volume": "3500000"
                },
                "2024-01-09": {
                    "1. open": "160.0", "2. high": "161.0", "3. low": "159.0",
                    "4. close": "160.5", "5. volume": "3000000"
                }
            }
        });

        let series = parse_daily_series(&ibm(), &body).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.first_date(), NaiveDate::from_ymd_opt(2024, 1, 9));
        assert_eq!(series.rows()[1].close, Some(161.9));
        assert_eq!(series.rows()[1].volume, Some(3_500_000.0));
    }

    #[test]
    fn upstream_error_message_is_surfaced() {
        let body = json!({ "Error Message": "Invalid API call." });
        let err = parse_daily_series(&ibm(), &body).unwrap_err();
        assert_eq!(
            err,
            AppError::upstream("Error fetching data for IBM: Invalid API call.")
        );
    }

    #[test]
    fn rate_limit_note_is_an_upstream_error() {
        let body = json!({ "Note": "Thank you for using Alpha Vantage!" });
        assert!(matches!(
            parse_daily_series(&ibm(), &body),
            Err(AppError::UpstreamFetch(msg)) if msg.contains("Thank you")
        ));
    }

    #[test]
    fn non_numeric_values_are_rejected() {
        let body = json!({
            "Time Series (Daily)": {
                "2024-01-10": {
                    "1. open": "n/a", "2. high": "1", "3. low": "1",
                    "4. close": "1", "5. volume": "1"
                }
            }
        });
        assert!(matches!(
            parse_daily_series(&ibm(), &body),
            Err(AppError::UpstreamFetch(_))
        ));
    }
}
