use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveTime};
use reqwest::Client;
use std::collections::BTreeMap;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::price::{Field, PriceRow, QueryWindow, Series};
use crate::models::symbol::Symbol;
use crate::services::store::PriceStore;

const MEASUREMENT: &str = "stock";
const SYMBOL_TAG: &str = "symbol";
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// InfluxDB 2.x over its HTTP API (line protocol writes, Flux queries).
#[derive(Clone)]
pub struct InfluxStore {
    client: Client,
    url: String,
    token: String,
    org: String,
    bucket: String,
    batch_size: usize,
}

impl InfluxStore {
    pub fn new(client: Client, url: String, token: String, org: String, bucket: String) -> Self {
        Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token,
            org,
            bucket,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn from_config(client: Client, config: &AppConfig) -> Self {
        Self::new(
            client,
            config.influx_url.clone(),
            config.influx_token.clone(),
            config.influx_org.clone(),
            config.influx_bucket.clone(),
        )
        .with_batch_size(config.influx_batch_size)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.token)
    }

    async fn write_batch(&self, body: String) -> Result<(), String> {
        let url = format!("{}/api/v2/write", self.url);

        let response = self
            .client
            .post(&url)
            .header("authorization", self.auth_header())
            .header("content-type", "text/plain; charset=utf-8")
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "s"),
            ])
            .body(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("InfluxDB error {}: {}", status, error_text));
        }

        Ok(())
    }
}

#[async_trait]
impl PriceStore for InfluxStore {
    async fn write_series(&self, symbol: &Symbol, series: &Series) -> Result<usize, AppError> {
        let lines: Vec<String> = series
            .rows()
            .iter()
            .filter_map(|row| line_protocol(symbol, row))
            .collect();

        let mut written = 0;
        for batch in lines.chunks(self.batch_size) {
            self.write_batch(batch.join("\n")).await.map_err(|e| {
                tracing::error!(
                    "Write for {} failed after {} of {} rows: {}",
                    symbol,
                    written,
                    lines.len(),
                    e
                );
                AppError::store_write(format!(
                    "{} ({} of {} rows for {} were written)",
                    e,
                    written,
                    lines.len(),
                    symbol
                ))
            })?;
            written += batch.len();
        }

        tracing::info!("Successfully wrote {} rows for {} to InfluxDB", written, symbol);
        Ok(written)
    }

    async fn query_series(&self, symbol: &Symbol, window: QueryWindow) -> Result<Series, AppError> {
        let url = format!("{}/api/v2/query", self.url);
        let flux = flux_query(&self.bucket, symbol, window)?;
        tracing::debug!("Flux query for {}: {}", symbol, flux);

        let response = self
            .client
            .post(&url)
            .header("authorization", self.auth_header())
            .header("accept", "application/csv")
            .header("content-type", "application/vnd.flux")
            .query(&[("org", self.org.as_str())])
            .body(flux)
            .send()
            .await
            .map_err(|e| AppError::store_query(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::store_query(format!(
                "InfluxDB error {}: {}",
                status, error_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::store_query(e.to_string()))?;

        let series = parse_annotated_csv(&body)?;
        tracing::info!(
            "Successfully queried {} rows for {} from InfluxDB",
            series.len(),
            symbol
        );
        Ok(series)
    }

    async fn health(&self) -> Result<(), AppError> {
        let url = format!("{}/health", self.url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::store_query(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::store_query(format!(
                "InfluxDB health check failed {}: {}",
                status, error_text
            )));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "influxdb"
    }
}

fn midnight_utc_seconds(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

// Tag values escape commas, equals signs and spaces
fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `stock,symbol=AAPL open=..,high=..,low=..,close=..,volume=.. <secs>`;
/// `None` when the row has no finite field to write
pub fn line_protocol(symbol: &Symbol, row: &PriceRow) -> Option<String> {
    let fields: Vec<String> = row
        .fields()
        .filter(|(_, v)| v.is_finite())
        .map(|(f, v)| format!("{}={}", f.as_str(), v))
        .collect();

    if fields.is_empty() {
        return None;
    }

    Some(format!(
        "{},{}={} {} {}",
        MEASUREMENT,
        SYMBOL_TAG,
        escape_tag(symbol.as_str()),
        fields.join(","),
        midnight_utc_seconds(row.date)
    ))
}

fn flux_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Range-filter, pivot fields into columns and sort by time
pub fn flux_query(bucket: &str, symbol: &Symbol, window: QueryWindow) -> Result<String, AppError> {
    // range stop is exclusive
    let stop = window
        .end
        .checked_add_days(Days::new(1))
        .ok_or_else(|| AppError::input(format!("end date {} is out of range", window.end)))?;

    Ok(format!(
        r#"from(bucket: "{bucket}")
  |> range(start: {start}T00:00:00Z, stop: {stop}T00:00:00Z)
  |> filter(fn: (r) => r["_measurement"] == "{measurement}" and r["{tag}"] == "{symbol}")
  |> pivot(rowKey: ["_time"], columnKey: ["_field"], valueColumn: "_value")
  |> sort(columns: ["_time"])"#,
        bucket = flux_string(bucket),
        start = window.start.format("%Y-%m-%d"),
        stop = stop.format("%Y-%m-%d"),
        measurement = MEASUREMENT,
        tag = SYMBOL_TAG,
        symbol = flux_string(symbol.as_str()),
    ))
}

/// Decode an annotated CSV query response into a series.
///
/// The response may hold several tables, each with its own header row. Only
/// `_time` and the price field columns are kept; `result`, `table`, `_start`,
/// `_stop`, `_measurement` and tag columns are dropped. Rows sharing a date
/// across tables are merged.
pub fn parse_annotated_csv(body: &str) -> Result<Series, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(body.as_bytes());

    let mut header: Option<Vec<String>> = None;
    let mut error_table = false;
    let mut rows: BTreeMap<NaiveDate, PriceRow> = BTreeMap::new();

    for record in reader.records() {
        let record = record.map_err(|e| AppError::store_query(format!("Malformed CSV: {}", e)))?;

        if record.iter().all(str::is_empty) {
            continue;
        }

        if record.iter().any(|f| f == "_time") {
            header = Some(record.iter().map(str::to_string).collect());
            error_table = false;
            continue;
        }

        // Flux reports runtime failures as a table with `error,reference` columns
        if record.iter().any(|f| f == "error") && record.iter().any(|f| f == "reference") {
            error_table = true;
            continue;
        }
        if error_table {
            let message = record
                .iter()
                .find(|f| !f.is_empty())
                .unwrap_or("unknown query error");
            return Err(AppError::store_query(message.to_string()));
        }

        let Some(columns) = header.as_ref() else {
            return Err(AppError::store_query("CSV data row before header row"));
        };

        let mut time = None;
        let mut values = Vec::new();
        for (name, value) in columns.iter().zip(record.iter()) {
            if name == "_time" {
                time = Some(value);
            } else if let Some(field) = Field::from_name(name) {
                if !value.is_empty() {
                    let parsed = value.parse::<f64>().map_err(|_| {
                        AppError::store_query(format!("Invalid {} value '{}'", field, value))
                    })?;
                    values.push((field, parsed));
                }
            }
        }

        let time = time.ok_or_else(|| AppError::store_query("Row without _time value"))?;
        let date = DateTime::parse_from_rfc3339(time)
            .map_err(|_| AppError::store_query(format!("Invalid _time value '{}'", time)))?
            .naive_utc()
            .date();

        let row = rows.entry(date).or_insert_with(|| PriceRow::empty(date));
        for (field, value) in values {
            row.set(field, value);
        }
    }

    Ok(Series::new(rows.into_values().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn line_protocol_uses_midnight_timestamp() {
        let symbol = Symbol::parse("AAPL").unwrap();
        let row = PriceRow::new(d("2024-01-10"), 184.35, 186.4, 183.92, 185.5, 46792908.0);

        assert_eq!(
            line_protocol(&symbol, &row).unwrap(),
            "stock,symbol=AAPL open=184.35,high=186.4,low=183.92,close=185.5,volume=46792908 1704844800"
        );
    }

    #[test]
    fn line_protocol_skips_rows_without_fields() {
        let symbol = Symbol::parse("AAPL").unwrap();
        assert!(line_protocol(&symbol, &PriceRow::empty(d("2024-01-10"))).is_none());
    }

    #[test]
    fn flux_query_uses_exclusive_stop() {
        let symbol = Symbol::parse("MSFT").unwrap();
        let window = QueryWindow::between(d("2024-01-01"), d("2024-01-31")).unwrap();
        let flux = flux_query("stock_data", &symbol, window).unwrap();

        assert!(flux.starts_with(r#"from(bucket: "stock_data")"#));
        assert!(flux.contains("range(start: 2024-01-01T00:00:00Z, stop: 2024-02-01T00:00:00Z)"));
        assert!(flux.contains(r#"r["symbol"] == "MSFT""#));
        assert!(flux.contains("pivot(rowKey: [\"_time\"]"));
    }

    #[test]
    fn parses_pivoted_csv_and_drops_internal_columns() {
        let body = "\
#group,false,false,true,true,false,true,true,false,false,false,false,false
#datatype,string,long,dateTime:RFC3339,dateTime:RFC3339,dateTime:RFC3339,string,string,double,double,double,double,double
#default,_result,,,,,,,,,,,
,result,table,_start,_stop,_time,_measurement,symbol,close,high,low,open,volume
,,0,2023-12-01T00:00:00Z,2024-01-31T00:00:00Z,2024-01-10T00:00:00Z,stock,AAPL,185.5,186.4,183.92,184.35,46792908
,,0,2023-12-01T00:00:00Z,2024-01-31T00:00:00Z,2024-01-09T00:00:00Z,stock,AAPL,185.14,185.15,182.73,183.92,42841809
";
        let series = parse_annotated_csv(body).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.first_date(), Some(d("2024-01-09")));
        assert_eq!(
            series.rows()[1],
            PriceRow::new(d("2024-01-10"), 184.35, 186.4, 183.92, 185.5, 46792908.0)
        );
    }

    #[test]
    fn merges_rows_split_across_tables() {
        let body = "\
,result,table,_start,_stop,_time,_measurement,symbol,close
,_result,0,2024-01-01T00:00:00Z,2024-02-01T00:00:00Z,2024-01-10T00:00:00Z,stock,AAPL,185.5

,result,table,_start,_stop,_time,_measurement,symbol,open
,_result,1,2024-01-01T00:00:00Z,2024-02-01T00:00:00Z,2024-01-10T00:00:00Z,stock,AAPL,184.35
";
        let series = parse_annotated_csv(body).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.rows()[0].close, Some(185.5));
        assert_eq!(series.rows()[0].open, Some(184.35));
        assert_eq!(series.rows()[0].volume, None);
    }

    #[test]
    fn empty_response_is_empty_series() {
        assert!(parse_annotated_csv("").unwrap().is_empty());
        assert!(parse_annotated_csv("\r\n").unwrap().is_empty());
    }

    #[test]
    fn error_table_becomes_query_error() {
        let body = "\
#datatype,string,string
#group,true,true
#default,,
,error,reference
,failed to parse query,897
";
        assert_eq!(
            parse_annotated_csv(body),
            Err(AppError::store_query("failed to parse query"))
        );
    }
}
