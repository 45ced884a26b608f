use serde_json::{json, Value};

use crate::error::AppError;
use crate::models::price::{Field, Series};
use crate::models::symbol::Symbol;

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");
const VISUALIZE_TEMPLATE: &str = include_str!("../../templates/visualize.html");

pub fn render_index_page() -> String {
    INDEX_TEMPLATE.to_string()
}

/// Plotly figure: one line trace of close price against date
pub fn close_price_figure(symbol: &Symbol, series: &Series) -> Result<Value, AppError> {
    let closes = series.column(Field::Close)?;
    let dates: Vec<String> = series
        .rows()
        .iter()
        .map(|r| r.date.format("%Y-%m-%d").to_string())
        .collect();

    Ok(json!({
        "data": [{
            "type": "scatter",
            "mode": "lines",
            "name": "Close Price",
            "x": dates,
            "y": closes,
        }],
        "layout": {
            "title": { "text": format!("Historical Close Prices for {}", symbol) },
            "xaxis": { "title": { "text": "Date" } },
            "yaxis": { "title": { "text": "Close Price" } },
        },
    }))
}

pub fn render_chart_page(symbol: &Symbol, series: &Series) -> Result<String, AppError> {
    let figure = close_price_figure(symbol, series)?;
    // keep "</script>" out of the inline script
    let graph_json = figure.to_string().replace("</", "<\\/");

    Ok(VISUALIZE_TEMPLATE
        .replace("{{ symbol }}", &escape_html(symbol.as_str()))
        .replace("{{ graph_json }}", &graph_json))
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
