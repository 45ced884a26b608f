use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Html,
};
use chrono::Utc;

use crate::{
    error::AppError,
    handlers::{log_failure, query_rejection},
    models::{api::VisualizeQuery, symbol::Symbol},
    services::chart::render_chart_page,
    AppState,
};

/// Handler for GET /visualize
/// Renders the close price line chart; failures come back as JSON
pub async fn visualize_history(
    State(state): State<AppState>,
    params: Result<Query<VisualizeQuery>, QueryRejection>,
) -> Result<Html<String>, AppError> {
    let Query(params) = params.map_err(query_rejection)?;
    let symbol = Symbol::from_param(params.symbol.as_deref())?;
    let window = params.window(state.config.history_lookback_days, Utc::now().date_naive())?;

    let series = state
        .store
        .query_series(&symbol, window)
        .await
        .inspect_err(log_failure("/visualize", &symbol))?;

    let page = render_chart_page(&symbol, &series).inspect_err(log_failure("/visualize", &symbol))?;

    Ok(Html(page))
}
