use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use chrono::Utc;

use crate::{
    error::AppError,
    handlers::{log_failure, query_rejection},
    models::{
        api::{HistoryQuery, HistoryResponse, ResponseStatus},
        symbol::Symbol,
    },
    AppState,
};

/// Handler for GET /history
/// Stored rows for a symbol inside the requested window (default: last 30 days)
pub async fn get_history(
    State(state): State<AppState>,
    params: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryResponse>, AppError> {
    let Query(params) = params.map_err(query_rejection)?;
    let symbol = Symbol::from_param(params.symbol.as_deref())?;
    let window = params.window(state.config.history_lookback_days, Utc::now().date_naive())?;

    tracing::debug!(
        "History requested for {} from {} to {}",
        symbol,
        window.start,
        window.end
    );

    let series = state
        .store
        .query_series(&symbol, window)
        .await
        .inspect_err(log_failure("/history", &symbol))?;

    Ok(Json(HistoryResponse {
        status: ResponseStatus::Success,
        data: series.into_rows(),
    }))
}
