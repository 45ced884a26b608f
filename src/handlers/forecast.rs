use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use chrono::Utc;

use crate::{
    error::AppError,
    handlers::{log_failure, query_rejection},
    models::{
        api::{ForecastQuery, ForecastResponse, ResponseStatus},
        price::Field,
        symbol::Symbol,
    },
    AppState,
};

/// Handler for GET /forecast
/// ARIMA(5,1,0) projection of the closing price, keyed by calendar date
pub async fn get_forecast(
    State(state): State<AppState>,
    params: Result<Query<ForecastQuery>, QueryRejection>,
) -> Result<Json<ForecastResponse>, AppError> {
    let Query(params) = params.map_err(query_rejection)?;
    let symbol = Symbol::from_param(params.symbol.as_deref())?;
    let steps = params.steps()?;
    let window = params.window(state.config.forecast_lookback_days, Utc::now().date_naive())?;

    let series = state
        .store
        .query_series(&symbol, window)
        .await
        .inspect_err(log_failure("/forecast", &symbol))?;

    // Schema check before any fitting
    series
        .require_column(Field::Close)
        .inspect_err(log_failure("/forecast", &symbol))?;

    let result = state
        .forecaster
        .forecast(&series, steps)
        .inspect_err(log_failure("/forecast", &symbol))?;

    Ok(Json(ForecastResponse {
        status: ResponseStatus::Success,
        forecast: result.to_date_map(),
    }))
}
