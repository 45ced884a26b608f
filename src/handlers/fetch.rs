use axum::{
    extract::{rejection::FormRejection, State},
    Form, Json,
};

use crate::{
    error::AppError,
    handlers::log_failure,
    models::{
        api::{FetchForm, StatusResponse},
        symbol::Symbol,
    },
    services::ingest::ingest_symbol,
    AppState,
};

/// Handler for POST /fetch
/// Pulls the daily series from the market-data API and writes it to the store
pub async fn fetch_symbol(
    State(state): State<AppState>,
    form: Result<Form<FetchForm>, FormRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    // A missing or unreadable body is treated like an empty form
    let form = form.map(|Form(f)| f).unwrap_or_else(|rejection| {
        tracing::debug!("Unreadable /fetch form: {}", rejection);
        FetchForm::default()
    });

    let symbol = Symbol::from_param(form.symbol.as_deref())?;
    let size = form.output_size()?;

    tracing::debug!("Fetch requested for {} ({})", symbol, size.as_str());

    let written = ingest_symbol(state.market_data.as_ref(), state.store.as_ref(), &symbol, size)
        .await
        .inspect_err(log_failure("/fetch", &symbol))?;

    tracing::info!("Fetched and stored {} rows for {}", written, symbol);

    Ok(Json(StatusResponse::success(format!(
        "Data for {} fetched and stored.",
        symbol
    ))))
}
