use axum::{extract::State, Json};

use crate::{
    error::AppError,
    models::api::{HealthResponse, ResponseStatus},
    AppState,
};

/// Handler for GET /health
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    state.store.health().await.inspect_err(|e| {
        tracing::error!("Store health check failed ({}): {}", state.store.name(), e)
    })?;

    Ok(Json(HealthResponse {
        status: ResponseStatus::Success,
        store: "ok".to_string(),
    }))
}
