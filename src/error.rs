use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::models::api::StatusResponse;

/// Error type shared by the collaborators and the HTTP layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    /// Missing or malformed request parameter.
    #[error("{0}")]
    Input(String),

    /// Market-data API failure or unexpected payload shape.
    #[error("{0}")]
    UpstreamFetch(String),

    #[error("Failed to write to time-series store: {0}")]
    StoreWrite(String),

    #[error("Failed to query time-series store: {0}")]
    StoreQuery(String),

    /// An expected column is absent from a series.
    #[error("{0}")]
    DataShape(String),

    #[error("{0}")]
    Validation(String),

    /// Model did not fit or the series is too short.
    #[error("Forecast model failed: {0}")]
    ModelFit(String),
}

impl AppError {
    pub fn input(msg: impl Into<String>) -> Self {
        AppError::Input(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        AppError::UpstreamFetch(msg.into())
    }

    pub fn store_write(msg: impl Into<String>) -> Self {
        AppError::StoreWrite(msg.into())
    }

    pub fn store_query(msg: impl Into<String>) -> Self {
        AppError::StoreQuery(msg.into())
    }

    pub fn data_shape(msg: impl Into<String>) -> Self {
        AppError::DataShape(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn model_fit(msg: impl Into<String>) -> Self {
        AppError::ModelFit(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Input(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // server-side failures are logged with context by the handler
        if status.is_client_error() {
            tracing::warn!("Rejected request: {}", self);
        }

        (status, Json(StatusResponse::error(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_client_errors() {
        assert_eq!(
            AppError::input("No stock symbol provided").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn collaborator_errors_are_server_errors() {
        for err in [
            AppError::upstream("x"),
            AppError::store_write("x"),
            AppError::store_query("x"),
            AppError::data_shape("x"),
            AppError::validation("x"),
            AppError::model_fit("x"),
        ] {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn store_errors_carry_context_in_message() {
        let err = AppError::store_query("connection refused");
        assert_eq!(
            err.to_string(),
            "Failed to query time-series store: connection refused"
        );
    }
}
