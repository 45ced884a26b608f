pub mod fetch;
pub mod forecast;
pub mod health;
pub mod history;
pub mod index;
pub mod visualize;

use axum::extract::rejection::QueryRejection;

use crate::error::AppError;
use crate::models::symbol::Symbol;

/// Boundary log for a failed collaborator call
pub(crate) fn log_failure<'a>(route: &'a str, symbol: &'a Symbol) -> impl Fn(&AppError) + 'a {
    move |e| tracing::error!("Error in {} endpoint for symbol {}: {:?}", route, symbol, e)
}

/// Rejected query string as a 400 with the usual error body
pub(crate) fn query_rejection(rejection: QueryRejection) -> AppError {
    AppError::input(rejection.body_text())
}
