//! API route definitions.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use budgetlock_core::budget::BudgetError;
use budgetlock_shared::AppError;
use serde_json::json;
use tracing::{error, warn};

use crate::AppState;

pub mod budgets;
pub mod health;
pub mod reconciliation;
pub mod scenarios;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(scenarios::routes())
        .merge(budgets::routes())
        .merge(reconciliation::routes())
}

/// Renders an error as `{"error": code, "message": text}`.
///
/// Internal messages are logged and replaced with a generic text.
pub(crate) fn error_response(err: &AppError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = if err.is_internal() {
        error!(error = %err, "Request failed");
        "An error occurred".to_string()
    } else {
        err.to_string()
    };

    (
        status,
        Json(json!({
            "error": err.error_code(),
            "message": message
        })),
    )
        .into_response()
}

/// Maps budget errors to HTTP responses.
pub(crate) fn map_budget_error(e: BudgetError) -> Response {
    if let BudgetError::ScenarioLocked(id) = &e {
        warn!(scenario_id = %id, "Rejected write to locked scenario");
    }
    error_response(&AppError::from(e))
}
