//! Budget vs actual routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use budgetlock_core::budget::{Month, Quarter, ReconciliationView};
use budgetlock_shared::{AppError, types::ScenarioId};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use super::{error_response, map_budget_error};
use crate::AppState;

/// Creates the reconciliation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/actuals", get(get_actuals))
        .route(
            "/scenarios/{scenario_id}/reconciliation",
            get(get_reconciliation),
        )
}

/// Query parameters for ledger actuals.
#[derive(Debug, Deserialize)]
pub struct ActualsQuery {
    /// Ledger year.
    pub year: i32,
    /// Comma-separated month numbers; all twelve when omitted.
    pub months: Option<String>,
}

/// Query parameters for a reconciliation. Exactly one must be set.
#[derive(Debug, Deserialize)]
pub struct ReconciliationQuery {
    /// Quarter view.
    pub quarter: Option<i64>,
    /// Single-month view.
    pub month: Option<i64>,
}

impl ReconciliationQuery {
    fn view(&self) -> Result<ReconciliationView, AppError> {
        match (self.quarter, self.month) {
            (Some(q), None) => Ok(ReconciliationView::Quarter(Quarter::from_number(q)?)),
            (None, Some(m)) => Ok(ReconciliationView::Month(Month::new(m)?)),
            _ => Err(AppError::Validation(
                "Specify exactly one of quarter or month".to_string(),
            )),
        }
    }
}

/// Parses `"1, 2,3"` into month numbers. Range checks happen in the engine.
fn parse_months(raw: Option<&str>) -> Result<Vec<i64>, AppError> {
    let Some(raw) = raw else {
        return Ok((1..=12).collect());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| AppError::Validation(format!("Invalid month: {s}")))
        })
        .collect()
}

/// GET `/actuals?year=&months=` - Ledger actuals by leaf and month.
async fn get_actuals(
    State(state): State<AppState>,
    Query(query): Query<ActualsQuery>,
) -> impl IntoResponse {
    let months = match parse_months(query.months.as_deref()) {
        Ok(months) => months,
        Err(e) => return error_response(&e),
    };

    match state.engine.get_actuals(query.year, &months).await {
        Ok(actuals) => {
            debug!(year = query.year, months = months.len(), "Served actuals");
            (
                StatusCode::OK,
                Json(json!({
                    "year": query.year,
                    "actuals": actuals
                })),
            )
                .into_response()
        }
        Err(e) => map_budget_error(e),
    }
}

/// GET `/scenarios/{scenario_id}/reconciliation?quarter=|month=` - Budget vs
/// actual at every level of the hierarchy.
async fn get_reconciliation(
    State(state): State<AppState>,
    Path(scenario_id): Path<Uuid>,
    Query(query): Query<ReconciliationQuery>,
) -> impl IntoResponse {
    let view = match query.view() {
        Ok(view) => view,
        Err(e) => return error_response(&e),
    };

    let scenario_id = ScenarioId::from(scenario_id);
    match state.engine.get_reconciliation(scenario_id, view).await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "scenario_id": scenario_id,
                "report": report
            })),
        )
            .into_response(),
        Err(e) => map_budget_error(e),
    }
}
