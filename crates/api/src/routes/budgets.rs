//! Budget editing routes: hierarchy, yearly and monthly allocations,
//! confirmation and quarter locks.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use budgetlock_core::budget::{
    HierarchyAggregator, MonthlyAllocation, MonthlyDistribution, QuarterLockOutcome,
};
use budgetlock_shared::{
    AppError,
    types::{CategoryId, LenientAmount, ScenarioId},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use super::scenarios::ScenarioResponse;
use super::{error_response, map_budget_error};
use crate::AppState;

/// Creates the budget editing routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/scenarios/{scenario_id}/hierarchy", get(get_hierarchy))
        .route(
            "/scenarios/{scenario_id}/quarters/{quarter}/monthly",
            get(get_monthly_data),
        )
        .route(
            "/scenarios/{scenario_id}/categories/{category_id}/allocations",
            get(get_yearly_allocations),
        )
        .route(
            "/scenarios/{scenario_id}/categories/{category_id}/yearly",
            put(distribute_yearly_budget),
        )
        .route(
            "/scenarios/{scenario_id}/categories/{category_id}/months/{month}",
            put(set_month_budget),
        )
        .route("/scenarios/{scenario_id}/confirm", post(confirm_yearly_budget))
        .route(
            "/scenarios/{scenario_id}/quarters/{quarter}/lock",
            post(lock_quarter),
        )
        .route(
            "/scenarios/{scenario_id}/quarters/{quarter}/unlock",
            post(unlock_quarter),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body carrying an amount; strings and numbers are both accepted
/// and anything unparseable reads as zero.
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    /// Amount.
    #[serde(default)]
    pub amount: LenientAmount,
}

/// Request body for unlocking a quarter.
#[derive(Debug, Default, Deserialize)]
pub struct UnlockRequest {
    /// Must be true; unlocking reopens the yearly surface.
    #[serde(default)]
    pub confirm: bool,
}

// ============================================================================
// Helper Functions
// ============================================================================

fn allocations_body(
    scenario_id: ScenarioId,
    category_id: CategoryId,
    distribution: &MonthlyDistribution,
) -> serde_json::Value {
    let allocations: Vec<MonthlyAllocation> = distribution
        .iter()
        .map(|(month, amount)| MonthlyAllocation {
            category_id,
            month,
            amount,
        })
        .collect();

    json!({
        "scenario_id": scenario_id,
        "category_id": category_id,
        "yearly_budget": distribution.yearly(),
        "allocations": allocations
    })
}

fn lock_body(outcome: QuarterLockOutcome) -> serde_json::Value {
    json!({
        "quarter": outcome.quarter,
        "changed": outcome.changed,
        "scenario": ScenarioResponse::from(outcome.scenario)
    })
}

/// Reads `{"confirm": true}` from an optional body; anything else is false.
fn unlock_confirmed(body: &[u8]) -> bool {
    serde_json::from_slice::<UnlockRequest>(body)
        .unwrap_or_default()
        .confirm
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/scenarios/{scenario_id}/hierarchy` - Reference/budget/change tree.
async fn get_hierarchy(
    State(state): State<AppState>,
    Path(scenario_id): Path<Uuid>,
) -> impl IntoResponse {
    let scenario_id = ScenarioId::from(scenario_id);
    match state.engine.get_hierarchy(scenario_id).await {
        Ok(classes) => {
            debug!(scenario_id = %scenario_id, classes = classes.len(), "Built hierarchy");
            let totals = HierarchyAggregator::totals_by_kind(&classes);
            (
                StatusCode::OK,
                Json(json!({
                    "scenario_id": scenario_id,
                    "classes": classes,
                    "totals": totals
                })),
            )
                .into_response()
        }
        Err(e) => map_budget_error(e),
    }
}

/// GET `/scenarios/{scenario_id}/quarters/{quarter}/monthly` - One row per
/// leaf with the quarter's three months.
async fn get_monthly_data(
    State(state): State<AppState>,
    Path((scenario_id, quarter)): Path<(Uuid, i64)>,
) -> impl IntoResponse {
    let scenario_id = ScenarioId::from(scenario_id);
    match state.engine.get_monthly_data(scenario_id, quarter).await {
        Ok(rows) => (
            StatusCode::OK,
            Json(json!({
                "scenario_id": scenario_id,
                "quarter": quarter,
                "rows": rows
            })),
        )
            .into_response(),
        Err(e) => map_budget_error(e),
    }
}

/// GET `/scenarios/{scenario_id}/categories/{category_id}/allocations` - The
/// twelve stored months for one leaf.
async fn get_yearly_allocations(
    State(state): State<AppState>,
    Path((scenario_id, category_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    let scenario_id = ScenarioId::from(scenario_id);
    let category_id = CategoryId::from(category_id);
    match state
        .engine
        .get_yearly_allocations(scenario_id, category_id)
        .await
    {
        Ok(distribution) => (
            StatusCode::OK,
            Json(allocations_body(scenario_id, category_id, &distribution)),
        )
            .into_response(),
        Err(e) => map_budget_error(e),
    }
}

/// PUT `/scenarios/{scenario_id}/categories/{category_id}/yearly` - Set the
/// yearly budget and split it across the months.
async fn distribute_yearly_budget(
    State(state): State<AppState>,
    Path((scenario_id, category_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AmountRequest>,
) -> impl IntoResponse {
    let scenario_id = ScenarioId::from(scenario_id);
    let category_id = CategoryId::from(category_id);
    match state
        .engine
        .distribute_yearly_budget(scenario_id, category_id, payload.amount.value())
        .await
    {
        Ok(distribution) => {
            info!(
                scenario_id = %scenario_id,
                category_id = %category_id,
                yearly = %distribution.yearly(),
                "Yearly budget distributed"
            );
            (
                StatusCode::OK,
                Json(allocations_body(scenario_id, category_id, &distribution)),
            )
                .into_response()
        }
        Err(e) => map_budget_error(e),
    }
}

/// PUT `/scenarios/{scenario_id}/categories/{category_id}/months/{month}` -
/// Set one month; the yearly figure follows.
async fn set_month_budget(
    State(state): State<AppState>,
    Path((scenario_id, category_id, month)): Path<(Uuid, Uuid, i64)>,
    Json(payload): Json<AmountRequest>,
) -> impl IntoResponse {
    let scenario_id = ScenarioId::from(scenario_id);
    let category_id = CategoryId::from(category_id);
    match state
        .engine
        .set_month_budget(scenario_id, category_id, month, payload.amount.value())
        .await
    {
        Ok(distribution) => {
            info!(
                scenario_id = %scenario_id,
                category_id = %category_id,
                month,
                yearly = %distribution.yearly(),
                "Month budget set"
            );
            (
                StatusCode::OK,
                Json(allocations_body(scenario_id, category_id, &distribution)),
            )
                .into_response()
        }
        Err(e) => map_budget_error(e),
    }
}

/// POST `/scenarios/{scenario_id}/confirm` - Confirm the yearly budget.
async fn confirm_yearly_budget(
    State(state): State<AppState>,
    Path(scenario_id): Path<Uuid>,
) -> impl IntoResponse {
    match state
        .engine
        .confirm_yearly_budget(ScenarioId::from(scenario_id))
        .await
    {
        Ok(scenario) => {
            info!(scenario_id = %scenario.id, "Yearly budget confirmed");
            (StatusCode::OK, Json(ScenarioResponse::from(scenario))).into_response()
        }
        Err(e) => map_budget_error(e),
    }
}

/// POST `/scenarios/{scenario_id}/quarters/{quarter}/lock` - Start tracking
/// actuals for a quarter.
async fn lock_quarter(
    State(state): State<AppState>,
    Path((scenario_id, quarter)): Path<(Uuid, i64)>,
) -> impl IntoResponse {
    match state
        .engine
        .lock_quarter(ScenarioId::from(scenario_id), quarter)
        .await
    {
        Ok(outcome) => {
            info!(
                scenario_id = %outcome.scenario.id,
                quarter = %outcome.quarter,
                changed = outcome.changed,
                "Quarter locked"
            );
            (StatusCode::OK, Json(lock_body(outcome))).into_response()
        }
        Err(e) => map_budget_error(e),
    }
}

/// POST `/scenarios/{scenario_id}/quarters/{quarter}/unlock` - Stop tracking
/// actuals. Requires `{"confirm": true}`.
async fn unlock_quarter(
    State(state): State<AppState>,
    Path((scenario_id, quarter)): Path<(Uuid, i64)>,
    body: Bytes,
) -> impl IntoResponse {
    if !unlock_confirmed(&body) {
        return error_response(&AppError::ConfirmationRequired(
            "Unlocking a quarter requires {\"confirm\": true}".to_string(),
        ));
    }

    match state
        .engine
        .unlock_quarter(ScenarioId::from(scenario_id), quarter)
        .await
    {
        Ok(outcome) => {
            info!(
                scenario_id = %outcome.scenario.id,
                quarter = %outcome.quarter,
                changed = outcome.changed,
                "Quarter unlocked"
            );
            (StatusCode::OK, Json(lock_body(outcome))).into_response()
        }
        Err(e) => map_budget_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, header::CONTENT_TYPE},
    };
    use rstest::rstest;
    use rust_decimal_macros::dec;

    use crate::routes::test_support::{body_json, send};

    #[rstest]
    #[case(br#"{"confirm": true}"#.as_slice(), true)]
    #[case(br#"{"confirm": false}"#.as_slice(), false)]
    #[case(br#"{}"#.as_slice(), false)]
    #[case(b"".as_slice(), false)]
    #[case(b"not json".as_slice(), false)]
    fn test_unlock_confirmed(#[case] body: &[u8], #[case] expected: bool) {
        assert_eq!(unlock_confirmed(body), expected);
    }

    #[rstest]
    #[case(r#"{"amount": "1000"}"#, dec!(1000.00))]
    #[case(r#"{"amount": 83.33}"#, dec!(83.33))]
    #[case(r#"{"amount": "abc"}"#, dec!(0))]
    #[case(r#"{}"#, dec!(0))]
    fn test_amount_request_is_lenient(#[case] body: &str, #[case] expected: rust_decimal::Decimal) {
        let request: AmountRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.amount.value(), expected);
    }

    #[test]
    fn test_allocations_body() {
        let scenario_id = ScenarioId::new();
        let category_id = CategoryId::new();
        let body = allocations_body(
            scenario_id,
            category_id,
            &MonthlyDistribution::from_yearly(dec!(1000)).unwrap(),
        );
        assert_eq!(body["yearly_budget"], "1000.00");
        assert_eq!(body["allocations"].as_array().unwrap().len(), 12);
        assert_eq!(body["allocations"][0]["month"], 1);
        assert_eq!(body["allocations"][0]["amount"], "83.33");
        assert_eq!(body["allocations"][11]["amount"], "83.37");
    }

    #[tokio::test]
    async fn test_unlock_without_confirmation_is_rejected() {
        let uri = format!("/api/v1/scenarios/{}/quarters/2/unlock", Uuid::new_v4());
        let response = send(Request::post(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "CONFIRMATION_REQUIRED");
    }

    #[rstest]
    #[case("/quarters/5/lock")]
    #[case("/quarters/0/monthly")]
    #[tokio::test]
    async fn test_invalid_quarter_is_rejected(#[case] suffix: &str) {
        let uri = format!("/api/v1/scenarios/{}{suffix}", Uuid::new_v4());
        let method = if suffix.ends_with("lock") { "POST" } else { "GET" };
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::empty())
            .unwrap();
        let response = send(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_invalid_month_is_rejected() {
        let uri = format!(
            "/api/v1/scenarios/{}/categories/{}/months/13",
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let request = Request::put(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"amount": "10"}"#))
            .unwrap();
        let response = send(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[rstest]
    #[case("yearly", r#"{"amount": "79228162514264337593543950335"}"#)]
    #[case("yearly", r#"{"amount": "-100000000000000000"}"#)]
    #[case("months/4", r#"{"amount": "100000000000000000"}"#)]
    #[tokio::test]
    async fn test_out_of_range_amount_is_rejected(#[case] suffix: &str, #[case] body: &str) {
        let uri = format!(
            "/api/v1/scenarios/{}/categories/{}/{suffix}",
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let request = Request::put(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = send(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "VALIDATION_ERROR");
    }
}
