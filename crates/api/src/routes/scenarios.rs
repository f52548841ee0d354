//! Scenario lifecycle routes: create, list, activate and metadata edits.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use budgetlock_core::budget::{BudgetScenario, CreateScenarioInput, EditSurface};
use budgetlock_shared::{AppError, types::ScenarioId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use super::{error_response, map_budget_error};
use crate::AppState;

/// Creates the scenario routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/scenarios", get(list_scenarios).post(create_scenario))
        .route("/scenarios/{scenario_id}", get(get_scenario))
        .route("/scenarios/{scenario_id}/activate", post(activate_scenario))
        .route("/scenarios/{scenario_id}/name", put(rename_scenario))
        .route("/scenarios/{scenario_id}/notes", put(update_notes))
        .route("/scenarios/{scenario_id}/notes/cleanup", post(cleanup_notes))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a scenario.
#[derive(Debug, Deserialize)]
pub struct CreateScenarioRequest {
    /// Scenario name.
    pub name: String,
    /// Target year.
    pub year: i32,
    /// Optional notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Scenario to copy figures and allocations from.
    #[serde(default)]
    pub copy_budgets_from: Option<Uuid>,
    /// Seed references from the previous year's ledger actuals.
    #[serde(default)]
    pub seed_reference_from_actuals: bool,
}

/// Query parameters for listing scenarios.
#[derive(Debug, Deserialize)]
pub struct ListScenariosQuery {
    /// Filter by year.
    pub year: Option<i32>,
}

/// Request body for renaming a scenario.
#[derive(Debug, Deserialize)]
pub struct RenameScenarioRequest {
    /// New name.
    pub name: String,
}

/// Request body for replacing the notes.
#[derive(Debug, Deserialize)]
pub struct UpdateNotesRequest {
    /// New notes; null or blank clears them.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for notes cleanup.
#[derive(Debug, Deserialize)]
pub struct CleanupNotesRequest {
    /// Draft text to clean up.
    pub text: String,
}

/// A scenario together with the edit surfaces it currently exposes.
#[derive(Debug, Serialize)]
pub struct ScenarioResponse {
    /// Scenario state.
    #[serde(flatten)]
    pub scenario: BudgetScenario,
    /// Derived edit surface.
    pub edit_surface: EditSurface,
}

impl From<BudgetScenario> for ScenarioResponse {
    fn from(scenario: BudgetScenario) -> Self {
        let edit_surface = scenario.edit_surface();
        Self {
            scenario,
            edit_surface,
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/scenarios` - Create a scenario, optionally seeded.
async fn create_scenario(
    State(state): State<AppState>,
    Json(payload): Json<CreateScenarioRequest>,
) -> impl IntoResponse {
    let input = CreateScenarioInput {
        name: payload.name,
        year: payload.year,
        notes: payload.notes,
        copy_budgets_from: payload.copy_budgets_from.map(ScenarioId::from),
        seed_reference_from_actuals: payload.seed_reference_from_actuals,
    };

    match state.engine.create_scenario(input).await {
        Ok(scenario) => {
            info!(
                scenario_id = %scenario.id,
                year = scenario.year,
                name = %scenario.name,
                "Scenario created"
            );
            (StatusCode::CREATED, Json(ScenarioResponse::from(scenario))).into_response()
        }
        Err(e) => map_budget_error(e),
    }
}

/// GET `/scenarios?year=` - List scenarios.
async fn list_scenarios(
    State(state): State<AppState>,
    Query(query): Query<ListScenariosQuery>,
) -> impl IntoResponse {
    match state.engine.list_scenarios(query.year).await {
        Ok(scenarios) => {
            debug!(count = scenarios.len(), year = ?query.year, "Listed scenarios");
            let response: Vec<ScenarioResponse> =
                scenarios.into_iter().map(ScenarioResponse::from).collect();
            (StatusCode::OK, Json(json!({ "scenarios": response }))).into_response()
        }
        Err(e) => map_budget_error(e),
    }
}

/// GET `/scenarios/{scenario_id}` - Get one scenario.
async fn get_scenario(
    State(state): State<AppState>,
    Path(scenario_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.engine.get_scenario(ScenarioId::from(scenario_id)).await {
        Ok(scenario) => (StatusCode::OK, Json(ScenarioResponse::from(scenario))).into_response(),
        Err(e) => map_budget_error(e),
    }
}

/// POST `/scenarios/{scenario_id}/activate` - Make this the active scenario
/// for its year.
async fn activate_scenario(
    State(state): State<AppState>,
    Path(scenario_id): Path<Uuid>,
) -> impl IntoResponse {
    match state
        .engine
        .activate_scenario(ScenarioId::from(scenario_id))
        .await
    {
        Ok(scenario) => {
            info!(scenario_id = %scenario.id, year = scenario.year, "Scenario activated");
            (StatusCode::OK, Json(ScenarioResponse::from(scenario))).into_response()
        }
        Err(e) => map_budget_error(e),
    }
}

/// PUT `/scenarios/{scenario_id}/name` - Rename.
async fn rename_scenario(
    State(state): State<AppState>,
    Path(scenario_id): Path<Uuid>,
    Json(payload): Json<RenameScenarioRequest>,
) -> impl IntoResponse {
    match state
        .engine
        .rename_scenario(ScenarioId::from(scenario_id), &payload.name)
        .await
    {
        Ok(scenario) => {
            info!(scenario_id = %scenario.id, name = %scenario.name, "Scenario renamed");
            (StatusCode::OK, Json(ScenarioResponse::from(scenario))).into_response()
        }
        Err(e) => map_budget_error(e),
    }
}

/// PUT `/scenarios/{scenario_id}/notes` - Replace the notes.
async fn update_notes(
    State(state): State<AppState>,
    Path(scenario_id): Path<Uuid>,
    Json(payload): Json<UpdateNotesRequest>,
) -> impl IntoResponse {
    match state
        .engine
        .update_notes(ScenarioId::from(scenario_id), payload.notes.as_deref())
        .await
    {
        Ok(scenario) => {
            info!(
                scenario_id = %scenario.id,
                has_notes = scenario.notes.is_some(),
                "Scenario notes updated"
            );
            (StatusCode::OK, Json(ScenarioResponse::from(scenario))).into_response()
        }
        Err(e) => map_budget_error(e),
    }
}

/// POST `/scenarios/{scenario_id}/notes/cleanup` - Clean up draft notes via
/// the notes service. The result is returned, not saved.
async fn cleanup_notes(
    State(state): State<AppState>,
    Path(scenario_id): Path<Uuid>,
    Json(payload): Json<CleanupNotesRequest>,
) -> impl IntoResponse {
    let Some(assistant) = state.notes.as_deref() else {
        return error_response(&AppError::ExternalService(
            "Notes cleanup is not configured".to_string(),
        ));
    };
    if payload.text.trim().is_empty() {
        return error_response(&AppError::Validation("Text must not be empty".to_string()));
    }

    let scenario_id = ScenarioId::from(scenario_id);
    match state
        .engine
        .cleanup_notes(assistant, scenario_id, &payload.text)
        .await
    {
        Ok(text) => {
            info!(scenario_id = %scenario_id, chars = text.len(), "Notes cleaned up");
            (StatusCode::OK, Json(json!({ "text": text }))).into_response()
        }
        Err(e) => map_budget_error(e),
    }
}
