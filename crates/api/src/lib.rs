//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes over the budget engine
//! - Error rendering for `AppError`
//! - The HTTP client for the notes cleanup service

pub mod clients;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use budgetlock_core::budget::BudgetEngine;
use budgetlock_db::{LedgerActualsRepository, ScenarioRepository};
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::clients::HttpNotesAssistant;

/// Budget engine backed by the database repositories.
pub type Engine = BudgetEngine<ScenarioRepository, LedgerActualsRepository>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Budget engine.
    pub engine: Arc<Engine>,
    /// Notes cleanup client; `None` when no endpoint is configured.
    pub notes: Option<Arc<HttpNotesAssistant>>,
}

impl AppState {
    /// Wires the engine over a database connection.
    pub fn new(db: &DatabaseConnection, notes: Option<HttpNotesAssistant>) -> Self {
        let engine = BudgetEngine::new(
            Arc::new(ScenarioRepository::new(db.clone())),
            Arc::new(LedgerActualsRepository::new(db.clone())),
        );
        Self {
            engine: Arc::new(engine),
            notes: notes.map(Arc::new),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
