//! Budget error types.

use budgetlock_shared::AppError;
use budgetlock_shared::types::{CategoryId, ScenarioId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Budget engine errors.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// Scenario not found.
    #[error("Scenario not found: {0}")]
    ScenarioNotFound(ScenarioId),

    /// Leaf category not found.
    #[error("Category not found: {0}")]
    CategoryNotFound(CategoryId),

    /// Month number outside 1-12.
    #[error("Invalid month: {0} (expected 1-12)")]
    InvalidMonth(i64),

    /// Quarter number outside 1-4.
    #[error("Invalid quarter: {0} (expected 1-4)")]
    InvalidQuarter(i64),

    /// Amount too large for the `NUMERIC(19, 2)` columns.
    #[error("Amount out of range: {0} (magnitude must be below 10^17)")]
    AmountOutOfRange(Decimal),

    /// A yearly-surface write was attempted while a quarter is locked.
    #[error("Scenario {0} has a locked quarter; yearly budget is read-only")]
    ScenarioLocked(ScenarioId),

    /// Scenario name is empty or too long.
    #[error("Invalid scenario name: {0}")]
    InvalidName(String),

    /// Target year out of range.
    #[error("Invalid year: {0}")]
    InvalidYear(i32),

    /// Actuals source or notes cleanup collaborator unreachable.
    #[error("External service unavailable: {0}")]
    ExternalServiceUnavailable(String),

    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(String),
}

impl BudgetError {
    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }

    /// Create an external service error.
    #[must_use]
    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalServiceUnavailable(msg.into())
    }
}

impl From<BudgetError> for AppError {
    fn from(err: BudgetError) -> Self {
        let message = err.to_string();
        match err {
            BudgetError::ScenarioNotFound(_) | BudgetError::CategoryNotFound(_) => {
                Self::NotFound(message)
            }
            BudgetError::InvalidMonth(_)
            | BudgetError::InvalidQuarter(_)
            | BudgetError::AmountOutOfRange(_)
            | BudgetError::InvalidName(_)
            | BudgetError::InvalidYear(_) => Self::Validation(message),
            BudgetError::ScenarioLocked(_) => Self::Locked(message),
            BudgetError::ExternalServiceUnavailable(_) => Self::ExternalService(message),
            BudgetError::Repository(_) => Self::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_mapping() {
        let scenario = ScenarioId::new();

        assert_eq!(
            AppError::from(BudgetError::ScenarioNotFound(scenario)).status_code(),
            404
        );
        assert_eq!(
            AppError::from(BudgetError::CategoryNotFound(CategoryId::new())).status_code(),
            404
        );
        assert_eq!(AppError::from(BudgetError::InvalidMonth(13)).status_code(), 400);
        assert_eq!(AppError::from(BudgetError::InvalidQuarter(0)).status_code(), 400);
        assert_eq!(
            AppError::from(BudgetError::AmountOutOfRange(Decimal::MAX)).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            AppError::from(BudgetError::ScenarioLocked(scenario)).error_code(),
            "SCENARIO_LOCKED"
        );
        assert_eq!(
            AppError::from(BudgetError::external("timeout")).status_code(),
            503
        );
        assert_eq!(
            AppError::from(BudgetError::repository("boom")).error_code(),
            "DATABASE_ERROR"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            BudgetError::InvalidMonth(13).to_string(),
            "Invalid month: 13 (expected 1-12)"
        );
    }
}
