//! Ledger actuals repository.
//!
//! Reads categorised ledger transactions and sums them per (leaf, month).

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use budgetlock_core::budget::{ActualsByMonth, ActualsSource, BudgetError, Month};
use budgetlock_shared::types::CategoryId;

use crate::entities::ledger_transactions;

/// Ledger actuals repository implementation.
#[derive(Debug, Clone)]
pub struct LedgerActualsRepository {
    db: DatabaseConnection,
}

impl LedgerActualsRepository {
    /// Creates a new ledger actuals repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl ActualsSource for LedgerActualsRepository {
    async fn actuals_by_month(&self, year: i32, months: &[Month]) -> Result<ActualsByMonth, BudgetError> {
        let (Some(first), Some(last)) = (months.iter().min(), months.iter().max()) else {
            return Ok(ActualsByMonth::new());
        };
        let Some((start, end)) = month_span(year, *first, *last) else {
            return Err(BudgetError::InvalidYear(year));
        };

        let rows: Vec<(Option<Uuid>, NaiveDate, Decimal)> = ledger_transactions::Entity::find()
            .select_only()
            .column(ledger_transactions::Column::CategoryId)
            .column(ledger_transactions::Column::TransactionDate)
            .column(ledger_transactions::Column::Amount)
            .filter(ledger_transactions::Column::CategoryId.is_not_null())
            .filter(ledger_transactions::Column::TransactionDate.gte(start))
            .filter(ledger_transactions::Column::TransactionDate.lt(end))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| BudgetError::repository(e.to_string()))?;

        let actuals = sum_by_month(rows, months);
        tracing::debug!(year, months = months.len(), "Loaded ledger actuals");
        Ok(actuals)
    }
}

/// `[first day of first, first day after last)`.
fn month_span(year: i32, first: Month, last: Month) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, u32::from(first.number()), 1)?;
    let end = if last.number() == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, u32::from(last.number()) + 1, 1)?
    };
    Some((start, end))
}

/// Sums rows into (leaf, month) cells, keeping only the requested months.
fn sum_by_month(rows: Vec<(Option<Uuid>, NaiveDate, Decimal)>, months: &[Month]) -> ActualsByMonth {
    let mut actuals = ActualsByMonth::new();
    for (category_id, date, amount) in rows {
        let Some(category_id) = category_id else {
            continue;
        };
        let Ok(month) = Month::new(i64::from(date.month())) else {
            continue;
        };
        if months.contains(&month) {
            actuals.add(CategoryId::from(category_id), month, amount);
        }
    }
    actuals
}
