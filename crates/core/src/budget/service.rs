//! Budget engine: the operation surface over a repository and the ledger.

use std::collections::BTreeSet;
use std::sync::Arc;

use budgetlock_shared::types::{CategoryId, ScenarioId};
use rust_decimal::Decimal;

use super::distribution::{MonthlyDistribution, checked_cents};
use super::error::BudgetError;
use super::hierarchy::{ClassNode, HierarchyAggregator, ordered_leaves};
use super::locks::LockAction;
use super::scenario::{
    NotesContext, normalize_name, normalize_notes, seed_figures, validate_year,
};
use super::types::{
    ActualsByMonth, BudgetScenario, CreateScenarioInput, HierarchyDefinition, Month,
    MonthlyBudgetRow, NewScenario, Quarter, QuarterLockOutcome, ScenarioMetadataUpdate,
    ScenarioSnapshot,
};
use super::variance::{Reconciler, ReconciliationReport, ReconciliationView};

/// Repository trait for scenario persistence.
///
/// Implemented by the db crate. Every mutating method is one transaction;
/// methods returning `Option` yield `None` for an unknown scenario.
pub trait BudgetRepository: Send + Sync {
    /// Find a scenario by ID.
    fn find_scenario(
        &self,
        id: ScenarioId,
    ) -> impl std::future::Future<Output = Result<Option<BudgetScenario>, BudgetError>> + Send;

    /// List scenarios, optionally for one year, newest year first.
    fn list_scenarios(
        &self,
        year: Option<i32>,
    ) -> impl std::future::Future<Output = Result<Vec<BudgetScenario>, BudgetError>> + Send;

    /// Load the category tree shared by all scenarios.
    fn load_definition(
        &self,
    ) -> impl std::future::Future<Output = Result<HierarchyDefinition, BudgetError>> + Send;

    /// Read a scenario with its tree, figures and allocations in one read
    /// transaction.
    fn load_snapshot(
        &self,
        id: ScenarioId,
    ) -> impl std::future::Future<Output = Result<Option<ScenarioSnapshot>, BudgetError>> + Send;

    /// Insert a scenario with its seeded figures.
    fn create_scenario(
        &self,
        scenario: NewScenario,
    ) -> impl std::future::Future<Output = Result<BudgetScenario, BudgetError>> + Send;

    /// Mark a scenario active and every other scenario of its year inactive.
    fn activate_scenario(
        &self,
        id: ScenarioId,
    ) -> impl std::future::Future<Output = Result<Option<BudgetScenario>, BudgetError>> + Send;

    /// Apply name/notes changes.
    fn update_metadata(
        &self,
        id: ScenarioId,
        update: ScenarioMetadataUpdate,
    ) -> impl std::future::Future<Output = Result<Option<BudgetScenario>, BudgetError>> + Send;

    /// Set `yearly_confirmed`.
    fn confirm_yearly(
        &self,
        id: ScenarioId,
    ) -> impl std::future::Future<Output = Result<Option<BudgetScenario>, BudgetError>> + Send;

    /// Compare-and-set one quarter latch.
    fn set_quarter_lock(
        &self,
        id: ScenarioId,
        quarter: Quarter,
        action: LockAction,
    ) -> impl std::future::Future<Output = Result<Option<QuarterLockOutcome>, BudgetError>> + Send;

    /// Write a leaf's yearly figure and its twelve allocations.
    ///
    /// Must lock the scenario row, then fail with `ScenarioNotFound`,
    /// `CategoryNotFound` or `ScenarioLocked` before writing anything.
    fn write_distribution(
        &self,
        id: ScenarioId,
        category_id: CategoryId,
        distribution: MonthlyDistribution,
    ) -> impl std::future::Future<Output = Result<MonthlyDistribution, BudgetError>> + Send;

    /// Upsert one month and re-derive the yearly figure as the sum of the
    /// twelve months. Same checks as [`Self::write_distribution`], plus
    /// `AmountOutOfRange` (nothing written) if the re-derived yearly figure
    /// no longer fits storage.
    fn write_month(
        &self,
        id: ScenarioId,
        category_id: CategoryId,
        month: Month,
        amount: Decimal,
    ) -> impl std::future::Future<Output = Result<MonthlyDistribution, BudgetError>> + Send;
}

/// Read-only ledger actuals.
pub trait ActualsSource: Send + Sync {
    /// Actuals of `year` for the given months, summed per (leaf, month).
    fn actuals_by_month(
        &self,
        year: i32,
        months: &[Month],
    ) -> impl std::future::Future<Output = Result<ActualsByMonth, BudgetError>> + Send;
}

/// External free-text cleanup capability.
pub trait NotesAssistant: Send + Sync {
    /// Returns the cleaned text.
    fn cleanup(
        &self,
        context: &NotesContext,
        text: &str,
    ) -> impl std::future::Future<Output = Result<String, BudgetError>> + Send;
}

/// Budget engine for allocation, locking and reconciliation.
pub struct BudgetEngine<R: BudgetRepository, A: ActualsSource> {
    repo: Arc<R>,
    actuals: Arc<A>,
}

impl<R: BudgetRepository, A: ActualsSource> BudgetEngine<R, A> {
    /// Create a new engine.
    #[must_use]
    pub fn new(repo: Arc<R>, actuals: Arc<A>) -> Self {
        Self { repo, actuals }
    }

    async fn snapshot(&self, id: ScenarioId) -> Result<ScenarioSnapshot, BudgetError> {
        self.repo
            .load_snapshot(id)
            .await?
            .ok_or(BudgetError::ScenarioNotFound(id))
    }

    /// Get one scenario.
    pub async fn get_scenario(&self, id: ScenarioId) -> Result<BudgetScenario, BudgetError> {
        self.repo
            .find_scenario(id)
            .await?
            .ok_or(BudgetError::ScenarioNotFound(id))
    }

    /// List scenarios, optionally filtered by year.
    pub async fn list_scenarios(&self, year: Option<i32>) -> Result<Vec<BudgetScenario>, BudgetError> {
        self.repo.list_scenarios(year).await
    }

    /// Full reference/budget/change tree for a scenario.
    pub async fn get_hierarchy(&self, id: ScenarioId) -> Result<Vec<ClassNode>, BudgetError> {
        let snapshot = self.snapshot(id).await?;
        Ok(HierarchyAggregator::build(
            &snapshot.definition,
            &snapshot.figures,
        ))
    }

    /// One row per leaf, in hierarchy order, with the quarter's three months.
    pub async fn get_monthly_data(
        &self,
        id: ScenarioId,
        quarter: i64,
    ) -> Result<Vec<MonthlyBudgetRow>, BudgetError> {
        let quarter = Quarter::from_number(quarter)?;
        let snapshot = self.snapshot(id).await?;
        let distributions = snapshot.distributions();

        Ok(ordered_leaves(&snapshot.definition)
            .into_iter()
            .map(|(_, category)| {
                let [month1, month2, month3] = distributions
                    .get(&category.id)
                    .copied()
                    .unwrap_or_default()
                    .quarter(quarter);
                MonthlyBudgetRow {
                    category_id: category.id,
                    category_name: category.name.clone(),
                    quarter,
                    month1_budget: month1,
                    month2_budget: month2,
                    month3_budget: month3,
                    q_total: month1 + month2 + month3,
                }
            })
            .collect())
    }

    /// The twelve persisted allocations for one leaf.
    pub async fn get_yearly_allocations(
        &self,
        id: ScenarioId,
        category_id: CategoryId,
    ) -> Result<MonthlyDistribution, BudgetError> {
        let snapshot = self.snapshot(id).await?;
        if !snapshot.definition.contains_category(category_id) {
            return Err(BudgetError::CategoryNotFound(category_id));
        }
        Ok(snapshot.distribution_for(category_id))
    }

    /// Ledger actuals for `year`. Month numbers are validated; duplicates are
    /// ignored.
    pub async fn get_actuals(&self, year: i32, months: &[i64]) -> Result<ActualsByMonth, BudgetError> {
        let months = months
            .iter()
            .map(|m| Month::new(*m))
            .collect::<Result<BTreeSet<_>, _>>()?;
        let months: Vec<Month> = months.into_iter().collect();
        self.actuals.actuals_by_month(year, &months).await
    }

    /// Budget vs actual for a quarter or a month of the scenario's year.
    pub async fn get_reconciliation(
        &self,
        id: ScenarioId,
        view: ReconciliationView,
    ) -> Result<ReconciliationReport, BudgetError> {
        let snapshot = self.snapshot(id).await?;
        let actuals = self
            .actuals
            .actuals_by_month(snapshot.scenario.year, &view.months())
            .await?;

        Ok(Reconciler::build(
            &snapshot.definition,
            &snapshot.distributions(),
            &actuals,
            view,
        ))
    }

    /// Splits a yearly amount across the twelve months and persists all of
    /// it in one transaction.
    pub async fn distribute_yearly_budget(
        &self,
        id: ScenarioId,
        category_id: CategoryId,
        yearly_amount: Decimal,
    ) -> Result<MonthlyDistribution, BudgetError> {
        let distribution = MonthlyDistribution::from_yearly(yearly_amount)?;
        self.repo
            .write_distribution(id, category_id, distribution)
            .await
    }

    /// Sets one month and re-derives the yearly figure.
    pub async fn set_month_budget(
        &self,
        id: ScenarioId,
        category_id: CategoryId,
        month: i64,
        amount: Decimal,
    ) -> Result<MonthlyDistribution, BudgetError> {
        let month = Month::new(month)?;
        let amount = checked_cents(amount)?;
        self.repo.write_month(id, category_id, month, amount).await
    }

    /// Sets the one-way `yearly_confirmed` flag. Idempotent.
    pub async fn confirm_yearly_budget(&self, id: ScenarioId) -> Result<BudgetScenario, BudgetError> {
        self.repo
            .confirm_yearly(id)
            .await?
            .ok_or(BudgetError::ScenarioNotFound(id))
    }

    /// `Unlocked -> Locked`; reports `changed: false` if already locked.
    pub async fn lock_quarter(
        &self,
        id: ScenarioId,
        quarter: i64,
    ) -> Result<QuarterLockOutcome, BudgetError> {
        self.transition(id, quarter, LockAction::Lock).await
    }

    /// `Locked -> Unlocked`; reports `changed: false` if already unlocked.
    pub async fn unlock_quarter(
        &self,
        id: ScenarioId,
        quarter: i64,
    ) -> Result<QuarterLockOutcome, BudgetError> {
        self.transition(id, quarter, LockAction::Unlock).await
    }

    async fn transition(
        &self,
        id: ScenarioId,
        quarter: i64,
        action: LockAction,
    ) -> Result<QuarterLockOutcome, BudgetError> {
        let quarter = Quarter::from_number(quarter)?;
        self.repo
            .set_quarter_lock(id, quarter, action)
            .await?
            .ok_or(BudgetError::ScenarioNotFound(id))
    }

    /// Creates a scenario, optionally seeded from another scenario and/or
    /// the previous year's actuals. New scenarios start inactive,
    /// unconfirmed and unlocked.
    pub async fn create_scenario(
        &self,
        input: CreateScenarioInput,
    ) -> Result<BudgetScenario, BudgetError> {
        let name = normalize_name(&input.name)?;
        let year = validate_year(input.year)?;

        let source = match input.copy_budgets_from {
            Some(source_id) => Some(self.snapshot(source_id).await?),
            None => None,
        };
        let prior_actuals = if input.seed_reference_from_actuals {
            let all_months: Vec<Month> = Month::all().collect();
            Some(self.actuals.actuals_by_month(year - 1, &all_months).await?)
        } else {
            None
        };

        let figures = if source.is_some() || prior_actuals.is_some() {
            let definition = match &source {
                Some(snapshot) => snapshot.definition.clone(),
                None => self.repo.load_definition().await?,
            };
            seed_figures(
                &definition.categories,
                source.as_ref(),
                prior_actuals.as_ref(),
            )
        } else {
            Vec::new()
        };

        self.repo
            .create_scenario(NewScenario {
                id: ScenarioId::new(),
                name,
                year,
                notes: normalize_notes(input.notes.as_deref()),
                figures,
            })
            .await
    }

    /// Marks a scenario active for its year.
    pub async fn activate_scenario(&self, id: ScenarioId) -> Result<BudgetScenario, BudgetError> {
        self.repo
            .activate_scenario(id)
            .await?
            .ok_or(BudgetError::ScenarioNotFound(id))
    }

    /// Renames a scenario.
    pub async fn rename_scenario(
        &self,
        id: ScenarioId,
        name: &str,
    ) -> Result<BudgetScenario, BudgetError> {
        let name = normalize_name(name)?;
        self.update_metadata(
            id,
            ScenarioMetadataUpdate {
                name: Some(name),
                notes: None,
            },
        )
        .await
    }

    /// Replaces the notes; blank text clears them.
    pub async fn update_notes(
        &self,
        id: ScenarioId,
        notes: Option<&str>,
    ) -> Result<BudgetScenario, BudgetError> {
        self.update_metadata(
            id,
            ScenarioMetadataUpdate {
                name: None,
                notes: Some(normalize_notes(notes)),
            },
        )
        .await
    }

    async fn update_metadata(
        &self,
        id: ScenarioId,
        update: ScenarioMetadataUpdate,
    ) -> Result<BudgetScenario, BudgetError> {
        self.repo
            .update_metadata(id, update)
            .await?
            .ok_or(BudgetError::ScenarioNotFound(id))
    }

    /// Runs the notes through the cleanup service with a summary of the
    /// scenario. The result is returned, not saved.
    pub async fn cleanup_notes<N: NotesAssistant>(
        &self,
        assistant: &N,
        id: ScenarioId,
        text: &str,
    ) -> Result<String, BudgetError> {
        let snapshot = self.snapshot(id).await?;
        let classes = HierarchyAggregator::build(&snapshot.definition, &snapshot.figures);
        let context = NotesContext::from_hierarchy(&snapshot.scenario, &classes);
        assistant.cleanup(&context, text).await
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
