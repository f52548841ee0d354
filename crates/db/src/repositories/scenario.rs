//! Scenario repository for budget database operations.
//!
//! Every mutation runs in one transaction. Yearly-surface writes lock the
//! scenario row (`SELECT ... FOR UPDATE`) before checking the quarter-lock
//! gate, and quarter latches are flipped with a compare-and-set `UPDATE`.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, IsolationLevel, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use budgetlock_core::budget::{
    BudgetError, BudgetRepository as BudgetRepoTrait, BudgetScenario, CategoryFigures,
    CategoryRecord, ClassRecord, GroupRecord, HierarchyDefinition, LockAction, Month,
    MonthlyAllocation, MonthlyDistribution, NewScenario, Quarter, QuarterLockOutcome,
    QuarterLocks, ScenarioMetadataUpdate, ScenarioSnapshot,
};
use budgetlock_shared::types::{CategoryId, ScenarioId};

use crate::entities::{
    account_classes, budget_scenarios, category_groups, monthly_allocations,
    scenario_category_figures, sub_categories,
};

fn db_err(err: DbErr) -> BudgetError {
    BudgetError::repository(err.to_string())
}

/// Scenario repository implementation.
#[derive(Debug, Clone)]
pub struct ScenarioRepository {
    db: DatabaseConnection,
}

impl ScenarioRepository {
    /// Creates a new scenario repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads the scenario row with `FOR UPDATE` and checks that the leaf
    /// exists and no quarter is locked.
    async fn lock_for_yearly_write(
        txn: &DatabaseTransaction,
        id: ScenarioId,
        category_id: CategoryId,
    ) -> Result<(), BudgetError> {
        let scenario = budget_scenarios::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or(BudgetError::ScenarioNotFound(id))?;

        let leaf_count = sub_categories::Entity::find_by_id(category_id.into_inner())
            .count(txn)
            .await
            .map_err(db_err)?;
        if leaf_count == 0 {
            return Err(BudgetError::CategoryNotFound(category_id));
        }

        let result = locks_of(&scenario).ensure_yearly_editable(id);
        if result.is_err() {
            tracing::warn!(
                scenario_id = %id,
                category_id = %category_id,
                "Yearly write rejected: quarter locked"
            );
        }
        result
    }

    /// Upserts the stored yearly budget for a (scenario, leaf) pair, leaving
    /// the reference untouched.
    async fn upsert_yearly_budget(
        txn: &DatabaseTransaction,
        id: ScenarioId,
        category_id: CategoryId,
        yearly: Decimal,
    ) -> Result<(), BudgetError> {
        let now = Utc::now().into();
        let model = scenario_category_figures::ActiveModel {
            id: Set(Uuid::now_v7()),
            scenario_id: Set(id.into_inner()),
            category_id: Set(category_id.into_inner()),
            reference_amount: Set(Decimal::ZERO),
            yearly_budget: Set(yearly),
            updated_at: Set(now),
        };

        scenario_category_figures::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    scenario_category_figures::Column::ScenarioId,
                    scenario_category_figures::Column::CategoryId,
                ])
                .update_columns([
                    scenario_category_figures::Column::YearlyBudget,
                    scenario_category_figures::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec(txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Upserts monthly allocations for one leaf.
    async fn upsert_allocations<I>(
        txn: &DatabaseTransaction,
        id: ScenarioId,
        category_id: CategoryId,
        months: I,
    ) -> Result<(), BudgetError>
    where
        I: IntoIterator<Item = (Month, Decimal)>,
    {
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
        let models: Vec<monthly_allocations::ActiveModel> = months
            .into_iter()
            .map(|(month, amount)| monthly_allocations::ActiveModel {
                id: Set(Uuid::now_v7()),
                scenario_id: Set(id.into_inner()),
                category_id: Set(category_id.into_inner()),
                month: Set(i16::from(month.number())),
                amount: Set(amount),
                updated_at: Set(now),
            })
            .collect();
        if models.is_empty() {
            return Ok(());
        }

        monthly_allocations::Entity::insert_many(models)
            .on_conflict(
                OnConflict::columns([
                    monthly_allocations::Column::ScenarioId,
                    monthly_allocations::Column::CategoryId,
                    monthly_allocations::Column::Month,
                ])
                .update_columns([
                    monthly_allocations::Column::Amount,
                    monthly_allocations::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec(txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

impl BudgetRepoTrait for ScenarioRepository {
    async fn find_scenario(&self, id: ScenarioId) -> Result<Option<BudgetScenario>, BudgetError> {
        let model = budget_scenarios::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(to_domain))
    }

    async fn list_scenarios(&self, year: Option<i32>) -> Result<Vec<BudgetScenario>, BudgetError> {
        let mut query = budget_scenarios::Entity::find();
        if let Some(year) = year {
            query = query.filter(budget_scenarios::Column::Year.eq(year));
        }

        let models = query
            .order_by_desc(budget_scenarios::Column::Year)
            .order_by_asc(budget_scenarios::Column::Name)
            .order_by_asc(budget_scenarios::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(to_domain).collect())
    }

    async fn load_definition(&self) -> Result<HierarchyDefinition, BudgetError> {
        load_definition(&self.db).await.map_err(db_err)
    }

    async fn load_snapshot(&self, id: ScenarioId) -> Result<Option<ScenarioSnapshot>, BudgetError> {
        // One snapshot for all reads; READ COMMITTED would re-snapshot per statement
        let txn = self
            .db
            .begin_with_config(
                Some(IsolationLevel::RepeatableRead),
                Some(AccessMode::ReadOnly),
            )
            .await
            .map_err(db_err)?;

        let Some(scenario) = budget_scenarios::Entity::find_by_id(id.into_inner())
            .one(&txn)
            .await
            .map_err(db_err)?
        else {
            txn.commit().await.map_err(db_err)?;
            return Ok(None);
        };

        let definition = load_definition(&txn).await.map_err(db_err)?;

        let figures = scenario_category_figures::Entity::find()
            .filter(scenario_category_figures::Column::ScenarioId.eq(id.into_inner()))
            .all(&txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|f| CategoryFigures {
                category_id: CategoryId::from(f.category_id),
                reference: f.reference_amount,
                budget: f.yearly_budget,
            })
            .collect();

        let allocations = monthly_allocations::Entity::find()
            .filter(monthly_allocations::Column::ScenarioId.eq(id.into_inner()))
            .order_by_asc(monthly_allocations::Column::CategoryId)
            .order_by_asc(monthly_allocations::Column::Month)
            .all(&txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|a| {
                Ok(MonthlyAllocation {
                    category_id: CategoryId::from(a.category_id),
                    month: Month::new(i64::from(a.month))?,
                    amount: a.amount,
                })
            })
            .collect::<Result<Vec<_>, BudgetError>>()?;

        txn.commit().await.map_err(db_err)?;

        tracing::debug!(scenario_id = %id, "Loaded scenario snapshot");

        Ok(Some(ScenarioSnapshot {
            scenario: to_domain(scenario),
            definition,
            figures,
            allocations,
        }))
    }

    async fn create_scenario(&self, scenario: NewScenario) -> Result<BudgetScenario, BudgetError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let now = Utc::now().into();

        let model = budget_scenarios::ActiveModel {
            id: Set(scenario.id.into_inner()),
            name: Set(scenario.name),
            year: Set(scenario.year),
            notes: Set(scenario.notes),
            is_active: Set(false),
            yearly_confirmed: Set(false),
            q1_locked: Set(false),
            q2_locked: Set(false),
            q3_locked: Set(false),
            q4_locked: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        if !scenario.figures.is_empty() {
            let figure_models: Vec<scenario_category_figures::ActiveModel> = scenario
                .figures
                .iter()
                .map(|seeded| scenario_category_figures::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    scenario_id: Set(scenario.id.into_inner()),
                    category_id: Set(seeded.category_id.into_inner()),
                    reference_amount: Set(seeded.reference),
                    yearly_budget: Set(seeded.distribution.yearly()),
                    updated_at: Set(now),
                })
                .collect();
            scenario_category_figures::Entity::insert_many(figure_models)
                .exec(&txn)
                .await
                .map_err(db_err)?;

            for seeded in scenario.figures.iter().filter(|s| !s.distribution.is_zero()) {
                Self::upsert_allocations(
                    &txn,
                    scenario.id,
                    seeded.category_id,
                    seeded.distribution.iter(),
                )
                .await?;
            }
        }

        txn.commit().await.map_err(db_err)?;
        Ok(to_domain(model))
    }

    async fn activate_scenario(&self, id: ScenarioId) -> Result<Option<BudgetScenario>, BudgetError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let Some(year) = budget_scenarios::Entity::find_by_id(id.into_inner())
            .one(&txn)
            .await
            .map_err(db_err)?
            .map(|m| m.year)
        else {
            txn.commit().await.map_err(db_err)?;
            return Ok(None);
        };

        // Lock every scenario of the year in id order so concurrent
        // activations serialize instead of racing on the partial unique index
        let Some(scenario) = budget_scenarios::Entity::find()
            .filter(budget_scenarios::Column::Year.eq(year))
            .order_by_asc(budget_scenarios::Column::Id)
            .lock_exclusive()
            .all(&txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .find(|m| m.id == id.into_inner())
        else {
            txn.commit().await.map_err(db_err)?;
            return Ok(None);
        };

        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();

        // Deactivate first so the one-active-per-year index never sees two
        budget_scenarios::Entity::update_many()
            .col_expr(budget_scenarios::Column::IsActive, Expr::value(false))
            .col_expr(budget_scenarios::Column::UpdatedAt, Expr::value(now))
            .filter(budget_scenarios::Column::Year.eq(scenario.year))
            .filter(budget_scenarios::Column::Id.ne(id.into_inner()))
            .filter(budget_scenarios::Column::IsActive.eq(true))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let mut active: budget_scenarios::ActiveModel = scenario.into();
        active.is_active = Set(true);
        active.updated_at = Set(now);
        let updated = active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(Some(to_domain(updated)))
    }

    async fn update_metadata(
        &self,
        id: ScenarioId,
        update: ScenarioMetadataUpdate,
    ) -> Result<Option<BudgetScenario>, BudgetError> {
        let Some(scenario) = budget_scenarios::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let mut active: budget_scenarios::ActiveModel = scenario.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(notes) = update.notes {
            active.notes = Set(notes);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(&self.db).await.map_err(db_err)?;
        Ok(Some(to_domain(updated)))
    }

    async fn confirm_yearly(&self, id: ScenarioId) -> Result<Option<BudgetScenario>, BudgetError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        budget_scenarios::Entity::update_many()
            .col_expr(budget_scenarios::Column::YearlyConfirmed, Expr::value(true))
            .col_expr(
                budget_scenarios::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(Utc::now())),
            )
            .filter(budget_scenarios::Column::Id.eq(id.into_inner()))
            .filter(budget_scenarios::Column::YearlyConfirmed.eq(false))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let model = budget_scenarios::Entity::find_by_id(id.into_inner())
            .one(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(model.map(to_domain))
    }

    async fn set_quarter_lock(
        &self,
        id: ScenarioId,
        quarter: Quarter,
        action: LockAction,
    ) -> Result<Option<QuarterLockOutcome>, BudgetError> {
        let column = lock_column(quarter);
        let target = matches!(action, LockAction::Lock);
        let txn = self.db.begin().await.map_err(db_err)?;

        // UPDATE ... SET qN_locked = target WHERE id = $1 AND qN_locked = !target
        let result = budget_scenarios::Entity::update_many()
            .col_expr(column, Expr::value(target))
            .col_expr(
                budget_scenarios::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(Utc::now())),
            )
            .filter(budget_scenarios::Column::Id.eq(id.into_inner()))
            .filter(column.eq(!target))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let model = budget_scenarios::Entity::find_by_id(id.into_inner())
            .one(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        Ok(model.map(|m| QuarterLockOutcome {
            scenario: to_domain(m),
            quarter,
            changed: result.rows_affected == 1,
        }))
    }

    async fn write_distribution(
        &self,
        id: ScenarioId,
        category_id: CategoryId,
        distribution: MonthlyDistribution,
    ) -> Result<MonthlyDistribution, BudgetError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        Self::lock_for_yearly_write(&txn, id, category_id).await?;
        Self::upsert_yearly_budget(&txn, id, category_id, distribution.yearly()).await?;
        Self::upsert_allocations(&txn, id, category_id, distribution.iter()).await?;

        txn.commit().await.map_err(db_err)?;
        Ok(distribution)
    }

    async fn write_month(
        &self,
        id: ScenarioId,
        category_id: CategoryId,
        month: Month,
        amount: Decimal,
    ) -> Result<MonthlyDistribution, BudgetError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        Self::lock_for_yearly_write(&txn, id, category_id).await?;
        Self::upsert_allocations(&txn, id, category_id, [(month, amount)]).await?;

        let mut months = [Decimal::ZERO; 12];
        let stored = monthly_allocations::Entity::find()
            .filter(monthly_allocations::Column::ScenarioId.eq(id.into_inner()))
            .filter(monthly_allocations::Column::CategoryId.eq(category_id.into_inner()))
            .all(&txn)
            .await
            .map_err(db_err)?;
        for allocation in stored {
            let month = Month::new(i64::from(allocation.month))?;
            months[month.index()] = allocation.amount;
        }
        // Dropping the transaction on error rolls back the month upsert
        let distribution = MonthlyDistribution::from_months(months).ensure_storable()?;

        Self::upsert_yearly_budget(&txn, id, category_id, distribution.yearly()).await?;

        txn.commit().await.map_err(db_err)?;
        Ok(distribution)
    }
}

/// Reads the category tree with any connection or transaction.
async fn load_definition<C: ConnectionTrait>(db: &C) -> Result<HierarchyDefinition, DbErr> {
    let classes = account_classes::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|c| ClassRecord {
            id: c.id.into(),
            name: c.name,
            code: c.code,
            sort_order: c.sort_order,
        })
        .collect();

    let groups = category_groups::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|g| GroupRecord {
            id: g.id.into(),
            class_id: g.class_id.into(),
            name: g.name,
            sort_order: g.sort_order,
        })
        .collect();

    let categories = sub_categories::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|c| CategoryRecord {
            id: c.id.into(),
            group_id: c.group_id.into(),
            name: c.name,
            sort_order: c.sort_order,
        })
        .collect();

    Ok(HierarchyDefinition {
        classes,
        groups,
        categories,
    })
}

/// The latch column for a quarter.
const fn lock_column(quarter: Quarter) -> budget_scenarios::Column {
    match quarter {
        Quarter::Q1 => budget_scenarios::Column::Q1Locked,
        Quarter::Q2 => budget_scenarios::Column::Q2Locked,
        Quarter::Q3 => budget_scenarios::Column::Q3Locked,
        Quarter::Q4 => budget_scenarios::Column::Q4Locked,
    }
}

const fn locks_of(model: &budget_scenarios::Model) -> QuarterLocks {
    QuarterLocks::from_flags(
        model.q1_locked,
        model.q2_locked,
        model.q3_locked,
        model.q4_locked,
    )
}

/// Convert database model to domain scenario.
fn to_domain(model: budget_scenarios::Model) -> BudgetScenario {
    BudgetScenario {
        id: ScenarioId::from(model.id),
        locks: locks_of(&model),
        name: model.name,
        year: model.year,
        notes: model.notes,
        is_active: model.is_active,
        yearly_confirmed: model.yearly_confirmed,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
