//! Budget schema migration.
//!
//! Creates the category hierarchy, scenarios, per-leaf figures, monthly
//! allocations and the ledger transactions table the actuals are read from.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: CATEGORY HIERARCHY
        // ============================================================
        db.execute_unprepared(HIERARCHY_SQL).await?;

        // ============================================================
        // PART 2: SCENARIOS & FIGURES
        // ============================================================
        db.execute_unprepared(SCENARIOS_SQL).await?;
        db.execute_unprepared(FIGURES_SQL).await?;

        // ============================================================
        // PART 3: LEDGER (external, read-only to the engine)
        // ============================================================
        db.execute_unprepared(LEDGER_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const HIERARCHY_SQL: &str = r"
CREATE TABLE account_classes (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(120) NOT NULL,
    code VARCHAR(40) NOT NULL UNIQUE,
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE category_groups (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    class_id UUID NOT NULL REFERENCES account_classes(id) ON DELETE CASCADE,
    name VARCHAR(120) NOT NULL,
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_category_groups_class ON category_groups(class_id);

CREATE TABLE sub_categories (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    group_id UUID NOT NULL REFERENCES category_groups(id) ON DELETE CASCADE,
    name VARCHAR(120) NOT NULL,
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_sub_categories_group ON sub_categories(group_id);
";

const SCENARIOS_SQL: &str = r"
CREATE TABLE budget_scenarios (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(120) NOT NULL,
    year INTEGER NOT NULL,
    notes TEXT,
    is_active BOOLEAN NOT NULL DEFAULT false,
    yearly_confirmed BOOLEAN NOT NULL DEFAULT false,
    q1_locked BOOLEAN NOT NULL DEFAULT false,
    q2_locked BOOLEAN NOT NULL DEFAULT false,
    q3_locked BOOLEAN NOT NULL DEFAULT false,
    q4_locked BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_scenario_year CHECK (year BETWEEN 1900 AND 9999),
    CONSTRAINT chk_scenario_name CHECK (length(trim(name)) > 0)
);

CREATE INDEX idx_budget_scenarios_year ON budget_scenarios(year DESC, name);

-- At most one active scenario per year
CREATE UNIQUE INDEX idx_budget_scenarios_active ON budget_scenarios(year) WHERE is_active;
";

const FIGURES_SQL: &str = r"
CREATE TABLE scenario_category_figures (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    scenario_id UUID NOT NULL REFERENCES budget_scenarios(id) ON DELETE CASCADE,
    category_id UUID NOT NULL REFERENCES sub_categories(id) ON DELETE CASCADE,
    reference_amount NUMERIC(19, 2) NOT NULL DEFAULT 0,
    yearly_budget NUMERIC(19, 2) NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_figures_scenario_category UNIQUE (scenario_id, category_id)
);

CREATE TABLE monthly_allocations (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    scenario_id UUID NOT NULL REFERENCES budget_scenarios(id) ON DELETE CASCADE,
    category_id UUID NOT NULL REFERENCES sub_categories(id) ON DELETE CASCADE,
    month SMALLINT NOT NULL,
    amount NUMERIC(19, 2) NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_allocation_month CHECK (month BETWEEN 1 AND 12),
    CONSTRAINT uq_allocation_scenario_category_month UNIQUE (scenario_id, category_id, month)
);
";

const LEDGER_SQL: &str = r"
CREATE TABLE IF NOT EXISTS ledger_transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    category_id UUID REFERENCES sub_categories(id) ON DELETE SET NULL,
    transaction_date DATE NOT NULL,
    amount NUMERIC(19, 2) NOT NULL,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- Actuals are read by date range, grouped by category
CREATE INDEX IF NOT EXISTS idx_ledger_transactions_date
    ON ledger_transactions(transaction_date, category_id);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS ledger_transactions CASCADE;
DROP TABLE IF EXISTS monthly_allocations CASCADE;
DROP TABLE IF EXISTS scenario_category_figures CASCADE;
DROP TABLE IF EXISTS budget_scenarios CASCADE;
DROP TABLE IF EXISTS sub_categories CASCADE;
DROP TABLE IF EXISTS category_groups CASCADE;
DROP TABLE IF EXISTS account_classes CASCADE;
";
