//! Demo data seeder for Budgetlock development and testing.
//!
//! Seeds a small account hierarchy, two years of ledger transactions and a
//! confirmed, active budget scenario whose references come from the prior
//! year's actuals.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use uuid::Uuid;

use budgetlock_core::budget::{BudgetEngine, CreateScenarioInput};
use budgetlock_db::entities::prelude::{AccountClasses, LedgerTransactions};
use budgetlock_db::entities::{
    account_classes, category_groups, ledger_transactions, sub_categories,
};
use budgetlock_db::{LedgerActualsRepository, ScenarioRepository};
use budgetlock_shared::types::round_cents;

/// Year the demo scenario plans for; ledger history covers the year before.
const PLAN_YEAR: i32 = 2026;

const REVENUE_CLASS: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0101);
const OPEX_CLASS: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0102);

struct GroupSeed {
    id: u128,
    class_id: Uuid,
    name: &'static str,
    sort_order: i32,
    leaves: &'static [LeafSeed],
}

struct LeafSeed {
    id: u128,
    name: &'static str,
    /// Monthly ledger amount in cents before the seasonal step.
    monthly_cents: i64,
    /// Added per month, in cents.
    step_cents: i64,
}

const GROUPS: &[GroupSeed] = &[
    GroupSeed {
        id: 0x0201,
        class_id: REVENUE_CLASS,
        name: "Sales",
        sort_order: 0,
        leaves: &[
            LeafSeed { id: 0x0301, name: "Online sales", monthly_cents: 1_250_000, step_cents: 12_500 },
            LeafSeed { id: 0x0302, name: "Retail sales", monthly_cents: 830_000, step_cents: -4_000 },
        ],
    },
    GroupSeed {
        id: 0x0202,
        class_id: REVENUE_CLASS,
        name: "Services",
        sort_order: 1,
        leaves: &[LeafSeed { id: 0x0303, name: "Consulting", monthly_cents: 410_000, step_cents: 0 }],
    },
    GroupSeed {
        id: 0x0203,
        class_id: OPEX_CLASS,
        name: "People",
        sort_order: 0,
        leaves: &[
            LeafSeed { id: 0x0304, name: "Wages", monthly_cents: 980_000, step_cents: 0 },
            LeafSeed { id: 0x0305, name: "Benefits", monthly_cents: 145_050, step_cents: 1_000 },
        ],
    },
    GroupSeed {
        id: 0x0204,
        class_id: OPEX_CLASS,
        name: "Facilities",
        sort_order: 1,
        leaves: &[
            LeafSeed { id: 0x0306, name: "Rent", monthly_cents: 320_000, step_cents: 0 },
            LeafSeed { id: 0x0307, name: "Utilities", monthly_cents: 41_733, step_cents: -1_250 },
        ],
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = budgetlock_db::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    println!("Seeding account hierarchy...");
    seed_hierarchy(&db).await?;

    println!("Seeding ledger transactions...");
    seed_ledger(&db).await?;

    println!("Seeding budget scenario...");
    seed_scenario(&db).await?;

    println!("Seeding complete!");
    Ok(())
}

/// Seeds two classes, four groups and seven leaves with fixed IDs.
async fn seed_hierarchy(db: &DatabaseConnection) -> anyhow::Result<()> {
    if AccountClasses::find_by_id(REVENUE_CLASS)
        .one(db)
        .await?
        .is_some()
    {
        println!("  Hierarchy already exists, skipping...");
        return Ok(());
    }

    let now = Utc::now();
    for (id, name, code, sort_order) in [
        (REVENUE_CLASS, "Revenue", "REVENUE", 0),
        (OPEX_CLASS, "Operating Expenses", "OPEX", 1),
    ] {
        account_classes::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            code: Set(code.to_string()),
            sort_order: Set(sort_order),
            created_at: Set(now.into()),
        }
        .insert(db)
        .await
        .with_context(|| format!("Failed to insert class {code}"))?;
    }

    for group in GROUPS {
        category_groups::ActiveModel {
            id: Set(Uuid::from_u128(group.id)),
            class_id: Set(group.class_id),
            name: Set(group.name.to_string()),
            sort_order: Set(group.sort_order),
            created_at: Set(now.into()),
        }
        .insert(db)
        .await
        .with_context(|| format!("Failed to insert group {}", group.name))?;

        for (sort_order, leaf) in (0..).zip(group.leaves) {
            sub_categories::ActiveModel {
                id: Set(Uuid::from_u128(leaf.id)),
                group_id: Set(Uuid::from_u128(group.id)),
                name: Set(leaf.name.to_string()),
                sort_order: Set(sort_order),
                created_at: Set(now.into()),
            }
            .insert(db)
            .await
            .with_context(|| format!("Failed to insert leaf {}", leaf.name))?;
        }
    }

    println!("  Created 2 classes, {} groups", GROUPS.len());
    Ok(())
}

/// Seeds one transaction per leaf and month for the prior year, plus the
/// first quarter of the plan year.
async fn seed_ledger(db: &DatabaseConnection) -> anyhow::Result<()> {
    if LedgerTransactions::find().count(db).await? > 0 {
        println!("  Ledger already has transactions, skipping...");
        return Ok(());
    }

    let periods = (1..=12u32)
        .map(|m| (PLAN_YEAR - 1, m))
        .chain((1..=3u32).map(|m| (PLAN_YEAR, m)));

    let mut count = 0usize;
    for (year, month) in periods {
        let date = NaiveDate::from_ymd_opt(year, month, 15)
            .with_context(|| format!("Invalid ledger date {year}-{month}"))?;
        for leaf in GROUPS.iter().flat_map(|g| g.leaves) {
            let cents = leaf.monthly_cents + leaf.step_cents * i64::from(month);
            ledger_transactions::ActiveModel {
                id: Set(Uuid::now_v7()),
                category_id: Set(Some(Uuid::from_u128(leaf.id))),
                transaction_date: Set(date),
                amount: Set(Decimal::new(cents, 2)),
                description: Set(Some(format!("{} {year}-{month:02}", leaf.name))),
                created_at: Set(Utc::now().into()),
            }
            .insert(db)
            .await
            .context("Failed to insert ledger transaction")?;
            count += 1;
        }
    }

    println!("  Created {count} ledger transactions");
    Ok(())
}

/// Creates the plan scenario through the engine: references from last
/// year's actuals, budgets at +5%, then confirmed and activated.
async fn seed_scenario(db: &DatabaseConnection) -> anyhow::Result<()> {
    let engine = BudgetEngine::new(
        Arc::new(ScenarioRepository::new(db.clone())),
        Arc::new(LedgerActualsRepository::new(db.clone())),
    );

    if !engine.list_scenarios(Some(PLAN_YEAR)).await?.is_empty() {
        println!("  Scenario for {PLAN_YEAR} already exists, skipping...");
        return Ok(());
    }

    let scenario = engine
        .create_scenario(CreateScenarioInput {
            name: format!("Plan {PLAN_YEAR}"),
            year: PLAN_YEAR,
            notes: Some("Prior-year actuals plus 5%.".to_string()),
            copy_budgets_from: None,
            seed_reference_from_actuals: true,
        })
        .await?;

    let uplift = Decimal::new(105, 2);
    let leaves: Vec<_> = engine
        .get_hierarchy(scenario.id)
        .await?
        .iter()
        .flat_map(|class| class.leaves().map(|leaf| (leaf.id, leaf.reference)).collect::<Vec<_>>())
        .collect();
    for (category_id, reference) in leaves {
        engine
            .distribute_yearly_budget(scenario.id, category_id, round_cents(reference * uplift))
            .await?;
    }

    engine.confirm_yearly_budget(scenario.id).await?;
    let scenario = engine.activate_scenario(scenario.id).await?;

    println!("  Created scenario: {} ({})", scenario.name, scenario.id);
    Ok(())
}
