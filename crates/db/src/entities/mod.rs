//! `SeaORM` entity definitions.

pub mod prelude;

pub mod account_classes;
pub mod budget_scenarios;
pub mod category_groups;
pub mod ledger_transactions;
pub mod monthly_allocations;
pub mod scenario_category_figures;
pub mod sub_categories;
