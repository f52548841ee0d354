//! Entity re-exports.

pub use super::account_classes::Entity as AccountClasses;
pub use super::budget_scenarios::Entity as BudgetScenarios;
pub use super::category_groups::Entity as CategoryGroups;
pub use super::ledger_transactions::Entity as LedgerTransactions;
pub use super::monthly_allocations::Entity as MonthlyAllocations;
pub use super::scenario_category_figures::Entity as ScenarioCategoryFigures;
pub use super::sub_categories::Entity as SubCategories;
