//! Budget allocation, quarter locking and reconciliation.

pub mod distribution;
pub mod error;
pub mod hierarchy;
pub mod locks;
pub mod scenario;
pub mod service;
pub mod types;
pub mod variance;

#[cfg(test)]
mod tests;

pub use distribution::{MonthlyDistribution, checked_cents};
pub use error::BudgetError;
pub use hierarchy::{ClassNode, Figures, GroupNode, HierarchyAggregator, KindTotals, LeafNode};
pub use locks::{EditSurface, LockAction, LockState, QuarterLocks};
pub use scenario::{MAX_NAME_LEN, NotesContext};
pub use service::{ActualsSource, BudgetEngine, BudgetRepository, NotesAssistant};
pub use types::{
    ActualsByMonth, BudgetScenario, CategoryFigures, CategoryRecord, ClassKind, ClassRecord,
    CreateScenarioInput, GroupRecord, HierarchyDefinition, Month, MonthlyAllocation,
    MonthlyBudgetRow, NewScenario, Quarter, QuarterLockOutcome, ScenarioMetadataUpdate,
    ScenarioSnapshot, SeededFigures,
};
pub use variance::{
    ClassVariance, GrandTotals, GroupVariance, LeafVariance, ReconciliationReport,
    ReconciliationView, Reconciler, VarianceFigures, VarianceRow, VarianceStatus,
};
