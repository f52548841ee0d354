//! Budget data types.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use budgetlock_shared::types::{CategoryGroupId, CategoryId, ClassId, ScenarioId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::distribution::MonthlyDistribution;
use super::error::BudgetError;
use super::locks::{EditSurface, QuarterLocks};

/// Kind of a top-level class.
///
/// Revenue classes sort before expense classes and flip the sign convention
/// used for favorability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    /// The income class.
    Revenue,
    /// Every other class.
    Expense,
}

impl ClassKind {
    /// Class code reserved for the income class.
    pub const REVENUE_CODE: &'static str = "REVENUE";

    /// Derives the kind from a stored class code.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case(Self::REVENUE_CODE) {
            Self::Revenue
        } else {
            Self::Expense
        }
    }

    /// Declared ordering key: revenue first.
    #[must_use]
    pub const fn ordering_key(self) -> u8 {
        match self {
            Self::Revenue => 0,
            Self::Expense => 1,
        }
    }

    /// Whether a planned change (`budget - reference`) moves in the good direction.
    ///
    /// Revenue: growth is favorable. Expense: shrinking is favorable. Zero is
    /// favorable for both.
    #[must_use]
    pub fn is_favorable_change(self, change: Decimal) -> bool {
        match self {
            Self::Revenue => change >= Decimal::ZERO,
            Self::Expense => change <= Decimal::ZERO,
        }
    }
}

/// Calendar quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub enum Quarter {
    /// January to March.
    Q1,
    /// April to June.
    Q2,
    /// July to September.
    Q3,
    /// October to December.
    Q4,
}

impl Quarter {
    /// All quarters in calendar order.
    pub const ALL: [Self; 4] = [Self::Q1, Self::Q2, Self::Q3, Self::Q4];

    /// Parses a quarter number.
    pub fn from_number(number: i64) -> Result<Self, BudgetError> {
        match number {
            1 => Ok(Self::Q1),
            2 => Ok(Self::Q2),
            3 => Ok(Self::Q3),
            4 => Ok(Self::Q4),
            other => Err(BudgetError::InvalidQuarter(other)),
        }
    }

    /// Quarter number, 1-4.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Q1 => 1,
            Self::Q2 => 2,
            Self::Q3 => 3,
            Self::Q4 => 4,
        }
    }

    /// The three months of the quarter in calendar order.
    #[must_use]
    pub const fn months(self) -> [Month; 3] {
        let first = (self.number() - 1) * 3 + 1;
        [Month(first), Month(first + 1), Month(first + 2)]
    }
}

impl TryFrom<i64> for Quarter {
    type Error = BudgetError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_number(value)
    }
}

impl From<Quarter> for u8 {
    fn from(quarter: Quarter) -> Self {
        quarter.number()
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

/// Calendar month number, always within 1-12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Month(u8);

impl Month {
    /// Validates a month number.
    pub fn new(number: i64) -> Result<Self, BudgetError> {
        match u8::try_from(number) {
            Ok(n @ 1..=12) => Ok(Self(n)),
            _ => Err(BudgetError::InvalidMonth(number)),
        }
    }

    /// All twelve months in calendar order.
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=12).map(Self)
    }

    /// Month number, 1-12.
    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }

    /// Zero-based index into a twelve-slot array.
    #[must_use]
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// Quarter containing this month.
    #[must_use]
    pub const fn quarter(self) -> Quarter {
        match (self.0 - 1) / 3 {
            0 => Quarter::Q1,
            1 => Quarter::Q2,
            2 => Quarter::Q3,
            _ => Quarter::Q4,
        }
    }
}

impl TryFrom<i64> for Month {
    type Error = BudgetError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Month> for u8 {
    fn from(month: Month) -> Self {
        month.0
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One yearly budget plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetScenario {
    /// Scenario ID.
    pub id: ScenarioId,
    /// Display name.
    pub name: String,
    /// Target year.
    pub year: i32,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Whether this is the active scenario for its year.
    pub is_active: bool,
    /// Set once by `confirm_yearly_budget`; enables the monthly-detail surface.
    pub yearly_confirmed: bool,
    /// Per-quarter lock latches.
    pub locks: QuarterLocks,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl BudgetScenario {
    /// Which edit surfaces are currently writable.
    #[must_use]
    pub fn edit_surface(&self) -> EditSurface {
        EditSurface::new(self.yearly_confirmed, self.locks)
    }
}

/// Top-level class definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    /// Class ID.
    pub id: ClassId,
    /// Display name.
    pub name: String,
    /// Class code; `REVENUE` marks the income class.
    pub code: String,
    /// Declared order within its kind.
    pub sort_order: i32,
}

impl ClassRecord {
    /// Kind derived from the class code.
    #[must_use]
    pub fn kind(&self) -> ClassKind {
        ClassKind::from_code(&self.code)
    }
}

/// Mid-level group definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    /// Group ID.
    pub id: CategoryGroupId,
    /// Owning class.
    pub class_id: ClassId,
    /// Display name.
    pub name: String,
    /// Declared order within the class.
    pub sort_order: i32,
}

/// Leaf category definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    /// Category ID.
    pub id: CategoryId,
    /// Owning group.
    pub group_id: CategoryGroupId,
    /// Display name.
    pub name: String,
    /// Declared order within the group.
    pub sort_order: i32,
}

/// The category tree shared by all scenarios.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyDefinition {
    /// Classes.
    pub classes: Vec<ClassRecord>,
    /// Groups.
    pub groups: Vec<GroupRecord>,
    /// Leaf categories.
    pub categories: Vec<CategoryRecord>,
}

impl HierarchyDefinition {
    /// Returns true if `id` is a known leaf category.
    #[must_use]
    pub fn contains_category(&self, id: CategoryId) -> bool {
        self.categories.iter().any(|c| c.id == id)
    }
}

/// Stored reference and yearly budget for one (scenario, leaf).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFigures {
    /// Leaf category.
    pub category_id: CategoryId,
    /// Prior-period actual used as the planning baseline.
    pub reference: Decimal,
    /// Yearly budget target.
    pub budget: Decimal,
}

/// One persisted monthly allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyAllocation {
    /// Leaf category.
    pub category_id: CategoryId,
    /// Calendar month.
    pub month: Month,
    /// Allocated amount.
    pub amount: Decimal,
}

/// Everything stored for one scenario, read as a single snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioSnapshot {
    /// Scenario record.
    pub scenario: BudgetScenario,
    /// Category tree.
    pub definition: HierarchyDefinition,
    /// Per-leaf reference and yearly figures.
    pub figures: Vec<CategoryFigures>,
    /// Per-leaf monthly allocations.
    pub allocations: Vec<MonthlyAllocation>,
}

impl ScenarioSnapshot {
    /// Twelve monthly allocations per leaf, missing months read as zero.
    #[must_use]
    pub fn distributions(&self) -> HashMap<CategoryId, MonthlyDistribution> {
        let mut months: HashMap<CategoryId, [Decimal; 12]> = HashMap::new();
        for allocation in &self.allocations {
            months.entry(allocation.category_id).or_insert([Decimal::ZERO; 12])
                [allocation.month.index()] = allocation.amount;
        }
        months
            .into_iter()
            .map(|(id, months)| (id, MonthlyDistribution::from_months(months)))
            .collect()
    }

    /// Twelve monthly allocations for one leaf.
    #[must_use]
    pub fn distribution_for(&self, category_id: CategoryId) -> MonthlyDistribution {
        let mut months = [Decimal::ZERO; 12];
        for allocation in self
            .allocations
            .iter()
            .filter(|a| a.category_id == category_id)
        {
            months[allocation.month.index()] = allocation.amount;
        }
        MonthlyDistribution::from_months(months)
    }
}

/// Per-quarter monthly detail for one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyBudgetRow {
    /// Leaf category.
    pub category_id: CategoryId,
    /// Leaf name.
    pub category_name: String,
    /// Quarter.
    pub quarter: Quarter,
    /// First month of the quarter.
    pub month1_budget: Decimal,
    /// Second month of the quarter.
    pub month2_budget: Decimal,
    /// Third month of the quarter.
    pub month3_budget: Decimal,
    /// Sum of the three months.
    pub q_total: Decimal,
}

/// Ledger actuals: leaf -> month -> summed amount.
///
/// Supplied by the external ledger; read-only to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActualsByMonth(HashMap<CategoryId, BTreeMap<Month, Decimal>>);

impl ActualsByMonth {
    /// Creates an empty projection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an amount to a (leaf, month) cell.
    pub fn add(&mut self, category_id: CategoryId, month: Month, amount: Decimal) {
        *self
            .0
            .entry(category_id)
            .or_default()
            .entry(month)
            .or_insert(Decimal::ZERO) += amount;
    }

    /// Actual for a (leaf, month) cell; zero when absent.
    #[must_use]
    pub fn get(&self, category_id: CategoryId, month: Month) -> Decimal {
        self.0
            .get(&category_id)
            .and_then(|months| months.get(&month))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Sum over every month present for a leaf.
    #[must_use]
    pub fn total_for(&self, category_id: CategoryId) -> Decimal {
        self.0
            .get(&category_id)
            .map(|months| months.values().copied().sum())
            .unwrap_or(Decimal::ZERO)
    }

    /// Leaves with at least one actual.
    pub fn categories(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.0.keys().copied()
    }

    /// Returns true if no actuals are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Input for creating a scenario.
#[derive(Debug, Clone)]
pub struct CreateScenarioInput {
    /// Scenario name.
    pub name: String,
    /// Target year.
    pub year: i32,
    /// Optional notes.
    pub notes: Option<String>,
    /// Copy references, yearly budgets and allocations from this scenario.
    pub copy_budgets_from: Option<ScenarioId>,
    /// Set each leaf's reference to the ledger actuals of `year - 1`.
    pub seed_reference_from_actuals: bool,
}

/// Initial figures for one leaf of a new scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededFigures {
    /// Leaf category.
    pub category_id: CategoryId,
    /// Reference baseline.
    pub reference: Decimal,
    /// Yearly budget and its twelve allocations.
    pub distribution: MonthlyDistribution,
}

/// Fully resolved scenario ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScenario {
    /// Scenario ID.
    pub id: ScenarioId,
    /// Validated name.
    pub name: String,
    /// Validated year.
    pub year: i32,
    /// Normalised notes.
    pub notes: Option<String>,
    /// Initial figures.
    pub figures: Vec<SeededFigures>,
}

/// Metadata changes; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioMetadataUpdate {
    /// New name.
    pub name: Option<String>,
    /// New notes (`Some(None)` clears them).
    pub notes: Option<Option<String>>,
}

/// Result of a compare-and-set on one quarter latch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuarterLockOutcome {
    /// Scenario state after the call.
    pub scenario: BudgetScenario,
    /// Quarter targeted.
    pub quarter: Quarter,
    /// False if the latch was already in the requested state.
    pub changed: bool,
}
