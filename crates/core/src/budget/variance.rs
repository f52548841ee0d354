//! Budget vs actual reconciliation.

use std::collections::HashMap;

use budgetlock_shared::types::{CategoryGroupId, CategoryId, ClassId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::distribution::MonthlyDistribution;
use super::hierarchy::ordered_tree;
use super::types::{ActualsByMonth, ClassKind, HierarchyDefinition, Month, Quarter};

/// Direction of a variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceStatus {
    /// Expense under budget, or revenue above budget.
    Favorable,
    /// Expense over budget, or revenue below budget.
    Unfavorable,
    /// Actual equals budget.
    OnBudget,
}

/// Budget, actual and `variance = budget - actual`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceFigures {
    /// Budgeted amount.
    pub budget: Decimal,
    /// Actual amount.
    pub actual: Decimal,
    /// `budget - actual`.
    pub variance: Decimal,
}

impl VarianceFigures {
    /// Computes the variance for one pair.
    #[must_use]
    pub fn compute(budget: Decimal, actual: Decimal) -> Self {
        Self {
            budget,
            actual,
            variance: budget - actual,
        }
    }

    /// Sums budgets and actuals independently, then recomputes the variance
    /// from the summed pair.
    pub fn sum<I: IntoIterator<Item = Self>>(items: I) -> Self {
        let (budget, actual) = items
            .into_iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(b, a), f| {
                (b + f.budget, a + f.actual)
            });
        Self::compute(budget, actual)
    }

    /// Classifies the variance under a class kind.
    ///
    /// Expense: positive variance (spent less) is favorable. Revenue: negative
    /// variance (earned more) is favorable.
    #[must_use]
    pub fn status(&self, kind: ClassKind) -> VarianceStatus {
        let signed = match kind {
            ClassKind::Expense => self.variance,
            ClassKind::Revenue => -self.variance,
        };
        match signed.cmp(&Decimal::ZERO) {
            std::cmp::Ordering::Greater => VarianceStatus::Favorable,
            std::cmp::Ordering::Less => VarianceStatus::Unfavorable,
            std::cmp::Ordering::Equal => VarianceStatus::OnBudget,
        }
    }
}

/// The period shape of a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ReconciliationView {
    /// Three month columns plus the quarter total.
    Quarter(Quarter),
    /// A single month column.
    Month(Month),
}

impl ReconciliationView {
    /// Month columns in calendar order.
    #[must_use]
    pub fn months(&self) -> Vec<Month> {
        match self {
            Self::Quarter(q) => q.months().to_vec(),
            Self::Month(m) => vec![*m],
        }
    }
}

/// Per-column figures plus a total column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceRow {
    /// One entry per view month, in calendar order.
    pub columns: Vec<VarianceFigures>,
    /// Sum across the columns.
    pub total: VarianceFigures,
}

impl VarianceRow {
    fn from_columns(columns: Vec<VarianceFigures>) -> Self {
        let total = VarianceFigures::sum(columns.iter().copied());
        Self { columns, total }
    }

    /// Column-wise sum of several rows of the same width.
    fn sum<'a, I: IntoIterator<Item = &'a Self>>(width: usize, rows: I) -> Self {
        let mut sums = vec![(Decimal::ZERO, Decimal::ZERO); width];
        for row in rows {
            for (slot, f) in sums.iter_mut().zip(&row.columns) {
                slot.0 += f.budget;
                slot.1 += f.actual;
            }
        }
        Self::from_columns(
            sums.into_iter()
                .map(|(b, a)| VarianceFigures::compute(b, a))
                .collect(),
        )
    }
}

/// Leaf reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafVariance {
    /// Category ID.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// Figures per column.
    pub figures: VarianceRow,
    /// Status of the total column under the owning class's kind.
    pub status: VarianceStatus,
}

/// Group reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupVariance {
    /// Group ID.
    pub id: CategoryGroupId,
    /// Display name.
    pub name: String,
    /// Column-wise sums of the leaves.
    pub figures: VarianceRow,
    /// Status of the total column.
    pub status: VarianceStatus,
    /// Leaves in hierarchy order.
    pub categories: Vec<LeafVariance>,
}

/// Class reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassVariance {
    /// Class ID.
    pub id: ClassId,
    /// Display name.
    pub name: String,
    /// Revenue or expense.
    pub kind: ClassKind,
    /// Column-wise sums of the groups.
    pub figures: VarianceRow,
    /// Status of the total column.
    pub status: VarianceStatus,
    /// Groups in hierarchy order.
    pub groups: Vec<GroupVariance>,
}

/// Revenue, expense and net figures for one column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrandTotals {
    /// Sum over revenue classes.
    pub total_revenue: VarianceFigures,
    /// Sum over expense classes.
    pub total_expenses: VarianceFigures,
    /// Revenue minus expenses.
    pub net_pnl: VarianceFigures,
}

impl GrandTotals {
    fn from_parts(revenue: VarianceFigures, expenses: VarianceFigures) -> Self {
        Self {
            total_revenue: revenue,
            total_expenses: expenses,
            net_pnl: VarianceFigures::compute(
                revenue.budget - expenses.budget,
                revenue.actual - expenses.actual,
            ),
        }
    }
}

/// Full reconciliation for one view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Requested view.
    pub view: ReconciliationView,
    /// Column months.
    pub months: Vec<Month>,
    /// Classes in hierarchy order.
    pub classes: Vec<ClassVariance>,
    /// Grand totals per column.
    pub column_totals: Vec<GrandTotals>,
    /// Grand totals of the total column.
    pub totals: GrandTotals,
}

/// Merges planned allocations with ledger actuals.
pub struct Reconciler;

impl Reconciler {
    /// Builds the reconciliation tree for a view. Leaves without allocations
    /// or actuals read as zero.
    #[must_use]
    pub fn build(
        definition: &HierarchyDefinition,
        distributions: &HashMap<CategoryId, MonthlyDistribution>,
        actuals: &ActualsByMonth,
        view: ReconciliationView,
    ) -> ReconciliationReport {
        let months = view.months();
        let width = months.len();

        let classes: Vec<ClassVariance> = ordered_tree(definition)
            .into_iter()
            .map(|branch| {
                let kind = branch.class.kind();
                let groups: Vec<GroupVariance> = branch
                    .groups
                    .into_iter()
                    .map(|g| {
                        let categories: Vec<LeafVariance> = g
                            .categories
                            .iter()
                            .map(|c| {
                                let planned = distributions.get(&c.id).copied().unwrap_or_default();
                                let figures = VarianceRow::from_columns(
                                    months
                                        .iter()
                                        .map(|m| {
                                            VarianceFigures::compute(
                                                planned.month(*m),
                                                actuals.get(c.id, *m),
                                            )
                                        })
                                        .collect(),
                                );
                                LeafVariance {
                                    id: c.id,
                                    name: c.name.clone(),
                                    status: figures.total.status(kind),
                                    figures,
                                }
                            })
                            .collect();
                        let figures = VarianceRow::sum(width, categories.iter().map(|l| &l.figures));
                        GroupVariance {
                            id: g.group.id,
                            name: g.group.name.clone(),
                            status: figures.total.status(kind),
                            figures,
                            categories,
                        }
                    })
                    .collect();
                let figures = VarianceRow::sum(width, groups.iter().map(|g| &g.figures));
                ClassVariance {
                    id: branch.class.id,
                    name: branch.class.name.clone(),
                    kind,
                    status: figures.total.status(kind),
                    figures,
                    groups,
                }
            })
            .collect();

        let revenue = VarianceRow::sum(
            width,
            classes
                .iter()
                .filter(|c| c.kind == ClassKind::Revenue)
                .map(|c| &c.figures),
        );
        let expenses = VarianceRow::sum(
            width,
            classes
                .iter()
                .filter(|c| c.kind == ClassKind::Expense)
                .map(|c| &c.figures),
        );

        let column_totals = revenue
            .columns
            .iter()
            .zip(&expenses.columns)
            .map(|(r, e)| GrandTotals::from_parts(*r, *e))
            .collect();

        ReconciliationReport {
            view,
            months,
            classes,
            column_totals,
            totals: GrandTotals::from_parts(revenue.total, expenses.total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::hierarchy::tests::fixture;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(1000), dec!(800), dec!(200), VarianceStatus::Favorable)]
    #[case(dec!(1000), dec!(1200), dec!(-200), VarianceStatus::Unfavorable)]
    #[case(dec!(1000), dec!(1000), dec!(0), VarianceStatus::OnBudget)]
    fn test_expense_variance(
        #[case] budget: Decimal,
        #[case] actual: Decimal,
        #[case] variance: Decimal,
        #[case] status: VarianceStatus,
    ) {
        let figures = VarianceFigures::compute(budget, actual);
        assert_eq!(figures.variance, variance);
        assert_eq!(figures.status(ClassKind::Expense), status);
    }

    #[test]
    fn test_revenue_status_flips() {
        let above_target = VarianceFigures::compute(dec!(1000), dec!(1200));
        assert_eq!(above_target.variance, dec!(-200));
        assert_eq!(
            above_target.status(ClassKind::Revenue),
            VarianceStatus::Favorable
        );

        let below_target = VarianceFigures::compute(dec!(1000), dec!(800));
        assert_eq!(
            below_target.status(ClassKind::Revenue),
            VarianceStatus::Unfavorable
        );
    }

    #[test]
    fn test_sum_recomputes_variance() {
        let total = VarianceFigures::sum([
            VarianceFigures::compute(dec!(10.10), dec!(5.05)),
            VarianceFigures::compute(dec!(0.01), dec!(2)),
        ]);
        assert_eq!(total, VarianceFigures::compute(dec!(10.11), dec!(7.05)));
        assert_eq!(total.variance, dec!(3.06));
    }

    #[test]
    fn test_view_months() {
        let q2: Vec<u8> = ReconciliationView::Quarter(Quarter::Q2)
            .months()
            .iter()
            .map(|m| m.number())
            .collect();
        assert_eq!(q2, vec![4, 5, 6]);

        let may = Month::new(5).unwrap();
        assert_eq!(ReconciliationView::Month(may).months(), vec![may]);
    }

    #[test]
    fn test_quarter_reconciliation() {
        let fx = fixture();
        let mut distributions = HashMap::new();
        distributions.insert(fx.online, MonthlyDistribution::from_yearly(dec!(1200)).unwrap());
        distributions.insert(fx.rent, MonthlyDistribution::from_yearly(dec!(1000)).unwrap());

        let jan = Month::new(1).unwrap();
        let mar = Month::new(3).unwrap();
        let mut actuals = ActualsByMonth::new();
        actuals.add(fx.online, jan, dec!(150));
        actuals.add(fx.rent, jan, dec!(80));
        actuals.add(fx.rent, mar, dec!(90));
        // Outside the view; must not leak into any column.
        actuals.add(fx.rent, Month::new(7).unwrap(), dec!(999));

        let report = Reconciler::build(
            &fx.definition,
            &distributions,
            &actuals,
            ReconciliationView::Quarter(Quarter::Q1),
        );

        assert_eq!(report.months.len(), 3);
        let revenue = &report.classes[0];
        assert_eq!(revenue.kind, ClassKind::Revenue);
        assert_eq!(
            revenue.figures.columns[0],
            VarianceFigures::compute(dec!(100), dec!(150))
        );
        assert_eq!(
            revenue.figures.total,
            VarianceFigures::compute(dec!(300), dec!(150))
        );

        let opex = &report.classes[1];
        assert_eq!(
            opex.figures.total,
            VarianceFigures::compute(dec!(249.99), dec!(170))
        );
        assert_eq!(opex.status, VarianceStatus::Favorable);

        assert_eq!(
            report.totals.net_pnl,
            VarianceFigures::compute(dec!(300) - dec!(249.99), dec!(150) - dec!(170))
        );
        assert_eq!(report.column_totals.len(), 3);
        assert_eq!(
            report.column_totals[0].total_expenses,
            VarianceFigures::compute(dec!(83.33), dec!(80))
        );
    }

    #[test]
    fn test_month_view_matches_quarter_column() {
        let fx = fixture();
        let mut distributions = HashMap::new();
        distributions.insert(fx.wages, MonthlyDistribution::from_yearly(dec!(3000)).unwrap());
        let feb = Month::new(2).unwrap();
        let mut actuals = ActualsByMonth::new();
        actuals.add(fx.wages, feb, dec!(260));
        actuals.add(fx.online, feb, dec!(40));

        let quarter = Reconciler::build(
            &fx.definition,
            &distributions,
            &actuals,
            ReconciliationView::Quarter(Quarter::Q1),
        );
        let month = Reconciler::build(
            &fx.definition,
            &distributions,
            &actuals,
            ReconciliationView::Month(feb),
        );

        assert_eq!(month.column_totals[0], quarter.column_totals[1]);
        assert_eq!(month.totals, month.column_totals[0]);
    }

    #[test]
    fn test_child_variances_sum_to_parent() {
        let fx = fixture();
        let mut distributions = HashMap::new();
        distributions.insert(fx.wages, MonthlyDistribution::from_yearly(dec!(-50)).unwrap());
        distributions.insert(fx.rent, MonthlyDistribution::from_yearly(dec!(1000)).unwrap());
        let mut actuals = ActualsByMonth::new();
        actuals.add(fx.rent, Month::new(12).unwrap(), dec!(12.34));

        let report = Reconciler::build(
            &fx.definition,
            &distributions,
            &actuals,
            ReconciliationView::Quarter(Quarter::Q4),
        );

        for class in &report.classes {
            let from_groups: Decimal = class.groups.iter().map(|g| g.figures.total.variance).sum();
            assert_eq!(class.figures.total.variance, from_groups);
            for group in &class.groups {
                let from_leaves: Decimal =
                    group.categories.iter().map(|l| l.figures.total.variance).sum();
                assert_eq!(group.figures.total.variance, from_leaves);
            }
        }
    }
}
