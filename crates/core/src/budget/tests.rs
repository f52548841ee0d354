//! Property-based tests for the budget module.

use std::collections::HashMap;

use budgetlock_shared::types::{CategoryGroupId, CategoryId, ClassId, round_cents};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::distribution::MonthlyDistribution;
use super::hierarchy::{HierarchyAggregator, ordered_leaves};
use super::locks::{LockAction, QuarterLocks};
use super::types::{
    ActualsByMonth, CategoryFigures, CategoryRecord, ClassKind, ClassRecord, GroupRecord,
    HierarchyDefinition, Month, Quarter,
};
use super::variance::{Reconciler, ReconciliationView, VarianceFigures};

/// Amount in cents, converted to a two-decimal `Decimal`.
fn cents() -> impl Strategy<Value = Decimal> {
    (-10_000_000_000i64..10_000_000_000).prop_map(|c| Decimal::new(c, 2))
}

/// Amount with up to four decimals, to exercise pre-rounding.
fn fine_amount() -> impl Strategy<Value = Decimal> {
    (-1_000_000_000_000i64..1_000_000_000_000).prop_map(|c| Decimal::new(c, 4))
}

fn quarter() -> impl Strategy<Value = Quarter> {
    prop::sample::select(Quarter::ALL.to_vec())
}

/// A random tree: `shape[class][group]` is the number of leaves.
fn definition() -> impl Strategy<Value = HierarchyDefinition> {
    prop::collection::vec(
        (any::<bool>(), prop::collection::vec(0usize..4, 0..4)),
        1..4,
    )
    .prop_map(|shape| {
        let mut definition = HierarchyDefinition::default();
        for (ci, (is_revenue, groups)) in shape.into_iter().enumerate() {
            let class_id = ClassId::new();
            definition.classes.push(ClassRecord {
                id: class_id,
                name: format!("Class {ci}"),
                code: if is_revenue { "REVENUE" } else { "OPEX" }.to_string(),
                sort_order: 0,
            });
            for (gi, leaves) in groups.into_iter().enumerate() {
                let group_id = CategoryGroupId::new();
                definition.groups.push(GroupRecord {
                    id: group_id,
                    class_id,
                    name: format!("Group {gi}"),
                    sort_order: 0,
                });
                for li in 0..leaves {
                    definition.categories.push(CategoryRecord {
                        id: CategoryId::new(),
                        group_id,
                        name: format!("Leaf {li}"),
                        sort_order: 0,
                    });
                }
            }
        }
        definition
    })
}

fn tree_with_figures() -> impl Strategy<Value = (HierarchyDefinition, Vec<CategoryFigures>)> {
    definition().prop_flat_map(|definition| {
        let n = definition.categories.len();
        (
            Just(definition),
            prop::collection::vec((cents(), cents()), n),
        )
            .prop_map(|(definition, amounts)| {
                let figures = definition
                    .categories
                    .iter()
                    .zip(amounts)
                    .map(|(c, (reference, budget))| CategoryFigures {
                        category_id: c.id,
                        reference,
                        budget,
                    })
                    .collect();
                (definition, figures)
            })
    })
}

proptest! {
    /// The twelve months sum to the cent-normalised yearly amount exactly,
    /// and months 1-11 equal the floored base.
    #[test]
    fn test_distribution_is_exact(yearly in fine_amount()) {
        let split = MonthlyDistribution::from_yearly(yearly).unwrap();
        let normalised = round_cents(yearly);

        prop_assert_eq!(split.yearly(), normalised);
        prop_assert_eq!(split.months().iter().copied().sum::<Decimal>(), normalised);

        let base = MonthlyDistribution::monthly_base(normalised);
        for amount in &split.months()[..11] {
            prop_assert_eq!(*amount, base);
        }
        prop_assert!(base * Decimal::from(12) <= normalised);
    }

    /// Every stored value carries exactly two decimals.
    #[test]
    fn test_distribution_is_cent_scaled(yearly in fine_amount()) {
        let split = MonthlyDistribution::from_yearly(yearly).unwrap();
        for amount in split.months() {
            prop_assert_eq!(amount.scale(), 2);
        }
    }

    /// Editing one month keeps yearly == sum of months.
    #[test]
    fn test_month_edit_keeps_invariant(yearly in cents(), amount in fine_amount(), m in 1i64..=12) {
        let month = Month::new(m).unwrap();
        let edited = MonthlyDistribution::from_yearly(yearly).unwrap().with_month(month, amount);
        prop_assert_eq!(edited.months().iter().copied().sum::<Decimal>(), edited.yearly());
    }

    /// Quarter totals partition the year.
    #[test]
    fn test_quarters_partition_year(yearly in fine_amount()) {
        let split = MonthlyDistribution::from_yearly(yearly).unwrap();
        let total: Decimal = Quarter::ALL.iter().map(|q| split.quarter_total(*q)).sum();
        prop_assert_eq!(total, split.yearly());
    }

    /// Class totals equal the sum of groups and the sum of leaves.
    #[test]
    fn test_aggregation_is_consistent((definition, figures) in tree_with_figures()) {
        let tree = HierarchyAggregator::build(&definition, &figures);
        prop_assert!(HierarchyAggregator::is_consistent(&tree));

        let all_budget: Decimal = figures.iter().map(|f| f.budget).sum();
        let tree_budget: Decimal = tree.iter().map(|c| c.total_budget).sum();
        prop_assert_eq!(all_budget, tree_budget);
    }

    /// Favorability follows the owning class's kind at every level.
    #[test]
    fn test_favorability_follows_class_kind((definition, figures) in tree_with_figures()) {
        let tree = HierarchyAggregator::build(&definition, &figures);
        for class in &tree {
            let expected = |change: Decimal| match class.kind {
                ClassKind::Revenue => change >= Decimal::ZERO,
                ClassKind::Expense => change <= Decimal::ZERO,
            };
            prop_assert_eq!(class.favorable, expected(class.total_change));
            for group in &class.groups {
                prop_assert_eq!(group.favorable, expected(group.total_change));
                for leaf in &group.categories {
                    prop_assert_eq!(leaf.favorable, expected(leaf.change));
                }
            }
        }
    }

    /// Revenue classes always precede expense classes.
    #[test]
    fn test_revenue_first(definition in definition()) {
        let tree = HierarchyAggregator::build(&definition, &[]);
        let kinds: Vec<ClassKind> = tree.iter().map(|c| c.kind).collect();
        let mut sorted = kinds.clone();
        sorted.sort();
        prop_assert_eq!(kinds, sorted);
        prop_assert_eq!(ordered_leaves(&definition).len(), definition.categories.len());
    }

    /// variance == budget - actual at every level, and child variances sum
    /// to the parent's.
    #[test]
    fn test_variance_identity(
        (definition, figures) in tree_with_figures(),
        actual_cents in prop::collection::vec(cents(), 12),
        q in quarter(),
    ) {
        let distributions: HashMap<_, _> = figures
            .iter()
            .map(|f| (f.category_id, MonthlyDistribution::from_yearly(f.budget).unwrap()))
            .collect();
        let mut actuals = ActualsByMonth::new();
        for (category, amount) in definition.categories.iter().zip(actual_cents.iter().cycle()) {
            for month in q.months() {
                actuals.add(category.id, month, *amount);
            }
        }

        let report = Reconciler::build(&definition, &distributions, &actuals, ReconciliationView::Quarter(q));
        let check = |f: &VarianceFigures| f.variance == f.budget - f.actual;

        prop_assert!(check(&report.totals.net_pnl));
        for class in &report.classes {
            prop_assert!(check(&class.figures.total));
            let summed: Decimal = class.groups.iter().map(|g| g.figures.total.variance).sum();
            prop_assert_eq!(summed, class.figures.total.variance);
            for group in &class.groups {
                prop_assert!(group.figures.columns.iter().all(check));
                let summed: Decimal = group.categories.iter().map(|l| l.figures.total.variance).sum();
                prop_assert_eq!(summed, group.figures.total.variance);
            }
        }
    }

    /// A lock transition touches only its own latch, and repeating it is a no-op.
    #[test]
    fn test_lock_cas_isolated(flags in any::<[bool; 4]>(), q in quarter(), lock in any::<bool>()) {
        let locks = QuarterLocks::from_flags(flags[0], flags[1], flags[2], flags[3]);
        let action = if lock { LockAction::Lock } else { LockAction::Unlock };

        let (after, changed) = locks.apply(q, action);
        prop_assert_eq!(changed, locks.is_locked(q) != lock);
        prop_assert_eq!(after.is_locked(q), lock);
        for other in Quarter::ALL.into_iter().filter(|o| *o != q) {
            prop_assert_eq!(after.is_locked(other), locks.is_locked(other));
        }

        let (again, changed_again) = after.apply(q, action);
        prop_assert!(!changed_again);
        prop_assert_eq!(again, after);
        prop_assert_eq!(after.any_quarter_locked(), !after.locked_quarters().is_empty());
    }
}
