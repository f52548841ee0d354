//! Class -> group -> leaf aggregation.
//!
//! Aggregates are recomputed on every read and never stored. Ordering is
//! defined once here and shared by the monthly detail and reconciliation
//! views.

use std::collections::HashMap;

use budgetlock_shared::types::{CategoryGroupId, CategoryId, ClassId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{
    CategoryFigures, CategoryRecord, ClassKind, ClassRecord, GroupRecord, HierarchyDefinition,
};

/// Reference, budget and their difference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Figures {
    /// Prior-period baseline.
    pub reference: Decimal,
    /// Planned amount.
    pub budget: Decimal,
    /// `budget - reference`.
    pub change: Decimal,
}

impl Figures {
    /// Builds figures and derives the change.
    #[must_use]
    pub fn new(reference: Decimal, budget: Decimal) -> Self {
        Self {
            reference,
            budget,
            change: budget - reference,
        }
    }

    /// Sums references and budgets independently, then re-derives the change.
    pub fn sum<I: IntoIterator<Item = Self>>(items: I) -> Self {
        let (reference, budget) = items
            .into_iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(r, b), f| {
                (r + f.reference, b + f.budget)
            });
        Self::new(reference, budget)
    }
}

/// A leaf category with its figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafNode {
    /// Category ID.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// Declared order.
    pub sort_order: i32,
    /// Prior-period baseline.
    pub reference: Decimal,
    /// Yearly budget.
    pub budget: Decimal,
    /// `budget - reference`.
    pub change: Decimal,
    /// Favorability under the owning class's kind.
    pub favorable: bool,
}

impl LeafNode {
    /// The leaf's figures.
    #[must_use]
    pub fn figures(&self) -> Figures {
        Figures::new(self.reference, self.budget)
    }
}

/// A category group with aggregated figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupNode {
    /// Group ID.
    pub id: CategoryGroupId,
    /// Display name.
    pub name: String,
    /// Declared order.
    pub sort_order: i32,
    /// Sum of leaf references.
    pub total_reference: Decimal,
    /// Sum of leaf budgets.
    pub total_budget: Decimal,
    /// `total_budget - total_reference`.
    pub total_change: Decimal,
    /// Favorability under the owning class's kind.
    pub favorable: bool,
    /// Leaves in hierarchy order.
    pub categories: Vec<LeafNode>,
}

impl GroupNode {
    /// The group's aggregated figures.
    #[must_use]
    pub fn figures(&self) -> Figures {
        Figures::new(self.total_reference, self.total_budget)
    }
}

/// A top-level class with aggregated figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNode {
    /// Class ID.
    pub id: ClassId,
    /// Display name.
    pub name: String,
    /// Class code.
    pub code: String,
    /// Revenue or expense.
    pub kind: ClassKind,
    /// Declared order within its kind.
    pub sort_order: i32,
    /// Sum of group references.
    pub total_reference: Decimal,
    /// Sum of group budgets.
    pub total_budget: Decimal,
    /// `total_budget - total_reference`.
    pub total_change: Decimal,
    /// Favorability under this class's kind.
    pub favorable: bool,
    /// Groups in hierarchy order.
    pub groups: Vec<GroupNode>,
}

impl ClassNode {
    /// The class's aggregated figures.
    #[must_use]
    pub fn figures(&self) -> Figures {
        Figures::new(self.total_reference, self.total_budget)
    }

    /// Iterates every leaf of the class.
    pub fn leaves(&self) -> impl Iterator<Item = &LeafNode> {
        self.groups.iter().flat_map(|g| g.categories.iter())
    }
}

/// Per-kind aggregates across all classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindTotals {
    /// Revenue classes.
    pub revenue: Figures,
    /// Expense classes.
    pub expenses: Figures,
}

/// A class with its groups and leaves, borrowed from a definition and sorted.
#[derive(Debug, Clone)]
pub struct ClassBranch<'a> {
    /// Class record.
    pub class: &'a ClassRecord,
    /// Groups in order.
    pub groups: Vec<GroupBranch<'a>>,
}

/// A group with its leaves, sorted.
#[derive(Debug, Clone)]
pub struct GroupBranch<'a> {
    /// Group record.
    pub group: &'a GroupRecord,
    /// Leaves in order.
    pub categories: Vec<&'a CategoryRecord>,
}

/// Arranges a definition into hierarchy order.
///
/// Classes: revenue first, then by `sort_order`, name and id. Groups and
/// leaves: by `sort_order`, name and id. Groups whose class is unknown and
/// leaves whose group is unknown are skipped.
#[must_use]
pub fn ordered_tree(definition: &HierarchyDefinition) -> Vec<ClassBranch<'_>> {
    let mut leaves_by_group: HashMap<CategoryGroupId, Vec<&CategoryRecord>> = HashMap::new();
    for category in &definition.categories {
        leaves_by_group
            .entry(category.group_id)
            .or_default()
            .push(category);
    }

    let mut groups_by_class: HashMap<ClassId, Vec<GroupBranch<'_>>> = HashMap::new();
    for group in &definition.groups {
        let mut categories = leaves_by_group.remove(&group.id).unwrap_or_default();
        categories.sort_by(|a, b| (a.sort_order, &a.name, a.id).cmp(&(b.sort_order, &b.name, b.id)));
        groups_by_class
            .entry(group.class_id)
            .or_default()
            .push(GroupBranch { group, categories });
    }

    let mut classes: Vec<ClassBranch<'_>> = definition
        .classes
        .iter()
        .map(|class| {
            let mut groups = groups_by_class.remove(&class.id).unwrap_or_default();
            groups.sort_by(|a, b| {
                (a.group.sort_order, &a.group.name, a.group.id).cmp(&(
                    b.group.sort_order,
                    &b.group.name,
                    b.group.id,
                ))
            });
            ClassBranch { class, groups }
        })
        .collect();

    classes.sort_by(|a, b| {
        (
            a.class.kind().ordering_key(),
            a.class.sort_order,
            &a.class.name,
            a.class.id,
        )
            .cmp(&(
                b.class.kind().ordering_key(),
                b.class.sort_order,
                &b.class.name,
                b.class.id,
            ))
    });
    classes
}

/// Every leaf paired with its class kind, in hierarchy order.
#[must_use]
pub fn ordered_leaves(definition: &HierarchyDefinition) -> Vec<(ClassKind, &CategoryRecord)> {
    ordered_tree(definition)
        .into_iter()
        .flat_map(|branch| {
            let kind = branch.class.kind();
            branch
                .groups
                .into_iter()
                .flat_map(move |g| g.categories.into_iter().map(move |c| (kind, c)))
        })
        .collect()
}

/// Builds the reference/budget/change tree.
pub struct HierarchyAggregator;

impl HierarchyAggregator {
    /// Aggregates stored per-leaf figures into the full tree. Leaves without
    /// stored figures read as zero.
    #[must_use]
    pub fn build(definition: &HierarchyDefinition, figures: &[CategoryFigures]) -> Vec<ClassNode> {
        let by_leaf: HashMap<CategoryId, Figures> = figures
            .iter()
            .map(|f| (f.category_id, Figures::new(f.reference, f.budget)))
            .collect();

        ordered_tree(definition)
            .into_iter()
            .map(|branch| {
                let kind = branch.class.kind();
                let groups: Vec<GroupNode> = branch
                    .groups
                    .into_iter()
                    .map(|g| Self::build_group(kind, &g, &by_leaf))
                    .collect();
                let totals = Figures::sum(groups.iter().map(GroupNode::figures));

                ClassNode {
                    id: branch.class.id,
                    name: branch.class.name.clone(),
                    code: branch.class.code.clone(),
                    kind,
                    sort_order: branch.class.sort_order,
                    total_reference: totals.reference,
                    total_budget: totals.budget,
                    total_change: totals.change,
                    favorable: kind.is_favorable_change(totals.change),
                    groups,
                }
            })
            .collect()
    }

    fn build_group(
        kind: ClassKind,
        branch: &GroupBranch<'_>,
        by_leaf: &HashMap<CategoryId, Figures>,
    ) -> GroupNode {
        let categories: Vec<LeafNode> = branch
            .categories
            .iter()
            .map(|c| {
                let f = by_leaf.get(&c.id).copied().unwrap_or_default();
                LeafNode {
                    id: c.id,
                    name: c.name.clone(),
                    sort_order: c.sort_order,
                    reference: f.reference,
                    budget: f.budget,
                    change: f.change,
                    favorable: kind.is_favorable_change(f.change),
                }
            })
            .collect();
        let totals = Figures::sum(categories.iter().map(LeafNode::figures));

        GroupNode {
            id: branch.group.id,
            name: branch.group.name.clone(),
            sort_order: branch.group.sort_order,
            total_reference: totals.reference,
            total_budget: totals.budget,
            total_change: totals.change,
            favorable: kind.is_favorable_change(totals.change),
            categories,
        }
    }

    /// Recomputes every aggregate two ways (from children and directly from
    /// leaves) and checks they agree with the stored node figures.
    #[must_use]
    pub fn is_consistent(classes: &[ClassNode]) -> bool {
        classes.iter().all(|class| {
            let from_groups = Figures::sum(class.groups.iter().map(GroupNode::figures));
            let from_leaves = Figures::sum(class.leaves().map(LeafNode::figures));

            let groups_ok = class.groups.iter().all(|g| {
                let own = g.figures();
                own.change == g.total_change
                    && own == Figures::sum(g.categories.iter().map(LeafNode::figures))
            });
            let leaves_ok = class.leaves().all(|l| l.change == l.budget - l.reference);

            groups_ok
                && leaves_ok
                && from_groups == from_leaves
                && from_groups == class.figures()
                && class.total_change == from_groups.change
        })
    }

    /// Sums class figures per kind.
    #[must_use]
    pub fn totals_by_kind(classes: &[ClassNode]) -> KindTotals {
        let of_kind = |kind: ClassKind| {
            Figures::sum(
                classes
                    .iter()
                    .filter(|c| c.kind == kind)
                    .map(ClassNode::figures),
            )
        };
        KindTotals {
            revenue: of_kind(ClassKind::Revenue),
            expenses: of_kind(ClassKind::Expense),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// Revenue (Sales: Online, Retail) and OPEX (Staff: Wages; Office: Rent).
    pub(crate) struct Fixture {
        pub definition: HierarchyDefinition,
        pub online: CategoryId,
        pub retail: CategoryId,
        pub wages: CategoryId,
        pub rent: CategoryId,
    }

    pub(crate) fn fixture() -> Fixture {
        let revenue = ClassId::new();
        let opex = ClassId::new();
        let sales = CategoryGroupId::new();
        let staff = CategoryGroupId::new();
        let office = CategoryGroupId::new();
        let (online, retail, wages, rent) = (
            CategoryId::new(),
            CategoryId::new(),
            CategoryId::new(),
            CategoryId::new(),
        );

        let leaf = |id, group_id, name: &str, sort_order| CategoryRecord {
            id,
            group_id,
            name: name.to_string(),
            sort_order,
        };

        let definition = HierarchyDefinition {
            // Expense class listed first with a lower sort order; revenue must still lead.
            classes: vec![
                ClassRecord {
                    id: opex,
                    name: "Operating Expenses".to_string(),
                    code: "OPEX".to_string(),
                    sort_order: 0,
                },
                ClassRecord {
                    id: revenue,
                    name: "Revenue".to_string(),
                    code: "REVENUE".to_string(),
                    sort_order: 5,
                },
            ],
            groups: vec![
                GroupRecord {
                    id: office,
                    class_id: opex,
                    name: "Office".to_string(),
                    sort_order: 2,
                },
                GroupRecord {
                    id: staff,
                    class_id: opex,
                    name: "Staff".to_string(),
                    sort_order: 1,
                },
                GroupRecord {
                    id: sales,
                    class_id: revenue,
                    name: "Sales".to_string(),
                    sort_order: 1,
                },
            ],
            categories: vec![
                leaf(retail, sales, "Retail", 1),
                leaf(online, sales, "Online", 1),
                leaf(wages, staff, "Wages", 1),
                leaf(rent, office, "Rent", 1),
            ],
        };

        Fixture {
            definition,
            online,
            retail,
            wages,
            rent,
        }
    }

    fn figures(category_id: CategoryId, reference: Decimal, budget: Decimal) -> CategoryFigures {
        CategoryFigures {
            category_id,
            reference,
            budget,
        }
    }

    #[test]
    fn test_revenue_classes_come_first() {
        let fx = fixture();
        let tree = HierarchyAggregator::build(&fx.definition, &[]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].kind, ClassKind::Revenue);
        assert_eq!(tree[1].kind, ClassKind::Expense);
    }

    #[test]
    fn test_groups_and_leaves_ordered_by_sort_then_name() {
        let fx = fixture();
        let tree = HierarchyAggregator::build(&fx.definition, &[]);

        let sales = &tree[0].groups[0];
        let names: Vec<&str> = sales.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Online", "Retail"]);

        let groups: Vec<&str> = tree[1].groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(groups, vec!["Staff", "Office"]);
    }

    #[test]
    fn test_missing_figures_read_as_zero() {
        let fx = fixture();
        let tree = HierarchyAggregator::build(&fx.definition, &[]);

        for class in &tree {
            assert_eq!(class.total_budget, Decimal::ZERO);
            assert!(class.favorable);
            for leaf in class.leaves() {
                assert_eq!(leaf.reference, Decimal::ZERO);
                assert_eq!(leaf.change, Decimal::ZERO);
            }
        }
    }

    #[test]
    fn test_aggregation_sums_children() {
        let fx = fixture();
        let tree = HierarchyAggregator::build(
            &fx.definition,
            &[
                figures(fx.online, dec!(1000), dec!(1200)),
                figures(fx.retail, dec!(500), dec!(450)),
                figures(fx.wages, dec!(3000), dec!(3100)),
                figures(fx.rent, dec!(1200), dec!(1000)),
            ],
        );

        let revenue = &tree[0];
        assert_eq!(revenue.total_reference, dec!(1500));
        assert_eq!(revenue.total_budget, dec!(1650));
        assert_eq!(revenue.total_change, dec!(150));
        assert!(revenue.favorable);

        let opex = &tree[1];
        assert_eq!(opex.total_reference, dec!(4200));
        assert_eq!(opex.total_budget, dec!(4100));
        assert_eq!(opex.total_change, dec!(-100));
        assert!(opex.favorable);

        assert!(HierarchyAggregator::is_consistent(&tree));
    }

    #[test]
    fn test_leaf_favorability_uses_class_kind() {
        let fx = fixture();
        let tree = HierarchyAggregator::build(
            &fx.definition,
            &[
                // Revenue leaf shrinking inside a growing revenue class.
                figures(fx.online, dec!(1000), dec!(1500)),
                figures(fx.retail, dec!(500), dec!(400)),
                // Expense leaf growing inside a shrinking expense class.
                figures(fx.wages, dec!(3000), dec!(3050)),
                figures(fx.rent, dec!(1200), dec!(900)),
            ],
        );

        let sales = &tree[0].groups[0];
        assert!(sales.favorable);
        assert!(sales.categories[0].favorable);
        assert!(!sales.categories[1].favorable);

        let opex = &tree[1];
        assert!(opex.favorable);
        let wages = &opex.groups[0].categories[0];
        assert_eq!(wages.change, dec!(50));
        assert!(!wages.favorable);
    }

    #[test]
    fn test_inconsistent_tree_detected() {
        let fx = fixture();
        let mut tree =
            HierarchyAggregator::build(&fx.definition, &[figures(fx.rent, dec!(10), dec!(20))]);
        assert!(HierarchyAggregator::is_consistent(&tree));

        tree[1].total_budget += dec!(0.01);
        assert!(!HierarchyAggregator::is_consistent(&tree));
    }

    #[test]
    fn test_totals_by_kind() {
        let fx = fixture();
        let tree = HierarchyAggregator::build(
            &fx.definition,
            &[
                figures(fx.online, dec!(100), dec!(110)),
                figures(fx.rent, dec!(40), dec!(30)),
            ],
        );

        let totals = HierarchyAggregator::totals_by_kind(&tree);
        assert_eq!(totals.revenue, Figures::new(dec!(100), dec!(110)));
        assert_eq!(totals.expenses, Figures::new(dec!(40), dec!(30)));
    }

    #[test]
    fn test_orphans_are_skipped() {
        let mut fx = fixture();
        fx.definition.categories.push(CategoryRecord {
            id: CategoryId::new(),
            group_id: CategoryGroupId::new(),
            name: "Orphan".to_string(),
            sort_order: 0,
        });

        assert_eq!(ordered_leaves(&fx.definition).len(), 4);
    }
}
