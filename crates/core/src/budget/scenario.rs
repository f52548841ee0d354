//! Scenario metadata rules and seeding.

use rust_decimal::Decimal;
use serde::Serialize;

use budgetlock_shared::types::round_cents;

use super::distribution::MonthlyDistribution;
use super::error::BudgetError;
use super::hierarchy::{ClassNode, HierarchyAggregator};
use super::types::{ActualsByMonth, BudgetScenario, CategoryRecord, ScenarioSnapshot, SeededFigures};

/// Longest accepted scenario name, in characters.
pub const MAX_NAME_LEN: usize = 120;

/// Accepted target years.
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=9999;

/// Trims and validates a scenario name.
pub fn normalize_name(name: &str) -> Result<String, BudgetError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(BudgetError::InvalidName("name must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(BudgetError::InvalidName(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Validates a target year.
pub fn validate_year(year: i32) -> Result<i32, BudgetError> {
    if YEAR_RANGE.contains(&year) {
        Ok(year)
    } else {
        Err(BudgetError::InvalidYear(year))
    }
}

/// Blank or whitespace-only notes are stored as `None`.
#[must_use]
pub fn normalize_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(ToString::to_string)
}

/// Scenario summary handed to the notes cleanup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotesContext {
    /// Scenario name.
    pub scenario_name: String,
    /// Target year.
    pub year: i32,
    /// Budgeted revenue.
    pub total_budget_income: Decimal,
    /// Budgeted expenses.
    pub total_budget_expenses: Decimal,
    /// Budgeted revenue minus budgeted expenses.
    pub net_budget: Decimal,
    /// Reference revenue.
    pub total_reference_income: Decimal,
    /// Reference expenses.
    pub total_reference_expenses: Decimal,
}

impl NotesContext {
    /// Summarises a scenario's aggregated hierarchy.
    #[must_use]
    pub fn from_hierarchy(scenario: &BudgetScenario, classes: &[ClassNode]) -> Self {
        let totals = HierarchyAggregator::totals_by_kind(classes);
        Self {
            scenario_name: scenario.name.clone(),
            year: scenario.year,
            total_budget_income: totals.revenue.budget,
            total_budget_expenses: totals.expenses.budget,
            net_budget: totals.revenue.budget - totals.expenses.budget,
            total_reference_income: totals.revenue.reference,
            total_reference_expenses: totals.expenses.reference,
        }
    }
}

/// Initial per-leaf figures for a new scenario.
///
/// With a source snapshot, each leaf's reference, yearly budget and twelve
/// allocations are copied from it. With prior-year actuals, each leaf's
/// reference becomes the sum of those actuals, overriding any copied value.
/// Leaves that end up all zero are omitted.
#[must_use]
pub fn seed_figures(
    categories: &[CategoryRecord],
    source: Option<&ScenarioSnapshot>,
    prior_actuals: Option<&ActualsByMonth>,
) -> Vec<SeededFigures> {
    categories
        .iter()
        .filter_map(|category| {
            let (mut reference, distribution) = source.map_or_else(
                || (Decimal::ZERO, MonthlyDistribution::zero()),
                |snapshot| {
                    let reference = snapshot
                        .figures
                        .iter()
                        .find(|f| f.category_id == category.id)
                        .map_or(Decimal::ZERO, |f| f.reference);
                    (reference, snapshot.distribution_for(category.id))
                },
            );
            if let Some(actuals) = prior_actuals {
                reference = round_cents(actuals.total_for(category.id));
            }

            (!reference.is_zero() || !distribution.is_zero()).then_some(SeededFigures {
                category_id: category.id,
                reference,
                distribution,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::hierarchy::tests::fixture;
    use crate::budget::locks::QuarterLocks;
    use crate::budget::types::{CategoryFigures, Month, MonthlyAllocation};
    use budgetlock_shared::types::ScenarioId;
    use chrono::Utc;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn scenario(name: &str) -> BudgetScenario {
        BudgetScenario {
            id: ScenarioId::new(),
            name: name.to_string(),
            year: 2025,
            notes: None,
            is_active: false,
            yearly_confirmed: false,
            locks: QuarterLocks::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[rstest]
    #[case("  Base plan ", "Base plan")]
    #[case("Q-stretch", "Q-stretch")]
    fn test_normalize_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_name(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn test_blank_name_rejected(#[case] input: &str) {
        assert!(matches!(normalize_name(input), Err(BudgetError::InvalidName(_))));
    }

    #[test]
    fn test_name_length_counts_characters() {
        let at_limit = "é".repeat(MAX_NAME_LEN);
        assert!(normalize_name(&at_limit).is_ok());
        assert!(normalize_name(&format!("{at_limit}x")).is_err());
    }

    #[rstest]
    #[case(1900, true)]
    #[case(2025, true)]
    #[case(9999, true)]
    #[case(1899, false)]
    #[case(10_000, false)]
    fn test_validate_year(#[case] year: i32, #[case] ok: bool) {
        assert_eq!(validate_year(year).is_ok(), ok);
    }

    #[test]
    fn test_blank_notes_become_none() {
        assert_eq!(normalize_notes(None), None);
        assert_eq!(normalize_notes(Some("  \n\t")), None);
        assert_eq!(
            normalize_notes(Some(" keep hiring flat ")),
            Some("keep hiring flat".to_string())
        );
    }

    #[test]
    fn test_notes_context_totals() {
        let fx = fixture();
        let classes = HierarchyAggregator::build(
            &fx.definition,
            &[
                CategoryFigures {
                    category_id: fx.online,
                    reference: dec!(900),
                    budget: dec!(1000),
                },
                CategoryFigures {
                    category_id: fx.rent,
                    reference: dec!(500),
                    budget: dec!(400),
                },
            ],
        );

        let context = NotesContext::from_hierarchy(&scenario("Plan"), &classes);
        assert_eq!(context.total_budget_income, dec!(1000));
        assert_eq!(context.total_budget_expenses, dec!(400));
        assert_eq!(context.net_budget, dec!(600));
        assert_eq!(context.total_reference_income, dec!(900));
        assert_eq!(context.total_reference_expenses, dec!(500));
    }

    #[test]
    fn test_seed_copies_source_and_overrides_reference() {
        let fx = fixture();
        let split = MonthlyDistribution::from_yearly(dec!(1000)).unwrap();
        let source = ScenarioSnapshot {
            scenario: scenario("Source"),
            definition: fx.definition.clone(),
            figures: vec![CategoryFigures {
                category_id: fx.rent,
                reference: dec!(700),
                budget: split.yearly(),
            }],
            allocations: split
                .iter()
                .map(|(month, amount)| MonthlyAllocation {
                    category_id: fx.rent,
                    month,
                    amount,
                })
                .collect(),
        };

        let copied = seed_figures(&fx.definition.categories, Some(&source), None);
        assert_eq!(copied.len(), 1);
        assert_eq!(copied[0].reference, dec!(700));
        assert_eq!(copied[0].distribution, split);

        let mut actuals = ActualsByMonth::new();
        actuals.add(fx.rent, Month::new(1).unwrap(), dec!(60.004));
        actuals.add(fx.wages, Month::new(6).unwrap(), dec!(25));
        let seeded = seed_figures(&fx.definition.categories, Some(&source), Some(&actuals));

        let rent = seeded.iter().find(|s| s.category_id == fx.rent).unwrap();
        assert_eq!(rent.reference, dec!(60.00));
        assert_eq!(rent.distribution, split);
        let wages = seeded.iter().find(|s| s.category_id == fx.wages).unwrap();
        assert_eq!(wages.reference, dec!(25));
        assert!(wages.distribution.is_zero());
    }

    #[test]
    fn test_seed_without_sources_is_empty() {
        let fx = fixture();
        assert!(seed_figures(&fx.definition.categories, None, None).is_empty());
    }
}
