//! Yearly-to-monthly budget distribution.
//!
//! A yearly figure is split into twelve cent amounts. Months 1-11 receive the
//! yearly amount divided by twelve, truncated toward negative infinity at the
//! cent; month 12 absorbs the remainder so the twelve months always sum to the
//! yearly figure exactly.
//!
//! ```
//! use rust_decimal_macros::dec;
//! use budgetlock_core::budget::MonthlyDistribution;
//!
//! let split = MonthlyDistribution::from_yearly(dec!(1000))?;
//! assert_eq!(split.months()[0], dec!(83.33));
//! assert_eq!(split.months()[11], dec!(83.37));
//! assert_eq!(split.months().iter().sum::<rust_decimal::Decimal>(), dec!(1000));
//! # Ok::<(), budgetlock_core::budget::BudgetError>(())
//! ```

use budgetlock_shared::types::{fits_storage, floor_cents, round_cents};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::BudgetError;
use super::types::{Month, Quarter};

const MONTHS_PER_YEAR: i64 = 12;

/// Rounds a caller-supplied amount to cents, rejecting magnitudes the
/// storage columns cannot hold.
///
/// # Errors
///
/// Returns `AmountOutOfRange` when `|value| >= 10^17`, before or after rounding.
pub fn checked_cents(value: Decimal) -> Result<Decimal, BudgetError> {
    if !fits_storage(value) {
        return Err(BudgetError::AmountOutOfRange(value));
    }
    let rounded = round_cents(value);
    if fits_storage(rounded) {
        Ok(rounded)
    } else {
        Err(BudgetError::AmountOutOfRange(value))
    }
}

/// A yearly figure and the twelve monthly amounts it is split into.
///
/// Invariant: `months.iter().sum() == yearly`, exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyDistribution {
    yearly: Decimal,
    months: [Decimal; 12],
}

impl MonthlyDistribution {
    /// Splits a yearly amount across the twelve months.
    ///
    /// The amount is first rounded to cents (ties toward positive infinity);
    /// that rounded value becomes the yearly figure.
    ///
    /// # Errors
    ///
    /// Returns `AmountOutOfRange` if the amount does not fit storage.
    pub fn from_yearly(yearly: Decimal) -> Result<Self, BudgetError> {
        let yearly = checked_cents(yearly)?;
        let base = Self::monthly_base(yearly);
        let mut months = [base; 12];
        months[11] = round_cents(yearly - base * Decimal::from(MONTHS_PER_YEAR - 1));
        Ok(Self { yearly, months })
    }

    /// Builds a distribution from explicit monthly amounts; the yearly figure
    /// is their sum.
    #[must_use]
    pub fn from_months(months: [Decimal; 12]) -> Self {
        let months = months.map(round_cents);
        let yearly = months.iter().copied().sum();
        Self { yearly, months }
    }

    /// Checks that the yearly figure still fits storage after month edits.
    ///
    /// # Errors
    ///
    /// Returns `AmountOutOfRange` with the offending yearly figure.
    pub fn ensure_storable(self) -> Result<Self, BudgetError> {
        if fits_storage(self.yearly) {
            Ok(self)
        } else {
            Err(BudgetError::AmountOutOfRange(self.yearly))
        }
    }

    /// All zero.
    #[must_use]
    pub fn zero() -> Self {
        Self::from_months([Decimal::ZERO; 12])
    }

    /// The amount every month but December receives for `yearly`.
    #[must_use]
    pub fn monthly_base(yearly: Decimal) -> Decimal {
        floor_cents(yearly / Decimal::from(MONTHS_PER_YEAR))
    }

    /// Replaces a single month and re-derives the yearly figure.
    #[must_use]
    pub fn with_month(self, month: Month, amount: Decimal) -> Self {
        let mut months = self.months;
        months[month.index()] = amount;
        Self::from_months(months)
    }

    /// Yearly figure.
    #[must_use]
    pub const fn yearly(&self) -> Decimal {
        self.yearly
    }

    /// The twelve monthly amounts, January first.
    #[must_use]
    pub const fn months(&self) -> &[Decimal; 12] {
        &self.months
    }

    /// Amount for one month.
    #[must_use]
    pub const fn month(&self, month: Month) -> Decimal {
        self.months[month.index()]
    }

    /// The three amounts of a quarter, in calendar order.
    #[must_use]
    pub fn quarter(&self, quarter: Quarter) -> [Decimal; 3] {
        quarter.months().map(|m| self.month(m))
    }

    /// Sum of a quarter's three months.
    #[must_use]
    pub fn quarter_total(&self, quarter: Quarter) -> Decimal {
        self.quarter(quarter).iter().copied().sum()
    }

    /// Returns true if every month is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.months.iter().all(Decimal::is_zero)
    }

    /// Pairs each month with its amount.
    pub fn iter(&self) -> impl Iterator<Item = (Month, Decimal)> + '_ {
        Month::all().map(|m| (m, self.month(m)))
    }
}

impl Default for MonthlyDistribution {
    fn default() -> Self {
        Self::zero()
    }
}
