//! Cent-precision amount helpers.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every persisted figure is a `Decimal` with exactly two fractional digits.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// Number of fractional digits kept for every amount.
pub const CENT_SCALE: u32 = 2;

/// Exclusive bound on the magnitude of a stored amount; columns are
/// `NUMERIC(19, 2)`, leaving seventeen integer digits.
pub const STORAGE_LIMIT: i64 = 100_000_000_000_000_000;

/// Whether `value` fits the `NUMERIC(19, 2)` columns amounts are stored in.
#[must_use]
pub fn fits_storage(value: Decimal) -> bool {
    value.abs() < Decimal::from(STORAGE_LIMIT)
}

/// Rounds to cents, ties toward positive infinity.
///
/// `4.125 -> 4.13`, `-4.125 -> -4.12`.
#[must_use]
pub fn round_cents(value: Decimal) -> Decimal {
    let strategy = if value.is_sign_negative() {
        RoundingStrategy::MidpointTowardZero
    } else {
        RoundingStrategy::MidpointAwayFromZero
    };
    let mut rounded = value.round_dp_with_strategy(CENT_SCALE, strategy);
    rounded.rescale(CENT_SCALE);
    rounded
}

/// Truncates to cents toward negative infinity.
///
/// `4.169 -> 4.16`, `-4.161 -> -4.17`.
#[must_use]
pub fn floor_cents(value: Decimal) -> Decimal {
    let mut floored = value.round_dp_with_strategy(CENT_SCALE, RoundingStrategy::ToNegativeInfinity);
    floored.rescale(CENT_SCALE);
    floored
}

/// Parses user-supplied amount text, coercing anything malformed to zero.
///
/// Surrounding whitespace and `,` group separators are ignored. The result is
/// rounded to cents.
#[must_use]
pub fn parse_lenient(input: &str) -> Decimal {
    let cleaned: String = input.trim().chars().filter(|c| *c != ',').collect();
    let parsed = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .unwrap_or(Decimal::ZERO);
    round_cents(parsed)
}

/// An amount accepted from callers as a JSON string, number, or null.
///
/// Malformed input deserializes to zero instead of failing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct LenientAmount(pub Decimal);

impl LenientAmount {
    /// Returns the cent-rounded amount.
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }
}

impl<'de> Deserialize<'de> for LenientAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(LenientAmountVisitor)
    }
}

struct LenientAmountVisitor;

impl<'de> Visitor<'de> for LenientAmountVisitor {
    type Value = LenientAmount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an amount as a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(LenientAmount(parse_lenient(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(LenientAmount(round_cents(Decimal::from(v))))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(LenientAmount(round_cents(Decimal::from(v))))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        // Shortest round-trip text keeps literals like 83.33 exact.
        Ok(LenientAmount(parse_lenient(&v.to_string())))
    }

    fn visit_bool<E: de::Error>(self, _v: bool) -> Result<Self::Value, E> {
        Ok(LenientAmount::default())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(LenientAmount::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(LenientAmount::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(4.125), dec!(4.13))]
    #[case(dec!(-4.125), dec!(-4.12))]
    #[case(dec!(83.37), dec!(83.37))]
    #[case(dec!(0.004), dec!(0.00))]
    #[case(dec!(-0.006), dec!(-0.01))]
    fn test_round_cents(#[case] input: Decimal, #[case] expected: Decimal) {
        assert_eq!(round_cents(input), expected);
    }

    #[rstest]
    #[case(dec!(83.3333), dec!(83.33))]
    #[case(dec!(-4.1666), dec!(-4.17))]
    #[case(dec!(8.339), dec!(8.33))]
    #[case(dec!(-4.161), dec!(-4.17))]
    #[case(dec!(0), dec!(0.00))]
    fn test_floor_cents(#[case] input: Decimal, #[case] expected: Decimal) {
        assert_eq!(floor_cents(input), expected);
    }

    #[test]
    fn test_rounded_values_carry_two_decimals() {
        assert_eq!(round_cents(dec!(12)).to_string(), "12.00");
        assert_eq!(floor_cents(dec!(-3.1)).to_string(), "-3.10");
    }

    #[rstest]
    #[case(dec!(99999999999999999.99), true)]
    #[case(dec!(-99999999999999999.99), true)]
    #[case(dec!(100000000000000000), false)]
    #[case(dec!(-100000000000000000), false)]
    #[case(Decimal::MAX, false)]
    #[case(Decimal::MIN, false)]
    fn test_fits_storage(#[case] input: Decimal, #[case] expected: bool) {
        assert_eq!(fits_storage(input), expected);
    }

    #[rstest]
    #[case("1000", dec!(1000.00))]
    #[case("  250.5 ", dec!(250.50))]
    #[case("1,234.56", dec!(1234.56))]
    #[case("-50", dec!(-50.00))]
    #[case("1e3", dec!(1000.00))]
    #[case("abc", dec!(0))]
    #[case("", dec!(0))]
    #[case("12..5", dec!(0))]
    fn test_parse_lenient(#[case] input: &str, #[case] expected: Decimal) {
        assert_eq!(parse_lenient(input), expected);
    }

    #[test]
    fn test_lenient_amount_deserialize() {
        let cases = [
            (r#""83.33""#, dec!(83.33)),
            ("83.33", dec!(83.33)),
            ("-50", dec!(-50)),
            ("null", dec!(0)),
            (r#""not a number""#, dec!(0)),
            ("true", dec!(0)),
        ];

        for (json, expected) in cases {
            let amount: LenientAmount = serde_json::from_str(json).unwrap();
            assert_eq!(amount.value(), expected, "input {json}");
        }
    }
}
