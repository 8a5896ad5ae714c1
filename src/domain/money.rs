use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// Number of decimal places kept for every monetary value.
pub const MINOR_UNIT_DP: u32 = 2;

/// A monetary value rounded half-up to the smallest currency unit.
///
/// This is a wrapper around `rust_decimal::Decimal`; every constructor and
/// every arithmetic operation re-applies the rounding rule, so values coming
/// out of the calculator, the ledger and settlement always agree to the unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

fn round(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MINOR_UNIT_DP, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MINOR_UNIT_DP);
    rounded
}

impl Money {
    /// Zero at the minor-unit scale, so it prints as `0.00`.
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, MINOR_UNIT_DP));

    pub fn new(value: Decimal) -> Self {
        Self(round(value))
    }

    /// Whole currency units, e.g. `Money::from_major(500_000)`.
    pub fn from_major(units: i64) -> Self {
        Self::new(Decimal::from(units))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn min(self, other: Self) -> Self {
        if self <= other { self } else { other }
    }

    pub fn max(self, other: Self) -> Self {
        if self >= other { self } else { other }
    }

    /// `self - rhs`, floored at zero.
    pub fn saturating_sub(self, rhs: Self) -> Self {
        (self - rhs).max(Self::ZERO)
    }

    /// Multiplies by a whole count, e.g. billable days.
    pub fn times(self, count: u32) -> Self {
        Self::new(self.0 * Decimal::from(count))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(Decimal::from_str(s.trim())?))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.0 - rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rounds_half_up() {
        assert_eq!(Money::new(dec!(10.005)), Money::new(dec!(10.01)));
        assert_eq!(Money::new(dec!(10.004)), Money::new(dec!(10.00)));
        assert_eq!(Money::new(dec!(-10.005)), Money::new(dec!(-10.01)));
    }

    #[test]
    fn test_display_uses_minor_units() {
        assert_eq!(Money::from_major(500_000).to_string(), "500000.00");
        assert_eq!(Money::new(dec!(1.5)).to_string(), "1.50");
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_major(300);
        let b = Money::from_major(500);
        assert_eq!(b - a, Money::from_major(200));
        assert_eq!(a + b, Money::from_major(800));
        assert_eq!(a.saturating_sub(b), Money::ZERO);
        assert_eq!(a.times(3), Money::from_major(900));
        assert_eq!(a.min(b), a);
        assert_eq!(a.max(b), b);
    }

    #[test]
    fn test_zero_keeps_minor_units() {
        assert_eq!(Money::ZERO.to_string(), "0.00");
        assert_eq!(Money::default().to_string(), "0.00");
        let empty: Money = std::iter::empty().sum();
        assert_eq!(empty.to_string(), "0.00");
        let floored = Money::from_major(1).saturating_sub(Money::from_major(5));
        assert_eq!(floored.to_string(), "0.00");
        assert_eq!(serde_json::to_string(&Money::ZERO).unwrap(), "\"0.00\"");
    }

    #[test]
    fn test_sum() {
        let total: Money = [Money::from_major(1), Money::new(dec!(2.25))]
            .into_iter()
            .sum();
        assert_eq!(total, Money::new(dec!(3.25)));
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            "  12.345 ".parse::<Money>().unwrap(),
            Money::new(dec!(12.35))
        );
        assert!("abc".parse::<Money>().is_err());
    }

    #[test]
    fn test_serde_rounds_on_input() {
        let money: Money = serde_json::from_str("\"1.999\"").unwrap();
        assert_eq!(money, Money::from_major(2));
        assert_eq!(serde_json::to_string(&money).unwrap(), "\"2.00\"");
    }
}
