//! Type-safe price representation using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A unit price in the store currency.
///
/// Amounts use decimal arithmetic so that line totals are exact: a cart of
/// two items at 29.99 and one at 24.99 totals 84.97, never 84.969999….
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a new price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Price of zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Total for `quantity` units at this unit price.
    #[must_use]
    pub fn line_total(&self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Sum of two prices.
    #[must_use]
    pub fn plus(&self, other: Self) -> Self {
        Self(self.0 + other.0)
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!("${:.2}", self.0)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn price(s: &str) -> Price {
        Price::new(Decimal::from_str(s).expect("decimal literal"))
    }

    #[test]
    fn line_total_is_exact() {
        assert_eq!(price("29.99").line_total(2), price("59.98"));
        assert_eq!(price("24.99").line_total(1), price("24.99"));
    }

    #[test]
    fn sums_are_exact() {
        let total = price("29.99").line_total(2).plus(price("24.99"));
        assert_eq!(total, price("84.97"));
    }

    #[test]
    fn display_has_two_decimals() {
        assert_eq!(price("5").display(), "$5.00");
        assert_eq!(price("29.99").to_string(), "29.99");
    }
}
