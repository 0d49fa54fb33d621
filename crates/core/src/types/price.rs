//! Type-safe price representation using decimal arithmetic.
//!
//! Prices arrive from the remote store as JSON numbers or strings and from
//! product forms as free text. [`Price::parse`] is the strict boundary parser;
//! [`Price::parse_lenient`] applies the form policy of coercing anything
//! unusable to zero.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Currency symbol used when formatting prices for display.
pub const CURRENCY_SYMBOL: &str = "R$";

/// Errors that can occur when parsing a [`Price`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is empty or whitespace.
    #[error("price cannot be empty")]
    Empty,
    /// The input is not a decimal number.
    #[error("price is not a number: {0}")]
    NotANumber(String),
    /// The input is below zero.
    #[error("price cannot be negative")]
    Negative,
}

/// A non-negative product price in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A price of zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Returns the amount in the currency's standard unit.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Parse a price from user input.
    ///
    /// Accepts plain decimals (`"19.90"`) and scientific notation (`"1e3"`),
    /// ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, not a number, or negative.
    pub fn parse(input: &str) -> Result<Self, PriceError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PriceError::Empty);
        }

        let amount = Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| PriceError::NotANumber(trimmed.to_owned()))?;

        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }

        Ok(Self(amount.normalize()))
    }

    /// Parse a price from a product form, coercing invalid input to zero.
    ///
    /// Empty, non-numeric, and negative inputs all become [`Price::ZERO`].
    #[must_use]
    pub fn parse_lenient(input: &str) -> Self {
        Self::parse(input).unwrap_or(Self::ZERO)
    }

    /// Price of `quantity` units.
    #[must_use]
    pub fn times(&self, quantity: i32) -> Decimal {
        self.0 * Decimal::from(quantity)
    }

    /// Format for display (e.g., "R$ 19.90").
    #[must_use]
    pub fn display(&self) -> String {
        format_amount(self.0)
    }
}

/// Format an arbitrary amount with the store currency symbol and two places.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    format!("{CURRENCY_SYMBOL} {:.2}", amount.round_dp(2))
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        let price = Price::parse("199.99").unwrap();
        assert_eq!(price.amount(), Decimal::new(19999, 2));
    }

    #[test]
    fn test_parse_trims_and_accepts_scientific() {
        assert_eq!(Price::parse("  12 ").unwrap().amount(), Decimal::from(12));
        assert_eq!(Price::parse("1e3").unwrap().amount(), Decimal::from(1000));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(Price::parse(""), Err(PriceError::Empty));
        assert_eq!(Price::parse("   "), Err(PriceError::Empty));
        assert!(matches!(Price::parse("abc"), Err(PriceError::NotANumber(_))));
        assert_eq!(Price::parse("-5"), Err(PriceError::Negative));
    }

    #[test]
    fn test_parse_lenient_coerces_to_zero() {
        assert_eq!(Price::parse_lenient("abc"), Price::ZERO);
        assert_eq!(Price::parse_lenient(""), Price::ZERO);
        assert_eq!(Price::parse_lenient("-3"), Price::ZERO);
        assert_eq!(
            Price::parse_lenient("10.5").amount(),
            Decimal::new(105, 1)
        );
    }

    #[test]
    fn test_deserialize_from_number_and_string() {
        let from_number: Price = serde_json::from_str("199.99").unwrap();
        let from_string: Price = serde_json::from_str("\"199.99\"").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(from_number.amount(), Decimal::new(19999, 2));
    }

    #[test]
    fn test_times_and_display() {
        let price = Price::parse("2.5").unwrap();
        assert_eq!(price.times(3), Decimal::new(75, 1));
        assert_eq!(price.display(), "R$ 2.50");
    }
}
