//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! In floating point:  0.1 + 0.2 = 0.30000000000000004   WRONG
//! Our solution:       integer minor units (cents). 1000 / 3 = 333; we KNOW
//!                     we lost 1 cent and handle it explicitly.
//! ```
//!
//! Every monetary value in the system (product prices, sale amounts,
//! settlement totals) flows through this type. Amounts carry a currency code;
//! arithmetic is checked so that overflow and cross-currency sums are errors
//! rather than silent corruption.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Currency
// =============================================================================

/// ISO-4217-style currency code attached to every amount.
///
/// The system does no conversion between currencies; mixing them in
/// arithmetic is a [`MoneyError::CurrencyMismatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Kes,
    Usd,
    Eur,
}

impl Currency {
    /// Returns the three-letter code.
    pub const fn code(&self) -> &'static str {
        match self {
            Currency::Kes => "KES",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    /// Parses a three-letter code.
    pub fn parse(code: &str) -> Option<Currency> {
        match code {
            "KES" => Some(Currency::Kes),
            "USD" => Some(Currency::Usd),
            "EUR" => Some(Currency::Eur),
            _ => None,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::Kes
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// Money Error
// =============================================================================

/// Money arithmetic failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    /// Two amounts in different currencies were combined.
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: Currency, right: Currency },

    /// The result does not fit in 64-bit minor units.
    #[error("Money arithmetic overflow")]
    Overflow,
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents), plus its currency.
///
/// ## Design Decisions
/// - **i64 minor units**: no floating point anywhere
/// - **Checked arithmetic**: `try_add` / `multiply_quantity` return errors on
///   overflow or currency mismatch instead of wrapping
/// - **Copy**: two machine words, cheap to pass around
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    cents: i64,
    currency: Currency,
}

impl Money {
    /// Creates a Money value from minor units (cents).
    #[inline]
    pub const fn from_cents(cents: i64, currency: Currency) -> Self {
        Money { cents, currency }
    }

    /// Zero in the given currency.
    #[inline]
    pub const fn zero(currency: Currency) -> Self {
        Money { cents: 0, currency }
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the currency.
    #[inline]
    pub const fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns the major unit portion (e.g. shillings).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the minor unit portion, always 0-99.
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.cents % 100).abs()
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.cents == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Checked addition. Fails on currency mismatch or overflow.
    pub fn try_add(self, other: Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            });
        }
        let cents = self
            .cents
            .checked_add(other.cents)
            .ok_or(MoneyError::Overflow)?;
        Ok(Money {
            cents,
            currency: self.currency,
        })
    }

    /// Checked multiplication by a quantity (for line totals).
    ///
    /// ## Example
    /// ```rust
    /// use meridian_core::money::{Currency, Money};
    ///
    /// let unit_price = Money::from_cents(299, Currency::Kes);
    /// let line_total = unit_price.multiply_quantity(3).unwrap();
    /// assert_eq!(line_total.cents(), 897);
    /// ```
    pub fn multiply_quantity(self, qty: i64) -> Result<Money, MoneyError> {
        let cents = self.cents.checked_mul(qty).ok_or(MoneyError::Overflow)?;
        Ok(Money {
            cents,
            currency: self.currency,
        })
    }
}

/// Display implementation for logs and debugging. UI formatting and
/// localization belong to the presentation layer, not here.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        write!(
            f,
            "{} {}{}.{:02}",
            self.currency,
            sign,
            self.major().abs(),
            self.minor()
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099, Currency::Kes);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
        assert_eq!(money.currency(), Currency::Kes);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            format!("{}", Money::from_cents(1099, Currency::Kes)),
            "KES 10.99"
        );
        assert_eq!(
            format!("{}", Money::from_cents(-550, Currency::Usd)),
            "USD -5.50"
        );
        assert_eq!(
            format!("{}", Money::zero(Currency::Eur)),
            "EUR 0.00"
        );
    }

    #[test]
    fn test_try_add() {
        let a = Money::from_cents(1000, Currency::Kes);
        let b = Money::from_cents(500, Currency::Kes);
        assert_eq!(a.try_add(b).unwrap().cents(), 1500);
    }

    #[test]
    fn test_try_add_currency_mismatch() {
        let a = Money::from_cents(1000, Currency::Kes);
        let b = Money::from_cents(500, Currency::Usd);
        assert_eq!(
            a.try_add(b),
            Err(MoneyError::CurrencyMismatch {
                left: Currency::Kes,
                right: Currency::Usd,
            })
        );
    }

    #[test]
    fn test_try_add_overflow() {
        let a = Money::from_cents(i64::MAX, Currency::Kes);
        let b = Money::from_cents(1, Currency::Kes);
        assert_eq!(a.try_add(b), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_multiply_quantity() {
        let unit_price = Money::from_cents(299, Currency::Kes);
        let line_total = unit_price.multiply_quantity(3).unwrap();
        assert_eq!(line_total.cents(), 897);
        assert_eq!(line_total.currency(), Currency::Kes);
    }

    #[test]
    fn test_multiply_quantity_overflow() {
        let unit_price = Money::from_cents(i64::MAX / 2, Currency::Kes);
        assert_eq!(unit_price.multiply_quantity(3), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_currency_parse_roundtrip() {
        for c in [Currency::Kes, Currency::Usd, Currency::Eur] {
            assert_eq!(Currency::parse(c.code()), Some(c));
        }
        assert_eq!(Currency::parse("XYZ"), None);
    }
}
