//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WHOLE CURRENCY UNITS                                                   │
//! │                                                                         │
//! │  The stores price everything in whole rupiah: there is no sub-unit     │
//! │  in circulation, so `Money` is simply a signed count of units.         │
//! │                                                                         │
//! │  Percentages (markups, discounts) are applied with integer math on     │
//! │  basis points, and every result is rounded half-up back to a whole     │
//! │  unit. No floating point touches a price.                              │
//! │                                                                         │
//! │    Rp 18.000 × 20% markup = Rp 21.600 → nearest 500 = Rp 21.500        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kedai_core::money::Money;
//! use kedai_core::types::Percentage;
//!
//! let price = Money::from_units(18_000);
//! let ten_percent = price.percent(Percentage::from_whole(10));
//! assert_eq!(ten_percent.units(), 1_800);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::Percentage;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in whole currency units.
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for variances and refunds
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Transparent sqlx type**: Stored as a plain INTEGER column
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Variant.base_price ──► resolve_price(channel) ──► CartLine.unit_price  │
/// │                                                          │              │
/// │                                                          ▼              │
/// │  Discount evaluation ◄── cart total ◄── Σ line totals                  │
/// │          │                                                              │
/// │          ▼                                                              │
/// │  Transaction.total ──► cash sales ──► CashierSession.expected_cash     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole currency units.
    ///
    /// ## Example
    /// ```rust
    /// use kedai_core::money::Money;
    ///
    /// let price = Money::from_units(25_000);
    /// assert_eq!(price.units(), 25_000);
    /// ```
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units)
    }

    /// Returns the value in whole currency units.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative values to zero.
    #[inline]
    pub fn non_negative(self) -> Self {
        self.max(Money::zero())
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use kedai_core::money::Money;
    ///
    /// let unit_price = Money::from_units(12_500);
    /// assert_eq!(unit_price.multiply_quantity(3).units(), 37_500);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `rate` of this amount, rounded half-up to a whole unit.
    ///
    /// ## Implementation
    /// Integer math on basis points: `(amount * bps + 5000) / 10000`.
    /// Negative amounts round symmetrically (half away from zero).
    ///
    /// ## Example
    /// ```rust
    /// use kedai_core::money::Money;
    /// use kedai_core::types::Percentage;
    ///
    /// let subtotal = Money::from_units(100_005);
    /// // 10% of 100,005 = 10,000.5 → 10,001
    /// assert_eq!(subtotal.percent(Percentage::from_whole(10)).units(), 10_001);
    /// ```
    pub fn percent(&self, rate: Percentage) -> Money {
        let product = self.0 as i128 * rate.bps() as i128;
        let rounded = if product >= 0 {
            (product + 5_000) / 10_000
        } else {
            (product - 5_000) / 10_000
        };
        Money(rounded as i64)
    }

    /// Rounds to the nearest multiple of `step`, with halves rounding up.
    ///
    /// A non-positive `step` leaves the value untouched.
    ///
    /// ## Example
    /// ```rust
    /// use kedai_core::money::Money;
    ///
    /// assert_eq!(Money::from_units(21_600).round_to_nearest(500).units(), 21_500);
    /// assert_eq!(Money::from_units(21_750).round_to_nearest(500).units(), 22_000);
    /// ```
    pub fn round_to_nearest(&self, step: i64) -> Money {
        if step <= 0 {
            return *self;
        }
        // Floor division keeps "half up" meaning "towards +∞" for negatives too.
        let shifted = self.0 as i128 + (step as i128) / 2;
        let steps = shifted.div_euclid(step as i128);
        Money((steps * step as i128) as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display uses the receipt format: `Rp 1.250.000`, `-Rp 50.000`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}Rp {}", sign, grouped)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_units(1_250_000).to_string(), "Rp 1.250.000");
        assert_eq!(Money::from_units(500).to_string(), "Rp 500");
        assert_eq!(Money::from_units(-50_000).to_string(), "-Rp 50.000");
        assert_eq!(Money::zero().to_string(), "Rp 0");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_units(10_000);
        let b = Money::from_units(2_500);

        assert_eq!((a + b).units(), 12_500);
        assert_eq!((a - b).units(), 7_500);
        assert_eq!((a * 3).units(), 30_000);
        assert_eq!((-b).units(), -2_500);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.units(), 15_000);
    }

    #[test]
    fn test_percent_rounds_half_up() {
        let amount = Money::from_units(15);
        // 15 × 10% = 1.5 → 2
        assert_eq!(amount.percent(Percentage::from_whole(10)).units(), 2);
        // 14 × 10% = 1.4 → 1
        assert_eq!(Money::from_units(14).percent(Percentage::from_whole(10)).units(), 1);
        // symmetric for negatives
        assert_eq!(Money::from_units(-15).percent(Percentage::from_whole(10)).units(), -2);
    }

    #[test]
    fn test_percent_with_fractional_rate() {
        // 12.5% of 40,000 = 5,000
        let rate = Percentage::from_bps(1_250);
        assert_eq!(Money::from_units(40_000).percent(rate).units(), 5_000);
    }

    #[test]
    fn test_round_to_nearest() {
        assert_eq!(Money::from_units(21_600).round_to_nearest(500).units(), 21_500);
        assert_eq!(Money::from_units(21_750).round_to_nearest(500).units(), 22_000);
        assert_eq!(Money::from_units(21_749).round_to_nearest(500).units(), 21_500);
        assert_eq!(Money::from_units(0).round_to_nearest(500).units(), 0);
        assert_eq!(Money::from_units(249).round_to_nearest(500).units(), 0);
        assert_eq!(Money::from_units(250).round_to_nearest(500).units(), 500);
        assert_eq!(Money::from_units(1_234).round_to_nearest(0).units(), 1_234);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_units(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.abs().units(), 100);
        assert_eq!(negative.non_negative(), Money::zero());
    }
}
