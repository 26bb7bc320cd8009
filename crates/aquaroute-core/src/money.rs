//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Integer Minor Units
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every amount is an i64 count of the currency's smallest unit.          │
//! │                                                                         │
//! │  Chilean peso (CLP): no decimals, 1 unit = $1                          │
//! │    2.500 + 19% IVA = 2.500 + 475 = 2.975                               │
//! │                                                                         │
//! │  Tax is rounded ONCE per order, on the subtotal, half-up.              │
//! │  total = subtotal + tax holds exactly, no float drift.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use aquaroute_core::money::Money;
//!
//! let price = Money::from_minor(1000);
//! let line = price * 2;
//! assert_eq!((line + Money::from_minor(500)).minor(), 2500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Signed so that reversals and expense deltas can be expressed.
///
/// ## Where Money Flows
/// ```text
/// Product.price ──► CartLine.unit_price (snapshot) ──► CartLine.line_total
///                                                          │
///                          CartTotals { subtotal, tax, total } ◄─┘
///                                     │
///                                     ▼
///                     Order / DeliveryRoute header columns
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use aquaroute_core::money::Money;
    ///
    /// let price = Money::from_minor(2975);
    /// assert_eq!(price.minor(), 2975);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates tax with half-up rounding.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`, in i128 so that large
    /// order totals can't overflow. Negative amounts round half away from
    /// zero so that a reversal mirrors the original exactly.
    ///
    /// ## Example
    /// ```rust
    /// use aquaroute_core::money::Money;
    /// use aquaroute_core::types::TaxRate;
    ///
    /// // 2.500 × 19% = 475 exactly
    /// assert_eq!(Money::from_minor(2500).calculate_tax(TaxRate::IVA).minor(), 475);
    ///
    /// // 1.050 × 19% = 199.5 → 200
    /// assert_eq!(Money::from_minor(1050).calculate_tax(TaxRate::IVA).minor(), 200);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let product = self.0 as i128 * rate.bps() as i128;
        let rounded = if product >= 0 {
            (product + 5000) / 10000
        } else {
            (product - 5000) / 10000
        };
        Money(rounded as i64)
    }

    /// Price including tax, as shown next to catalog prices.
    pub fn with_tax(&self, rate: TaxRate) -> Money {
        *self + self.calculate_tax(rate)
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Formats the amount with a symbol, dot thousands separators and
    /// `decimals` fractional digits (comma as decimal mark).
    ///
    /// ## Example
    /// ```rust
    /// use aquaroute_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(2975).format("$", 0), "$2.975");
    /// assert_eq!(Money::from_minor(-1234567).format("$", 0), "-$1.234.567");
    /// assert_eq!(Money::from_minor(123456).format("US$", 2), "US$1.234,56");
    /// ```
    pub fn format(&self, symbol: &str, decimals: u32) -> String {
        let divisor = 10_i64.pow(decimals);
        let abs = self.0.unsigned_abs() as i128;
        let whole = (abs / divisor as i128).to_string();
        let frac = abs % divisor as i128;

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        let sign = if self.0 < 0 { "-" } else { "" };
        if decimals == 0 {
            format!("{}{}{}", sign, symbol, grouped)
        } else {
            format!(
                "{}{}{},{:0width$}",
                sign,
                symbol,
                grouped,
                frac,
                width = decimals as usize
            )
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly display in CLP style. UI formatting uses [`Money::format`]
/// with the configured currency.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format("$", 0))
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1500);
        assert_eq!((a - b).minor(), 500);
        assert_eq!((a * 3).minor(), 3000);
        assert_eq!(vec![a, b, b].into_iter().sum::<Money>().minor(), 2000);
    }

    #[test]
    fn test_iva_on_reference_cart() {
        let subtotal = Money::from_minor(2500);
        let tax = subtotal.calculate_tax(TaxRate::IVA);
        assert_eq!(tax.minor(), 475);
        assert_eq!((subtotal + tax).minor(), 2975);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 1.050 × 0.19 = 199.5
        assert_eq!(Money::from_minor(1050).calculate_tax(TaxRate::IVA).minor(), 200);
        // 1.049 × 0.19 = 199.31
        assert_eq!(Money::from_minor(1049).calculate_tax(TaxRate::IVA).minor(), 199);
        // Reversal mirrors the original
        assert_eq!(Money::from_minor(-1050).calculate_tax(TaxRate::IVA).minor(), -200);
    }

    #[test]
    fn test_tax_matches_rounded_float_for_small_subtotals() {
        for s in 0..5_000_i64 {
            let expected = (s as f64 * 0.19).round() as i64;
            let tax = Money::from_minor(s).calculate_tax(TaxRate::IVA);
            assert_eq!(tax.minor(), expected, "subtotal {}", s);
        }
    }

    #[test]
    fn test_with_tax() {
        assert_eq!(Money::from_minor(2000).with_tax(TaxRate::IVA).minor(), 2380);
    }

    #[test]
    fn test_format() {
        assert_eq!(Money::from_minor(0).format("$", 0), "$0");
        assert_eq!(Money::from_minor(999).format("$", 0), "$999");
        assert_eq!(Money::from_minor(1000).format("$", 0), "$1.000");
        assert_eq!(Money::from_minor(2975).to_string(), "$2.975");
        assert_eq!(Money::from_minor(-1234567).format("$", 0), "-$1.234.567");
        assert_eq!(Money::from_minor(5).format("US$", 2), "US$0,05");
    }

    #[test]
    fn test_serializes_as_plain_number() {
        let json = serde_json::to_string(&Money::from_minor(2975)).unwrap();
        assert_eq!(json, "2975");
    }
}
