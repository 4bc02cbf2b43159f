//! # Money Module
//!
//! The display boundary: the ONLY place where a computed price is rounded.
//!
//! ## Two Representations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PIPELINE (Decimal, unrounded)          DISPLAY (Money, integer cents)  │
//! │                                                                         │
//! │  base 110.00                                                            │
//! │    × 1.14975 (QC, 14.975%)                                              │
//! │  = 126.4725  ─────── Money::from_decimal ───────►  12647 cents          │
//! │                                                    "$126.47"            │
//! │                                                                         │
//! │  Rounding inside the pipeline would make the result depend on how many │
//! │  steps ran, so every step stays exact and we round once, here.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use maple_core::money::Money;
//! use rust_decimal::Decimal;
//!
//! let price = Money::from_decimal(Decimal::new(124_30, 2));
//! assert_eq!(price.cents(), 12430);
//! assert_eq!(price.to_string(), "$124.30");
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A rounded monetary value in cents, ready for display.
///
/// ## Design Decisions
/// - **i64 (signed)**: negative values are representable, the pipeline never
///   produces them but display code should not panic if one shows up
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Rounding**: half away from zero, two decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use maple_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Rounds an exact pipeline price to cents.
    ///
    /// ## Example
    /// ```rust
    /// use maple_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// // 12.345 rounds half away from zero
    /// assert_eq!(Money::from_decimal(Decimal::new(12345, 3)).cents(), 1235);
    /// ```
    ///
    /// Amounts beyond the `i64` cent range saturate.
    pub fn from_decimal(amount: Decimal) -> Self {
        let saturated = if amount.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        };
        let cents = amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(|c| c.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|c| c.to_i64());
        Money(cents.unwrap_or(saturated))
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    ///
    /// ## Example
    /// ```rust
    /// use maple_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.dollars(), 10);
    /// ```
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money the way the storefront renders it.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_from_decimal_rounds_once() {
        assert_eq!(Money::from_decimal(d("124.30")).cents(), 12430);
        assert_eq!(Money::from_decimal(d("126.4725")).cents(), 12647);
        assert_eq!(Money::from_decimal(d("0.005")).cents(), 1);
        assert_eq!(Money::from_decimal(d("0.004")).cents(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_from_decimal_saturates() {
        assert_eq!(Money::from_decimal(Decimal::MAX).cents(), i64::MAX);
        assert_eq!(Money::from_decimal(Decimal::MIN).cents(), i64::MIN);
        assert_eq!(Money::from_decimal(d("100000000000000000000")).cents(), i64::MAX);
    }
}
