//! # Price Calculator
//!
//! Pure rate arithmetic. No rounding: prices stay exact until they cross the
//! display boundary in [`crate::money`].

use rust_decimal::Decimal;
use tracing::warn;

use crate::types::CalculationMode;

/// Applies a rate to a price.
///
/// ```text
/// Percentage:  price + price × rate / 100
/// Fixed:       price + rate
/// ```
///
/// A non-positive rate or price is returned unchanged, and so is a result
/// that would overflow `Decimal`.
///
/// ## Example
/// ```rust
/// use maple_core::calculator::apply_rate;
/// use maple_core::types::CalculationMode;
/// use rust_decimal::Decimal;
///
/// let taxed = apply_rate(Decimal::from(100), Decimal::from(13), CalculationMode::Percentage);
/// assert_eq!(taxed, Decimal::from(113));
/// ```
pub fn apply_rate(price: Decimal, rate: Decimal, mode: CalculationMode) -> Decimal {
    if rate <= Decimal::ZERO || price <= Decimal::ZERO {
        return price;
    }

    let adjusted = match mode {
        CalculationMode::Percentage => rate
            .checked_div(Decimal::ONE_HUNDRED)
            .and_then(|fraction| price.checked_mul(fraction))
            .and_then(|increase| price.checked_add(increase)),
        CalculationMode::Fixed => price.checked_add(rate),
    };

    match adjusted {
        Some(adjusted) => adjusted,
        None => {
            warn!(%price, %rate, ?mode, "Rate overflows, leaving price unadjusted");
            price
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_percentage() {
        assert_eq!(apply_rate(d("100"), d("13"), CalculationMode::Percentage), d("113"));
        assert_eq!(
            apply_rate(d("110"), d("14.975"), CalculationMode::Percentage),
            d("126.4725")
        );
    }

    #[test]
    fn test_fixed() {
        assert_eq!(apply_rate(d("50"), d("5"), CalculationMode::Fixed), d("55"));
    }

    #[test]
    fn test_zero_rate_is_identity() {
        for mode in [CalculationMode::Percentage, CalculationMode::Fixed] {
            assert_eq!(apply_rate(d("19.99"), Decimal::ZERO, mode), d("19.99"));
            assert_eq!(apply_rate(d("19.99"), d("-5"), mode), d("19.99"));
        }
    }

    #[test]
    fn test_overflowing_rate_leaves_price_unchanged() {
        let huge = Decimal::MAX;
        assert_eq!(apply_rate(d("1000"), huge, CalculationMode::Percentage), d("1000"));
        assert_eq!(apply_rate(d("1000"), huge, CalculationMode::Fixed), d("1000"));
        assert_eq!(apply_rate(huge, d("13"), CalculationMode::Percentage), huge);
    }

    #[test]
    fn test_non_positive_price_is_untouched() {
        assert_eq!(apply_rate(Decimal::ZERO, d("13"), CalculationMode::Fixed), Decimal::ZERO);
        assert_eq!(apply_rate(d("-1"), d("13"), CalculationMode::Percentage), d("-1"));
    }
}
