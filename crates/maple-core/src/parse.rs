//! # Lenient Number Parsing
//!
//! Rates and surcharges arrive as whatever the settings screen stored, which
//! depends on the admin's locale.
//!
//! ## Accepted Shapes
//! ```text
//! "13"          → 13
//! "14,975"      → 14.975     single comma is the decimal separator
//! "1 234,50"    → 1234.50    spaces (incl. non-breaking) are stripped
//! "1.234,50"    → 1234.50    both separators: the LAST one is decimal
//! "1,234.50"    → 1234.50
//! "1,234,567"   → 1234567    repeated separator: thousands grouping
//! ""  "abc"     → None       caller falls back to 0
//! ```

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses a locale-formatted decimal. Returns `None` when nothing usable is
/// left after normalization.
pub fn parse_decimal_lenient(raw: &str) -> Option<Decimal> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    let dots = compact.matches('.').count();
    let commas = compact.matches(',').count();

    let normalized = match (dots, commas) {
        (0, 0) => compact,
        (_, 0) => single_kind(&compact, '.'),
        (0, _) => single_kind(&compact, ','),
        _ => {
            let last_dot = compact.rfind('.')?;
            let last_comma = compact.rfind(',')?;
            let (decimal, grouping) = if last_dot > last_comma {
                ('.', ',')
            } else {
                (',', '.')
            };
            if compact.matches(decimal).count() > 1 {
                return None;
            }
            compact.replace(grouping, "").replace(decimal, ".")
        }
    };

    Decimal::from_str(&normalized).ok()
}

/// Same as [`parse_decimal_lenient`] with the configuration default of 0.
pub fn parse_decimal_or_zero(raw: &str) -> Decimal {
    parse_decimal_lenient(raw).unwrap_or(Decimal::ZERO)
}

fn single_kind(value: &str, separator: char) -> String {
    match value.matches(separator).count() {
        1 => value.replace(separator, "."),
        _ => value.replace(separator, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_plain_numbers() {
        assert_eq!(parse_decimal_lenient("13"), Some(d("13")));
        assert_eq!(parse_decimal_lenient("14.975"), Some(d("14.975")));
        assert_eq!(parse_decimal_lenient("-2.5"), Some(d("-2.5")));
    }

    #[test]
    fn test_comma_decimal() {
        assert_eq!(parse_decimal_lenient("14,975"), Some(d("14.975")));
        assert_eq!(parse_decimal_lenient("0,5"), Some(d("0.5")));
    }

    #[test]
    fn test_spaces_are_stripped() {
        assert_eq!(parse_decimal_lenient(" 1 234,50 "), Some(d("1234.50")));
        assert_eq!(parse_decimal_lenient("1\u{a0}234,50"), Some(d("1234.50")));
        assert_eq!(parse_decimal_lenient("1\u{202f}234"), Some(d("1234")));
    }

    #[test]
    fn test_mixed_separators() {
        assert_eq!(parse_decimal_lenient("1.234,50"), Some(d("1234.50")));
        assert_eq!(parse_decimal_lenient("1,234.50"), Some(d("1234.50")));
        assert_eq!(parse_decimal_lenient("1,234,567.25"), Some(d("1234567.25")));
        assert_eq!(parse_decimal_lenient("1.2.3,4,5"), None);
    }

    #[test]
    fn test_repeated_separator_is_grouping() {
        assert_eq!(parse_decimal_lenient("1,234,567"), Some(d("1234567")));
        assert_eq!(parse_decimal_lenient("1.234.567"), Some(d("1234567")));
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(parse_decimal_lenient(""), None);
        assert_eq!(parse_decimal_lenient("   "), None);
        assert_eq!(parse_decimal_lenient("abc"), None);
        assert_eq!(parse_decimal_lenient("13%"), None);
        assert_eq!(parse_decimal_or_zero("abc"), Decimal::ZERO);
    }
}
