//! # Size Surcharge
//!
//! Adds the configured 60ml / 120ml amount to a variation's price.
//!
//! ## Gate
//! ```text
//! jurisdiction resolved?              ── no ──► unchanged
//!        │ yes
//! jurisdiction on surcharge list?     ── no ──► unchanged
//!        │ yes
//! product is a variation with an
//! exact "60ml" / "120ml" size?        ── no ──► unchanged
//!        │ yes
//! product in a taxable category?      ── no ──► unchanged
//!        │ yes
//! apply_rate(price, surcharge[size], size_mode)
//! ```

use rust_decimal::Decimal;

use crate::calculator::apply_rate;
use crate::jurisdiction::Jurisdiction;
use crate::rates::RateStore;
use crate::taxability::TaxabilityClassifier;
use crate::types::{Product, RateKind};

/// Applies the size surcharge when every gate passes.
pub fn apply_size(
    price: Decimal,
    product: &Product,
    jurisdiction: Option<Jurisdiction>,
    rates: &RateStore<'_>,
    taxability: &TaxabilityClassifier<'_>,
) -> Decimal {
    let Some(j) = jurisdiction else {
        return price;
    };
    if !rates.surcharge_allowed(j) {
        return price;
    }
    if !product.is_variation() {
        return price;
    }
    let Some(size) = product.size_label() else {
        return price;
    };
    if !taxability.is_taxable(product) {
        return price;
    }

    apply_rate(price, rates.size_surcharge(size), rates.mode(RateKind::Size))
}
