//! # Price Pipeline
//!
//! The single function every touchpoint calls. Listing cards, product pages,
//! variation ranges, cart lines, mini-cart subtotals and the checkout review
//! all go through [`RequestContext::display_price`] or
//! [`RequestContext::compute`], so a price is the same wherever it is shown.
//!
//! ## Composition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  product ──► base_price ──► apply_size ──► apply_rate ──► PriceDisplay │
//! │              (stored,        (variation,     (taxable      (Money,      │
//! │               cached)         gated)          only)         rounded)    │
//! │                                                                         │
//! │  Inputs fixed for the request: jurisdiction, rates, modes, now.        │
//! │  Nothing is written back to the product, so call #1 and call #9 agree. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cart Pages
//! On a cart/checkout request the cart recompute guard owns line prices.
//! Catalog-context calls made there (theme widgets, cross-sells) get the
//! undecorated stored price instead of a second decoration.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::base_price::CacheTier;
use crate::calculator::apply_rate;
use crate::context::{RequestContext, RequestSurface};
use crate::jurisdiction::{label, Jurisdiction};
use crate::money::Money;
use crate::surcharge::apply_size;
use crate::types::{CalculationMode, PriceContext, Product, ProductKind, RateKind};

// =============================================================================
// Results
// =============================================================================

/// One pass through the pipeline. Never stored on the product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceComputation {
    pub base: Decimal,
    pub size_adjusted: Decimal,
    pub final_price: Decimal,
    pub jurisdiction: Option<Jurisdiction>,
    pub taxable: bool,
    pub tax_rate: Decimal,
    pub general_mode: CalculationMode,
    pub size_mode: CalculationMode,
}

/// What a touchpoint renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceDisplay {
    Single { amount: Decimal },
    /// Strikethrough regular price next to the sale price.
    Sale { regular: Decimal, sale: Decimal },
    Range { low: Decimal, high: Decimal },
}

impl PriceDisplay {
    pub fn single(amount: Decimal) -> Self {
        PriceDisplay::Single { amount }
    }

    /// Range that collapses to a single value when the bounds meet.
    pub fn range(low: Decimal, high: Decimal) -> Self {
        if low == high {
            PriceDisplay::Single { amount: low }
        } else {
            PriceDisplay::Range { low, high }
        }
    }

    /// The amount a shopper pays (low bound for ranges).
    pub fn amount(&self) -> Decimal {
        match self {
            PriceDisplay::Single { amount } => *amount,
            PriceDisplay::Sale { sale, .. } => *sale,
            PriceDisplay::Range { low, .. } => *low,
        }
    }

    /// Rounded amount at the display boundary.
    pub fn money(&self) -> Money {
        Money::from_decimal(self.amount())
    }

    /// Storefront price markup.
    pub fn render(&self) -> String {
        match self {
            PriceDisplay::Single { amount } => Money::from_decimal(*amount).to_string(),
            PriceDisplay::Sale { regular, sale } => format!(
                "<del>{}</del> <ins>{}</ins>",
                Money::from_decimal(*regular),
                Money::from_decimal(*sale)
            ),
            PriceDisplay::Range { low, high } => format!(
                "{} – {}",
                Money::from_decimal(*low),
                Money::from_decimal(*high)
            ),
        }
    }
}

impl fmt::Display for PriceDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Inputs that make a rendered price differ between shoppers.
///
/// Hosts mix this into their own rendered-price cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PricingFingerprint {
    pub jurisdiction: Option<Jurisdiction>,
    pub general_mode: CalculationMode,
    pub size_mode: CalculationMode,
}

impl fmt::Display for PricingFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "province={};calc={};size_calc={}",
            label(self.jurisdiction),
            self.general_mode,
            self.size_mode
        )
    }
}

// =============================================================================
// Pipeline
// =============================================================================

impl<'a> RequestContext<'a> {
    /// Full computation from the canonical base price.
    pub fn compute(&self, product: &Product, tier: CacheTier) -> PriceComputation {
        let base = self.base_prices().base_price(product, tier);
        self.compute_from(product, base)
    }

    /// Size and tax steps on an explicit base.
    pub fn compute_from(&self, product: &Product, base: Decimal) -> PriceComputation {
        let jurisdiction = self.jurisdiction();
        let size_adjusted = match product.kind {
            ProductKind::Variation { .. } => {
                apply_size(base, product, jurisdiction, &self.rates, &self.taxability)
            }
            ProductKind::Simple | ProductKind::Variable => base,
        };

        let taxable = self.taxability.is_taxable(product);
        let tax_rate = if taxable {
            self.rates.rate(jurisdiction)
        } else {
            Decimal::ZERO
        };
        let general_mode = self.rates.mode(RateKind::General);
        let final_price = if tax_rate > Decimal::ZERO {
            apply_rate(size_adjusted, tax_rate, general_mode)
        } else {
            size_adjusted
        };

        PriceComputation {
            base,
            size_adjusted,
            final_price,
            jurisdiction,
            taxable,
            tax_rate,
            general_mode,
            size_mode: self.rates.mode(RateKind::Size),
        }
    }

    /// Price for one touchpoint.
    pub fn display_price(&self, product: &Product, context: PriceContext) -> PriceDisplay {
        if self.surface() == RequestSurface::CartOrCheckout && !context.is_cart() {
            return self.catalog_display(product, false);
        }

        match context {
            PriceContext::CartLine => {
                PriceDisplay::single(self.compute(product, CacheTier::Cart).final_price)
            }
            PriceContext::CartSubtotal { quantity } => {
                let unit = self.compute(product, CacheTier::Cart).final_price;
                PriceDisplay::single(unit.saturating_mul(Decimal::from(quantity)))
            }
            PriceContext::CatalogSingle | PriceContext::CatalogVariableRange => {
                self.catalog_display(product, true)
            }
        }
    }

    /// Fingerprint of this request's pricing inputs.
    pub fn fingerprint(&self) -> PricingFingerprint {
        PricingFingerprint {
            jurisdiction: self.jurisdiction(),
            general_mode: self.rates.mode(RateKind::General),
            size_mode: self.rates.mode(RateKind::Size),
        }
    }

    fn catalog_display(&self, product: &Product, adjust: bool) -> PriceDisplay {
        match product.kind {
            ProductKind::Simple | ProductKind::Variation { .. } => {
                self.single_display(product, adjust)
            }
            ProductKind::Variable => self.variable_display(product, adjust),
        }
    }

    fn finalize(&self, product: &Product, base: Decimal, adjust: bool) -> Decimal {
        if adjust {
            self.compute_from(product, base).final_price
        } else {
            base
        }
    }

    fn single_display(&self, product: &Product, adjust: bool) -> PriceDisplay {
        let now = self.now();
        let stored = self.base_prices().stored(product, CacheTier::Catalog);
        let active = self.finalize(product, stored.active_at(now), adjust);

        if stored.is_on_sale(now) {
            let regular = self.finalize(product, stored.regular_or_active(now), adjust);
            PriceDisplay::Sale {
                regular,
                sale: active,
            }
        } else {
            PriceDisplay::single(active)
        }
    }

    /// Min/max over the variations' own finals. Strikethrough survives only
    /// when both sides collapse to one value.
    fn variable_display(&self, product: &Product, adjust: bool) -> PriceDisplay {
        let now = self.now();
        let resolver = self.base_prices();
        let mut active: Vec<Decimal> = Vec::new();
        let mut regular: Vec<Decimal> = Vec::new();

        for id in self.catalog().variations(product.id) {
            let Some(variation) = self.catalog().product(id) else {
                continue;
            };
            let stored = resolver.stored(&variation, CacheTier::Catalog);
            let base = stored.active_at(now);
            if base <= Decimal::ZERO {
                continue;
            }
            active.push(self.finalize(&variation, base, adjust));
            regular.push(self.finalize(&variation, stored.regular_or_active(now), adjust));
        }

        let (Some(min_active), Some(max_active)) =
            (active.iter().min().copied(), active.iter().max().copied())
        else {
            return self.single_display(product, adjust);
        };
        let min_regular = regular.iter().min().copied().unwrap_or(min_active);
        let max_regular = regular.iter().max().copied().unwrap_or(max_active);

        let on_sale = min_active < min_regular;
        if on_sale && min_active == max_active && min_regular == max_regular {
            PriceDisplay::Sale {
                regular: min_regular,
                sale: min_active,
            }
        } else {
            PriceDisplay::range(min_active, max_active)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, MemoryCache};
    use crate::catalog::MemoryCatalog;
    use crate::context::PricingEngine;
    use crate::jurisdiction::JurisdictionSignal;
    use crate::settings::{SettingKey, SettingsMap};
    use crate::types::{CategoryId, ProductId, SalePrice, SizeLabel};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn simple(id: u64, price: &str, categories: &[u64]) -> Product {
        Product {
            id: ProductId(id),
            name: format!("Simple {}", id),
            kind: ProductKind::Simple,
            category_ids: categories.iter().copied().map(CategoryId).collect(),
            regular_price: Some(d(price)),
            sale: None,
            size: None,
        }
    }

    fn variation(id: u64, parent: u64, price: &str, size: &str) -> Product {
        Product {
            id: ProductId(id),
            name: format!("Variation {}", id),
            kind: ProductKind::Variation {
                parent_id: ProductId(parent),
            },
            category_ids: vec![],
            regular_price: Some(d(price)),
            sale: None,
            size: Some(size.to_string()),
        }
    }

    fn catalog() -> MemoryCatalog {
        let mut on_sale = simple(3, "20", &[1]);
        on_sale.sale = Some(SalePrice::open(d("15")));

        MemoryCatalog::new()
            .with_category(CategoryId(1), None)
            .with_category(CategoryId(2), Some(CategoryId(1)))
            .with_category(CategoryId(9), None)
            .with_product(simple(1, "100", &[2]))
            .with_product(simple(2, "100", &[9]))
            .with_product(on_sale)
            .with_product(Product {
                id: ProductId(10),
                name: "Mango".to_string(),
                kind: ProductKind::Variable,
                category_ids: vec![CategoryId(1)],
                regular_price: None,
                sale: None,
                size: None,
            })
            .with_product(variation(11, 10, "100", "60ml"))
            .with_product(variation(12, 10, "150", "120ml"))
    }

    fn settings() -> SettingsMap {
        SettingsMap::new()
            .with(SettingKey::TaxRate(Jurisdiction::Ontario), "13")
            .with(SettingKey::TaxRate(Jurisdiction::Quebec), "14,975")
            .with(SettingKey::SizeMode, "fixed")
            .with(SettingKey::SizeSurcharge(SizeLabel::Ml60), "10")
            .with(SettingKey::SizeSurcharge(SizeLabel::Ml120), "20")
            .with_list(SettingKey::TaxableRootCategories, [1])
            .with_list(SettingKey::SurchargeJurisdictions, ["ON"])
    }

    fn engine() -> PricingEngine {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap(),
        ));
        PricingEngine::new(
            Arc::new(catalog()),
            Arc::new(settings()),
            Arc::new(MemoryCache::new(clock.clone())),
            clock,
        )
    }

    fn on() -> JurisdictionSignal {
        JurisdictionSignal::from_query("ON")
    }

    #[test]
    fn test_taxable_child_category_is_taxed() {
        let engine = engine();
        let ctx = engine.begin_request(&on(), RequestSurface::Catalog);
        let product = simple(1, "100", &[2]);

        assert_eq!(
            ctx.display_price(&product, PriceContext::CatalogSingle),
            PriceDisplay::single(d("113"))
        );
    }

    #[test]
    fn test_non_taxable_product_is_untouched() {
        let engine = engine();
        let ctx = engine.begin_request(&on(), RequestSurface::Catalog);
        assert_eq!(
            ctx.display_price(&simple(2, "100", &[9]), PriceContext::CatalogSingle),
            PriceDisplay::single(d("100"))
        );
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let engine = engine();
        let ctx = engine.begin_request(&on(), RequestSurface::Catalog);
        let product = ctx.catalog().product(ProductId(11)).unwrap();

        let first = ctx.display_price(&product, PriceContext::CatalogSingle);
        let second = ctx.display_price(&product, PriceContext::CatalogSingle);
        assert_eq!(first, second);
        assert_eq!(first.amount(), d("124.30"));
    }

    #[test]
    fn test_catalog_and_cart_agree() {
        let engine = engine();
        let ctx = engine.begin_request(&on(), RequestSurface::Catalog);
        let product = ctx.catalog().product(ProductId(11)).unwrap();

        let cart = ctx.display_price(&product, PriceContext::CartLine);
        let catalog = ctx.display_price(&product, PriceContext::CatalogSingle);
        let cart_again = ctx.display_price(&product, PriceContext::CartLine);
        assert_eq!(cart.amount(), catalog.amount());
        assert_eq!(cart, cart_again);
    }

    #[test]
    fn test_decorated_input_does_not_compound() {
        let engine = engine();
        let ctx = engine.begin_request(&on(), RequestSurface::Catalog);
        let mut decorated = ctx.catalog().product(ProductId(11)).unwrap();
        decorated.regular_price = Some(d("124.30"));

        assert_eq!(
            ctx.display_price(&decorated, PriceContext::CartLine).amount(),
            d("124.30")
        );
    }

    #[test]
    fn test_cart_subtotal_multiplies_unrounded_unit() {
        let engine = engine();
        let ctx = engine.begin_request(&JurisdictionSignal::from_query("QC"), RequestSurface::CartOrCheckout);
        let product = ctx.catalog().product(ProductId(1)).unwrap();

        // 100 × 1.14975 = 114.975 per unit, ×3 = 344.925 → $344.93
        let subtotal = ctx.display_price(&product, PriceContext::CartSubtotal { quantity: 3 });
        assert_eq!(subtotal.amount(), d("344.925"));
        assert_eq!(subtotal.render(), "$344.93");
    }

    #[test]
    fn test_catalog_context_on_cart_page_is_raw() {
        let engine = engine();
        let ctx = engine.begin_request(&on(), RequestSurface::CartOrCheckout);
        let product = ctx.catalog().product(ProductId(1)).unwrap();

        assert_eq!(
            ctx.display_price(&product, PriceContext::CatalogSingle),
            PriceDisplay::single(d("100"))
        );
    }

    #[test]
    fn test_sale_strikethrough() {
        let engine = engine();
        let ctx = engine.begin_request(&on(), RequestSurface::Catalog);
        let product = ctx.catalog().product(ProductId(3)).unwrap();

        let display = ctx.display_price(&product, PriceContext::CatalogSingle);
        assert_eq!(
            display,
            PriceDisplay::Sale {
                regular: d("22.60"),
                sale: d("16.95")
            }
        );
        assert_eq!(display.render(), "<del>$22.60</del> <ins>$16.95</ins>");
    }

    #[test]
    fn test_variable_range_uses_adjusted_bounds() {
        let engine = engine();
        let ctx = engine.begin_request(&on(), RequestSurface::Catalog);
        let parent = ctx.catalog().product(ProductId(10)).unwrap();

        // (100 + 10) × 1.13 = 124.30, (150 + 20) × 1.13 = 192.10
        let display = ctx.display_price(&parent, PriceContext::CatalogVariableRange);
        assert_eq!(
            display,
            PriceDisplay::Range {
                low: d("124.30"),
                high: d("192.10")
            }
        );
        assert_eq!(display.render(), "$124.30 – $192.10");
    }

    #[test]
    fn test_no_jurisdiction_means_no_adjustment() {
        let engine = engine();
        let ctx = engine.begin_request(&JurisdictionSignal::from_query("ZZ"), RequestSurface::Catalog);
        let product = ctx.catalog().product(ProductId(11)).unwrap();

        let computation = ctx.compute(&product, CacheTier::Catalog);
        assert_eq!(computation.final_price, d("100"));
        assert_eq!(computation.tax_rate, Decimal::ZERO);
    }

    #[test]
    fn test_surcharge_skipped_off_allow_list() {
        let engine = engine();
        let ctx = engine.begin_request(&JurisdictionSignal::from_query("QC"), RequestSurface::Catalog);
        let product = ctx.catalog().product(ProductId(11)).unwrap();

        let computation = ctx.compute(&product, CacheTier::Catalog);
        assert_eq!(computation.size_adjusted, d("100"));
        assert_eq!(computation.final_price, d("114.975"));
    }

    #[test]
    fn test_fingerprint_varies_by_jurisdiction() {
        let engine = engine();
        let on_ctx = engine.begin_request(&on(), RequestSurface::Catalog);
        let none_ctx = engine.begin_request(&JurisdictionSignal::default(), RequestSurface::Catalog);

        assert_eq!(
            on_ctx.fingerprint().to_string(),
            "province=ON;calc=percentage;size_calc=fixed"
        );
        assert_ne!(on_ctx.fingerprint(), none_ctx.fingerprint());
    }
}
