//! # Cart and Recompute Guard
//!
//! The cart is the only place a computed price is ever written: each line's
//! effective price.
//!
//! ## Recompute Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Totals recalculation (may fire N times)                │
//! │                                                                         │
//! │  recompute_cart(cart)                                                   │
//! │     │                                                                   │
//! │     ├── in-flight? ──yes──► Skipped          (recursive re-entry)       │
//! │     │                                                                   │
//! │     ├── set in-flight (released on drop, even on panic)                 │
//! │     │                                                                   │
//! │     └── for each line:                                                  │
//! │           product = catalog.product(line.product_id)   ◄── stored       │
//! │           base    = base_price(product, Cart tier)                      │
//! │           base ≤ 0 ──► leave line alone                                 │
//! │           price   = apply_rate(apply_size(base))                        │
//! │           line.effective_price = price               ◄── overwrite      │
//! │                                                                         │
//! │  Pass 1: 124.30   Pass 2: 124.30   Pass 3: 124.30                       │
//! │  (the line's own effective price is never an input)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use crate::base_price::CacheTier;
use crate::context::RequestContext;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Product, ProductId};
use crate::{MAX_CART_ITEMS, MAX_LINE_QUANTITY};

// =============================================================================
// Cart Item
// =============================================================================

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Line key (UUID v4)
    pub key: String,

    pub product_id: ProductId,

    /// Product name when added
    pub name: String,

    pub quantity: u32,

    /// Unit price the cart charges. Owned by the recompute guard.
    pub effective_price: Decimal,

    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// A new line priced at the product's active price as of `added_at`.
    pub fn from_product(product: &Product, quantity: u32, added_at: DateTime<Utc>) -> Self {
        CartItem {
            key: Uuid::new_v4().to_string(),
            product_id: product.id,
            name: product.name.clone(),
            quantity,
            effective_price: product.active_price(added_at),
            added_at,
        }
    }

    /// Unit price × quantity, unrounded. Saturates at `Decimal::MAX`.
    pub fn line_total(&self) -> Decimal {
        self.effective_price.saturating_mul(Decimal::from(self.quantity))
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A shopper's cart.
///
/// ## Invariants
/// - One line per product id (adding again increases quantity)
/// - Quantity is 1..=999; setting 0 removes the line
/// - At most 100 lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    /// An empty cart. Callers pass the request clock's time.
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Cart {
            items: Vec::new(),
            created_at,
        }
    }

    /// Adds a product or increases the quantity of its line. Returns the
    /// line key.
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> CoreResult<String> {
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            let new_qty = item.quantity.saturating_add(quantity);
            if new_qty > MAX_LINE_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_LINE_QUANTITY,
                });
            }
            item.quantity = new_qty;
            return Ok(item.key.clone());
        }

        if quantity > MAX_LINE_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_LINE_QUANTITY,
            });
        }
        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        let item = CartItem::from_product(product, quantity, now);
        let key = item.key.clone();
        self.items.push(item);
        Ok(key)
    }

    /// Sets a line's quantity. Zero removes the line.
    pub fn update_quantity(&mut self, key: &str, quantity: u32) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(key);
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_LINE_QUANTITY,
            });
        }

        let item = self
            .items
            .iter_mut()
            .find(|i| i.key == key)
            .ok_or_else(|| CoreError::LineNotFound(key.to_string()))?;
        item.quantity = quantity;
        Ok(())
    }

    pub fn remove_item(&mut self, key: &str) -> CoreResult<()> {
        let initial_len = self.items.len();
        self.items.retain(|i| i.key != key);

        if self.items.len() == initial_len {
            Err(CoreError::LineNotFound(key.to_string()))
        } else {
            Ok(())
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Sum of unrounded line totals. Saturates at `Decimal::MAX`.
    pub fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .map(CartItem::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn totals(&self) -> CartTotals {
        CartTotals {
            item_count: self.item_count(),
            total_quantity: self.total_quantity(),
            subtotal: Money::from_decimal(self.subtotal()),
        }
    }
}

/// Cart totals summary for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: u32,
    pub subtotal: Money,
}

// =============================================================================
// Cart Collaborator
// =============================================================================

/// Read view of one line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItemRef {
    pub key: String,
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
}

/// What the recompute guard needs from a cart.
pub trait CartLines {
    fn line_items(&self) -> Vec<LineItemRef>;
    fn set_effective_price(&mut self, key: &str, price: Decimal) -> CoreResult<()>;
}

impl CartLines for Cart {
    fn line_items(&self) -> Vec<LineItemRef> {
        self.items
            .iter()
            .map(|i| LineItemRef {
                key: i.key.clone(),
                product_id: i.product_id,
                name: i.name.clone(),
                quantity: i.quantity,
            })
            .collect()
    }

    fn set_effective_price(&mut self, key: &str, price: Decimal) -> CoreResult<()> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.key == key)
            .ok_or_else(|| CoreError::LineNotFound(key.to_string()))?;
        item.effective_price = price;
        Ok(())
    }
}

// =============================================================================
// Recompute Guard
// =============================================================================

/// Result of one recompute call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeOutcome {
    Recomputed { updated: usize, skipped: usize },
    /// A recompute was already running in this request.
    Reentered,
}

/// Holds the in-flight flag; clears it on drop.
struct InFlight<'c> {
    flag: &'c Cell<bool>,
}

impl<'c> InFlight<'c> {
    fn enter(flag: &'c Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(InFlight { flag })
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

impl<'a> RequestContext<'a> {
    /// Rewrites every line's effective price from canonical inputs.
    ///
    /// Never fails: a line that cannot be priced keeps its current price,
    /// including when pricing it panics.
    pub fn recompute_cart(&self, cart: &mut dyn CartLines) -> RecomputeOutcome {
        let Some(_guard) = InFlight::enter(&self.recompute_in_flight) else {
            debug!("Cart recompute already in flight, skipping");
            return RecomputeOutcome::Reentered;
        };

        let mut updated = 0;
        let mut skipped = 0;
        for line in cart.line_items() {
            let priced = catch_unwind(AssertUnwindSafe(|| self.price_line(&line)));
            match priced {
                Ok(Ok(Some(price))) => match cart.set_effective_price(&line.key, price) {
                    Ok(()) => updated += 1,
                    Err(e) => {
                        skipped += 1;
                        self.report(&line, &e);
                    }
                },
                Ok(Ok(None)) => skipped += 1,
                Ok(Err(e)) => {
                    skipped += 1;
                    self.report(&line, &e);
                }
                Err(_) => {
                    skipped += 1;
                    if self.options().diagnostics {
                        error!(line = %line.key, product_id = %line.product_id, "Cart line pricing panicked");
                    }
                }
            }
        }

        debug!(updated, skipped, "Cart recomputed");
        RecomputeOutcome::Recomputed { updated, skipped }
    }

    /// Resets every line to its canonical base price, as when a cart is
    /// restored from the session.
    pub fn restore_cart(&self, cart: &mut dyn CartLines) {
        let resolver = self.base_prices();
        for line in cart.line_items() {
            let Some(product) = self.catalog().product(line.product_id) else {
                continue;
            };
            let base = resolver.base_price(&product, CacheTier::Cart);
            if let Err(e) = cart.set_effective_price(&line.key, base) {
                self.report(&line, &e);
            }
        }
    }

    /// `Ok(None)` when the base is not positive and the line is left alone.
    fn price_line(&self, line: &LineItemRef) -> CoreResult<Option<Decimal>> {
        let product = self
            .catalog()
            .product(line.product_id)
            .ok_or(CoreError::ProductNotFound(line.product_id))?;

        let computation = self.compute(&product, CacheTier::Cart);
        if computation.base <= Decimal::ZERO {
            return Ok(None);
        }
        Ok(Some(computation.final_price))
    }

    fn report(&self, line: &LineItemRef, err: &CoreError) {
        if self.options().diagnostics {
            error!(line = %line.key, product_id = %line.product_id, error = %err, "Cart line not recomputed");
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
    use crate::catalog::{Catalog, MemoryCatalog};
    use crate::context::{PricingEngine, RequestSurface};
    use crate::jurisdiction::{Jurisdiction, JurisdictionSignal};
    use crate::settings::{SettingKey, SettingsMap};
    use crate::types::{CategoryId, ProductKind, SizeLabel};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()
    }

    fn variation() -> Product {
        Product {
            id: ProductId(11),
            name: "Mango 60ml".to_string(),
            kind: ProductKind::Variation {
                parent_id: ProductId(10),
            },
            category_ids: vec![],
            regular_price: Some(d("100")),
            sale: None,
            size: Some("60ml".to_string()),
        }
    }

    fn free_sample() -> Product {
        Product {
            id: ProductId(20),
            name: "Sample".to_string(),
            kind: ProductKind::Simple,
            category_ids: vec![CategoryId(1)],
            regular_price: Some(Decimal::ZERO),
            sale: None,
            size: None,
        }
    }

    fn engine() -> PricingEngine {
        let catalog = MemoryCatalog::new()
            .with_category(CategoryId(1), None)
            .with_product(Product {
                id: ProductId(10),
                name: "Mango".to_string(),
                kind: ProductKind::Variable,
                category_ids: vec![CategoryId(1)],
                regular_price: None,
                sale: None,
                size: None,
            })
            .with_product(variation())
            .with_product(free_sample());
        let settings = SettingsMap::new()
            .with(SettingKey::TaxRate(Jurisdiction::Ontario), "13")
            .with(SettingKey::SizeMode, "fixed")
            .with(SettingKey::SizeSurcharge(SizeLabel::Ml60), "10")
            .with_list(SettingKey::TaxableRootCategories, [1])
            .with_list(SettingKey::SurchargeJurisdictions, ["ON"]);
        engine_over(Arc::new(catalog), settings)
    }

    fn engine_over(catalog: Arc<dyn Catalog>, settings: SettingsMap) -> PricingEngine {
        let clock = Arc::new(ManualClock::new(t0()));
        PricingEngine::new(
            catalog,
            Arc::new(settings),
            Arc::new(MemoryCache::new(clock.clone())),
            clock,
        )
    }

    /// Panics on every product lookup.
    struct BrokenCatalog;

    impl Catalog for BrokenCatalog {
        fn product(&self, id: ProductId) -> Option<Product> {
            panic!("catalog unavailable for {}", id)
        }

        fn variations(&self, _parent: ProductId) -> Vec<ProductId> {
            Vec::new()
        }

        fn child_categories(&self, _category: CategoryId) -> Vec<CategoryId> {
            Vec::new()
        }

        fn products(&self) -> Vec<Product> {
            Vec::new()
        }
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = Cart::new(t0());
        let first = cart.add_item(&variation(), 1, t0()).unwrap();
        let second = cart.add_item(&variation(), 2, t0()).unwrap();

        assert_eq!(first, second);
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_times_come_from_the_caller() {
        let later = t0() + chrono::Duration::hours(3);
        let mut cart = Cart::new(t0());
        cart.add_item(&variation(), 1, later).unwrap();

        assert_eq!(cart.created_at, t0());
        assert_eq!(cart.items[0].added_at, later);

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.created_at, t0());
    }

    #[test]
    fn test_quantity_limits() {
        let mut cart = Cart::new(t0());
        assert!(matches!(
            cart.add_item(&variation(), 1000, t0()),
            Err(CoreError::QuantityTooLarge { .. })
        ));

        let key = cart.add_item(&variation(), 1, t0()).unwrap();
        cart.update_quantity(&key, 0).unwrap();
        assert!(cart.is_empty());
        assert!(matches!(
            cart.update_quantity(&key, 2),
            Err(CoreError::LineNotFound(_))
        ));
    }

    #[test]
    fn test_three_passes_do_not_compound() {
        let engine = engine();
        let ctx = engine.begin_request(&JurisdictionSignal::from_query("ON"), RequestSurface::CartOrCheckout);
        let mut cart = Cart::new(t0());
        cart.add_item(&variation(), 2, t0()).unwrap();

        for _ in 0..3 {
            assert_eq!(
                ctx.recompute_cart(&mut cart),
                RecomputeOutcome::Recomputed {
                    updated: 1,
                    skipped: 0
                }
            );
        }

        assert_eq!(cart.items[0].effective_price, d("124.30"));
        assert_eq!(cart.totals().subtotal, Money::from_cents(24860));
    }

    #[test]
    fn test_zero_base_line_is_left_alone() {
        let engine = engine();
        let ctx = engine.begin_request(&JurisdictionSignal::from_query("ON"), RequestSurface::CartOrCheckout);
        let mut cart = Cart::new(t0());
        cart.add_item(&free_sample(), 1, t0()).unwrap();

        assert_eq!(
            ctx.recompute_cart(&mut cart),
            RecomputeOutcome::Recomputed {
                updated: 0,
                skipped: 1
            }
        );
        assert_eq!(cart.items[0].effective_price, Decimal::ZERO);
    }

    #[test]
    fn test_missing_product_keeps_price() {
        let engine = engine();
        let ctx = engine.begin_request(&JurisdictionSignal::from_query("ON"), RequestSurface::CartOrCheckout);
        let mut cart = Cart::new(t0());
        let mut gone = variation();
        gone.id = ProductId(99);
        cart.add_item(&gone, 1, t0()).unwrap();

        ctx.recompute_cart(&mut cart);
        assert_eq!(cart.items[0].effective_price, d("100"));
    }

    /// A cart whose price writes trigger another totals pass.
    struct ReentrantCart<'r, 'a> {
        inner: Cart,
        ctx: &'r RequestContext<'a>,
        nested: Vec<RecomputeOutcome>,
    }

    impl CartLines for ReentrantCart<'_, '_> {
        fn line_items(&self) -> Vec<LineItemRef> {
            self.inner.line_items()
        }

        fn set_effective_price(&mut self, key: &str, price: Decimal) -> CoreResult<()> {
            let mut copy = self.inner.clone();
            self.nested.push(self.ctx.recompute_cart(&mut copy));
            self.inner.set_effective_price(key, price)
        }
    }

    #[test]
    fn test_reentry_is_blocked_and_flag_released() {
        let engine = engine();
        let ctx = engine.begin_request(&JurisdictionSignal::from_query("ON"), RequestSurface::CartOrCheckout);
        let mut inner = Cart::new(t0());
        inner.add_item(&variation(), 1, t0()).unwrap();

        let mut cart = ReentrantCart {
            inner,
            ctx: &ctx,
            nested: Vec::new(),
        };
        ctx.recompute_cart(&mut cart);

        assert_eq!(cart.nested, vec![RecomputeOutcome::Reentered]);
        assert_eq!(cart.inner.items[0].effective_price, d("124.30"));

        // The next pass runs normally.
        let mut plain = cart.inner.clone();
        assert!(matches!(
            ctx.recompute_cart(&mut plain),
            RecomputeOutcome::Recomputed { updated: 1, .. }
        ));
    }

    #[test]
    fn test_restore_resets_to_base() {
        let engine = engine();
        let ctx = engine.begin_request(&JurisdictionSignal::from_query("ON"), RequestSurface::CartOrCheckout);
        let mut cart = Cart::new(t0());
        cart.add_item(&variation(), 1, t0()).unwrap();
        cart.items[0].effective_price = d("999");

        ctx.restore_cart(&mut cart);
        assert_eq!(cart.items[0].effective_price, d("100"));
    }

    #[test]
    fn test_panicking_line_keeps_price_and_releases_guard() {
        let engine = engine_over(Arc::new(BrokenCatalog), SettingsMap::new());
        let ctx = engine.begin_request(&JurisdictionSignal::from_query("ON"), RequestSurface::CartOrCheckout);
        let mut cart = Cart::new(t0());
        cart.add_item(&variation(), 2, t0()).unwrap();

        assert_eq!(
            ctx.recompute_cart(&mut cart),
            RecomputeOutcome::Recomputed {
                updated: 0,
                skipped: 1
            }
        );
        assert_eq!(cart.items[0].effective_price, d("100"));

        // The in-flight flag was dropped with the pass.
        assert!(matches!(
            ctx.recompute_cart(&mut cart),
            RecomputeOutcome::Recomputed { .. }
        ));
    }

    #[test]
    fn test_overflowing_surcharge_saturates_totals() {
        let catalog = MemoryCatalog::new()
            .with_category(CategoryId(1), None)
            .with_product(Product {
                id: ProductId(10),
                name: "Mango".to_string(),
                kind: ProductKind::Variable,
                category_ids: vec![CategoryId(1)],
                regular_price: None,
                sale: None,
                size: None,
            })
            .with_product(variation());
        let settings = SettingsMap::new()
            .with(SettingKey::TaxRate(Jurisdiction::Ontario), "13")
            .with(SettingKey::SizeMode, "fixed")
            .with(SettingKey::SizeSurcharge(SizeLabel::Ml60), "100000000000000000000000000")
            .with_list(SettingKey::TaxableRootCategories, [1])
            .with_list(SettingKey::SurchargeJurisdictions, ["ON"]);
        let engine = engine_over(Arc::new(catalog), settings);
        let ctx = engine.begin_request(&JurisdictionSignal::from_query("ON"), RequestSurface::CartOrCheckout);
        let mut cart = Cart::new(t0());
        cart.add_item(&variation(), 999, t0()).unwrap();

        ctx.recompute_cart(&mut cart);
        assert_eq!(cart.subtotal(), Decimal::MAX);
        assert_eq!(cart.totals().subtotal, Money::from_cents(i64::MAX));
    }
}
