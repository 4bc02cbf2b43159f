//! # Canonical Base Price
//!
//! The idempotence anchor: every computation starts from the STORED price,
//! never from a value some earlier pass may have decorated.
//!
//! ## Why Two Tiers
//! ```text
//! ┌────────────────────┬──────────────────────┬────────────┐
//! │ CacheTier          │ Key                  │ TTL        │
//! ├────────────────────┼──────────────────────┼────────────┤
//! │ Catalog            │ raw_price:{id}       │ ~1 hour    │
//! │ Cart               │ cart_price:{id}      │ ~5 minutes │
//! └────────────────────┴──────────────────────┴────────────┘
//! ```
//!
//! What is cached is the stored price RECORD (regular price plus sale and
//! its window), not a computed result. The active price is picked with the
//! request's `now`, so a sale that ends mid-TTL stops applying on time.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{keys, TtlCache, TtlCacheExt};
use crate::catalog::Catalog;
use crate::types::{Product, ProductId, SalePrice};

/// Which cache class a read belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Catalog,
    Cart,
}

impl CacheTier {
    pub fn key(&self, id: ProductId) -> String {
        match self {
            CacheTier::Catalog => keys::catalog_price(id),
            CacheTier::Cart => keys::cart_price(id),
        }
    }
}

/// Stored price fields of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPrice {
    pub regular: Option<Decimal>,
    pub sale: Option<SalePrice>,
}

impl StoredPrice {
    pub fn of(product: &Product) -> Self {
        StoredPrice {
            regular: product.regular_price,
            sale: product.sale.clone(),
        }
    }

    /// Sale-if-active-else-regular, 0 when nothing is stored.
    pub fn active_at(&self, now: DateTime<Utc>) -> Decimal {
        self.sale
            .as_ref()
            .filter(|sale| sale.is_active_at(now))
            .map(|sale| sale.amount)
            .or(self.regular)
            .unwrap_or(Decimal::ZERO)
    }

    /// Regular price, falling back to the active price when none is stored.
    pub fn regular_or_active(&self, now: DateTime<Utc>) -> Decimal {
        self.regular.unwrap_or_else(|| self.active_at(now))
    }

    /// True when an active sale undercuts the regular price.
    pub fn is_on_sale(&self, now: DateTime<Utc>) -> bool {
        match (&self.sale, self.regular) {
            (Some(sale), Some(regular)) => sale.is_active_at(now) && sale.amount < regular,
            _ => false,
        }
    }
}

/// Reads canonical base prices through the shared cache.
pub struct BasePriceResolver<'a> {
    catalog: &'a dyn Catalog,
    cache: &'a dyn TtlCache,
    now: DateTime<Utc>,
    catalog_ttl: Duration,
    cart_ttl: Duration,
}

impl<'a> BasePriceResolver<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        cache: &'a dyn TtlCache,
        now: DateTime<Utc>,
        catalog_ttl: Duration,
        cart_ttl: Duration,
    ) -> Self {
        BasePriceResolver {
            catalog,
            cache,
            now,
            catalog_ttl,
            cart_ttl,
        }
    }

    /// Canonical base price of `product`.
    ///
    /// The argument only supplies the id; its price fields are used solely
    /// when the catalog no longer has the record.
    pub fn base_price(&self, product: &Product, tier: CacheTier) -> Decimal {
        self.stored(product, tier).active_at(self.now)
    }

    /// Stored price record, from cache or a fresh catalog read.
    pub fn stored(&self, product: &Product, tier: CacheTier) -> StoredPrice {
        let key = tier.key(product.id);
        if let Some(stored) = self.cache.get_as::<StoredPrice>(&key) {
            return stored;
        }

        match self.catalog.product(product.id) {
            Some(fresh) => {
                let stored = StoredPrice::of(&fresh);
                self.cache.set_as(&key, &stored, self.ttl(tier));
                stored
            }
            None => {
                debug!(product_id = %product.id, "Product missing from catalog, using given record");
                StoredPrice::of(product)
            }
        }
    }

    fn ttl(&self, tier: CacheTier) -> Duration {
        match tier {
            CacheTier::Catalog => self.catalog_ttl,
            CacheTier::Cart => self.cart_ttl,
        }
    }
}
