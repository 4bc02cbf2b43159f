//! # maple-core: Province-Aware Pricing for Maple Pricing
//!
//! This crate decides, for one storefront request, which Canadian province
//! applies, what every product costs there, and whether it may be seen or
//! bought at all.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Maple Pricing Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 maple-storefront (axum)                         │   │
//! │  │   /products ──► /products/{id} ──► /cart ──► /checkout         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ one RequestContext per request         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ maple-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │  jurisdiction ─► rates ─► taxability ─► surcharge ─► pipeline   │   │
//! │  │                                            │                    │   │
//! │  │                    cart (recompute guard) ◄┘   visibility       │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • collaborators are traits • exact Decimal math        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Catalog / SettingsSource              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              maple-db (SQLite snapshot + settings)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`jurisdiction`] - Province resolution from query, cookie, checkout
//! - [`settings`] - Configuration keys and the `SettingsSource` trait
//! - [`rates`] - Request-memoized rates and calculation modes
//! - [`taxability`] - Taxable category index and classifier
//! - [`calculator`] - Percentage / fixed arithmetic
//! - [`surcharge`] - Gated 60ml / 120ml surcharge
//! - [`base_price`] - Canonical stored price, two cache tiers
//! - [`pipeline`] - The one price function every touchpoint calls
//! - [`cart`] - Cart state and the recompute guard
//! - [`visibility`] - Hidden products, listing scoping, purchase checks
//! - [`cache`] - Shared TTL cache and clock
//! - [`money`] - Rounding and formatting at the display boundary
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use maple_core::cache::{MemoryCache, SystemClock};
//! use maple_core::catalog::MemoryCatalog;
//! use maple_core::context::{PricingEngine, RequestSurface};
//! use maple_core::jurisdiction::{Jurisdiction, JurisdictionSignal};
//! use maple_core::settings::{SettingKey, SettingsMap};
//! use maple_core::types::{CategoryId, PriceContext, Product, ProductId, ProductKind};
//! use rust_decimal::Decimal;
//!
//! let catalog = MemoryCatalog::new()
//!     .with_category(CategoryId(1), None)
//!     .with_product(Product {
//!         id: ProductId(7),
//!         name: "Mango Pod".to_string(),
//!         kind: ProductKind::Simple,
//!         category_ids: vec![CategoryId(1)],
//!         regular_price: Some(Decimal::from(100)),
//!         sale: None,
//!         size: None,
//!     });
//! let settings = SettingsMap::new()
//!     .with(SettingKey::TaxRate(Jurisdiction::Ontario), "13")
//!     .with_list(SettingKey::TaxableRootCategories, [1]);
//!
//! let clock = Arc::new(SystemClock);
//! let engine = PricingEngine::new(
//!     Arc::new(catalog),
//!     Arc::new(settings),
//!     Arc::new(MemoryCache::new(clock.clone())),
//!     clock,
//! );
//!
//! let ctx = engine.begin_request(&JurisdictionSignal::from_query("ON"), RequestSurface::Catalog);
//! let product = ctx.catalog().product(ProductId(7)).unwrap();
//! let price = ctx.display_price(&product, PriceContext::CatalogSingle);
//! assert_eq!(price.render(), "$113.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod base_price;
pub mod cache;
pub mod calculator;
pub mod cart;
pub mod catalog;
pub mod context;
pub mod error;
pub mod jurisdiction;
pub mod money;
pub mod parse;
pub mod pipeline;
pub mod rates;
pub mod settings;
pub mod surcharge;
pub mod taxability;
pub mod types;
pub mod validation;
pub mod visibility;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartItem, CartLines, RecomputeOutcome};
pub use context::{EngineOptions, PricingEngine, RequestContext, RequestSurface};
pub use error::{CoreError, CoreResult, ValidationError};
pub use jurisdiction::{Jurisdiction, JurisdictionSignal, Resolution};
pub use money::Money;
pub use pipeline::{PriceComputation, PriceDisplay, PricingFingerprint};
pub use types::*;
pub use visibility::{ListingQuery, PurchaseGuardScope, PurchaseOrigin};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line
pub const MAX_LINE_QUANTITY: u32 = 999;
