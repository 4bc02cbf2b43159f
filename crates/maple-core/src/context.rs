//! # Engine and Request Context
//!
//! `PricingEngine` is created once per process and owns the collaborators.
//! `RequestContext` is created once per HTTP request and owns every
//! per-request memo.
//!
//! ## Lifetimes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PricingEngine (process, Send + Sync)                                   │
//! │  ├── Arc<dyn Catalog>                                                   │
//! │  ├── Arc<dyn SettingsSource>                                            │
//! │  ├── Arc<dyn TtlCache>        ◄── shared across requests, TTL only     │
//! │  ├── Arc<dyn Clock>                                                     │
//! │  └── EngineOptions                                                      │
//! │         │                                                               │
//! │         │ begin_request(signal, surface)                                │
//! │         ▼                                                               │
//! │  RequestContext<'_> (one request, one thread)                           │
//! │  ├── now                      captured once                             │
//! │  ├── Resolution               resolved once, immutable                  │
//! │  ├── RateStore                rates / modes memo                        │
//! │  ├── TaxabilityClassifier     index + per-product memo                  │
//! │  ├── visibility rules memo                                              │
//! │  └── recompute in-flight flag ◄── per request, never process-wide      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dropping the context drops every memo. Nothing request-scoped outlives
//! the response.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::base_price::BasePriceResolver;
use crate::cache::{Clock, TtlCache};
use crate::catalog::Catalog;
use crate::jurisdiction::{Jurisdiction, JurisdictionSignal, Resolution};
use crate::rates::RateStore;
use crate::settings::SettingsSource;
use crate::taxability::TaxabilityClassifier;
use crate::visibility::{PurchaseGuardScope, VisibilityRule};

// =============================================================================
// Options
// =============================================================================

/// TTL classes of the shared cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub taxonomy: Duration,
    pub catalog_price: Duration,
    pub cart_price: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        CacheTtls {
            taxonomy: Duration::hours(1),
            catalog_price: Duration::hours(1),
            cart_price: Duration::minutes(5),
        }
    }
}

/// Process-wide engine knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub ttls: CacheTtls,
    /// Log failures caught by the cart recompute guard.
    pub diagnostics: bool,
    pub purchase_guard: PurchaseGuardScope,
}

/// Which part of the storefront is serving the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSurface {
    /// Shop, listings, product pages.
    Catalog,
    /// Cart and checkout pages, where line prices are owned by the
    /// cart recompute guard.
    CartOrCheckout,
}

// =============================================================================
// Pricing Engine
// =============================================================================

/// Long-lived entry point.
#[derive(Clone)]
pub struct PricingEngine {
    catalog: Arc<dyn Catalog>,
    settings: Arc<dyn SettingsSource>,
    cache: Arc<dyn TtlCache>,
    clock: Arc<dyn Clock>,
    options: EngineOptions,
}

impl PricingEngine {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        settings: Arc<dyn SettingsSource>,
        cache: Arc<dyn TtlCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        PricingEngine {
            catalog,
            settings,
            cache,
            clock,
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    pub fn settings(&self) -> &dyn SettingsSource {
        self.settings.as_ref()
    }

    /// Opens the context for one request. The jurisdiction is resolved here
    /// and never again.
    pub fn begin_request(
        &self,
        signal: &JurisdictionSignal,
        surface: RequestSurface,
    ) -> RequestContext<'_> {
        let resolution = Resolution::resolve(signal);
        let now = self.clock.now();
        debug!(
            jurisdiction = crate::jurisdiction::label(resolution.jurisdiction()),
            source = ?resolution.source(),
            ?surface,
            "Request context opened"
        );

        RequestContext {
            engine: self,
            now,
            resolution,
            surface,
            rates: RateStore::new(self.settings.as_ref()),
            taxability: TaxabilityClassifier::new(
                self.catalog.as_ref(),
                self.settings.as_ref(),
                self.cache.as_ref(),
                self.options.ttls.taxonomy,
            ),
            visibility: RefCell::new(HashMap::new()),
            recompute_in_flight: Cell::new(false),
        }
    }
}

// =============================================================================
// Request Context
// =============================================================================

/// Per-request state. Not `Sync`: one request is served by one thread.
pub struct RequestContext<'a> {
    engine: &'a PricingEngine,
    now: DateTime<Utc>,
    resolution: Resolution,
    surface: RequestSurface,
    pub(crate) rates: RateStore<'a>,
    pub(crate) taxability: TaxabilityClassifier<'a>,
    visibility: RefCell<HashMap<Jurisdiction, VisibilityRule>>,
    pub(crate) recompute_in_flight: Cell<bool>,
}

impl<'a> RequestContext<'a> {
    pub fn jurisdiction(&self) -> Option<Jurisdiction> {
        self.resolution.jurisdiction()
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn surface(&self) -> RequestSurface {
        self.surface
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn engine(&self) -> &'a PricingEngine {
        self.engine
    }

    pub fn options(&self) -> &EngineOptions {
        &self.engine.options
    }

    pub fn catalog(&self) -> &'a dyn Catalog {
        self.engine.catalog.as_ref()
    }

    pub fn rates(&self) -> &RateStore<'a> {
        &self.rates
    }

    pub fn taxability(&self) -> &TaxabilityClassifier<'a> {
        &self.taxability
    }

    pub(crate) fn base_prices(&self) -> BasePriceResolver<'a> {
        let ttls = self.engine.options.ttls;
        BasePriceResolver::new(
            self.engine.catalog.as_ref(),
            self.engine.cache.as_ref(),
            self.now,
            ttls.catalog_price,
            ttls.cart_price,
        )
    }

    /// Hidden ids and categories for a jurisdiction, read once per request.
    pub fn visibility_rule(&self, jurisdiction: Jurisdiction) -> VisibilityRule {
        self.visibility
            .borrow_mut()
            .entry(jurisdiction)
            .or_insert_with(|| VisibilityRule::load(self.engine.settings.as_ref(), jurisdiction))
            .clone()
    }
}
