//! # Domain Types
//!
//! Core domain types used throughout Maple Pricing.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  ProductKind    │   │   SalePrice     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  Simple         │   │  amount         │       │
//! │  │  kind           │   │  Variable       │   │  starts_at      │       │
//! │  │  category_ids   │   │  Variation {    │   │  ends_at        │       │
//! │  │  regular_price  │   │    parent_id }  │   └─────────────────┘       │
//! │  │  sale           │   └─────────────────┘                              │
//! │  │  size           │                                                    │
//! │  └─────────────────┘   ┌─────────────────┐   ┌─────────────────┐       │
//! │                        │ CalculationMode │   │   SizeLabel     │       │
//! │                        │  Percentage     │   │   60ml          │       │
//! │                        │  Fixed          │   │   120ml         │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stored vs Runtime Price
//! `Product` is always a fresh copy of the *stored* record. Nothing in this
//! crate writes a computed price back onto it; the only mutable price is a
//! cart line's effective price (see [`crate::cart`]).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Identifiers
// =============================================================================

/// Catalog product identifier (simple, variable parent, or variation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductId(pub u64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Product category identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryId(pub u64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Product
// =============================================================================

/// The three product shapes the pipeline distinguishes.
///
/// Every per-shape branch in the pipeline is a `match` on this enum, so a new
/// shape cannot be added without deciding how it is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum ProductKind {
    /// Stand-alone product with its own price.
    Simple,
    /// Parent of variations; has no price of its own.
    Variable,
    /// One purchasable option of a variable product.
    Variation { parent_id: ProductId },
}

/// A scheduled or open-ended sale price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalePrice {
    pub amount: Decimal,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl SalePrice {
    /// Open-ended sale with no schedule.
    pub fn open(amount: Decimal) -> Self {
        SalePrice {
            amount,
            starts_at: None,
            ends_at: None,
        }
    }

    /// True when the sale applies at `now`.
    ///
    /// A sale is active when its amount is positive and `now` falls in
    /// `[starts_at, ends_at)`; missing bounds are unbounded.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        if self.amount <= Decimal::ZERO {
            return false;
        }
        if matches!(self.starts_at, Some(start) if now < start) {
            return false;
        }
        !matches!(self.ends_at, Some(end) if now >= end)
    }
}

/// A catalog product as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub kind: ProductKind,
    /// Categories assigned to this record. Variations usually carry none and
    /// inherit their parent's.
    pub category_ids: Vec<CategoryId>,
    pub regular_price: Option<Decimal>,
    pub sale: Option<SalePrice>,
    /// Raw value of the size attribute (e.g. "60ml").
    pub size: Option<String>,
}

impl Product {
    /// Parent id for variations.
    pub fn parent_id(&self) -> Option<ProductId> {
        match self.kind {
            ProductKind::Variation { parent_id } => Some(parent_id),
            ProductKind::Simple | ProductKind::Variable => None,
        }
    }

    /// Id whose categories decide taxability and visibility.
    ///
    /// Variations resolve to their parent.
    pub fn category_owner(&self) -> ProductId {
        self.parent_id().unwrap_or(self.id)
    }

    pub fn is_variation(&self) -> bool {
        matches!(self.kind, ProductKind::Variation { .. })
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.kind, ProductKind::Variable)
    }

    /// Active sale amount at `now`, if any.
    pub fn active_sale_price(&self, now: DateTime<Utc>) -> Option<Decimal> {
        self.sale
            .as_ref()
            .filter(|sale| sale.is_active_at(now))
            .map(|sale| sale.amount)
    }

    /// Sale-if-active-else-regular price, 0 when nothing is stored.
    pub fn active_price(&self, now: DateTime<Utc>) -> Decimal {
        self.active_sale_price(now)
            .or(self.regular_price)
            .unwrap_or(Decimal::ZERO)
    }

    /// Stored regular price, 0 when missing.
    pub fn regular_or_zero(&self) -> Decimal {
        self.regular_price.unwrap_or(Decimal::ZERO)
    }

    /// True when an active sale price is below the regular price.
    pub fn is_on_sale(&self, now: DateTime<Utc>) -> bool {
        match (self.active_sale_price(now), self.regular_price) {
            (Some(sale), Some(regular)) => sale < regular,
            (Some(_), None) => true,
            _ => false,
        }
    }

    /// Recognized size label, exact match only.
    pub fn size_label(&self) -> Option<SizeLabel> {
        self.size.as_deref().and_then(SizeLabel::from_attribute)
    }
}

// =============================================================================
// Size Label
// =============================================================================

/// Size attribute values that carry a surcharge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum SizeLabel {
    #[serde(rename = "60ml")]
    Ml60,
    #[serde(rename = "120ml")]
    Ml120,
}

impl SizeLabel {
    pub const ALL: [SizeLabel; 2] = [SizeLabel::Ml60, SizeLabel::Ml120];

    /// Exact, case-sensitive match on the stored attribute value.
    ///
    /// `"60 ml"`, `"60ML"` and `" 60ml"` are NOT recognized.
    pub fn from_attribute(value: &str) -> Option<Self> {
        match value {
            "60ml" => Some(SizeLabel::Ml60),
            "120ml" => Some(SizeLabel::Ml120),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeLabel::Ml60 => "60ml",
            SizeLabel::Ml120 => "120ml",
        }
    }
}

impl fmt::Display for SizeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Calculation Mode
// =============================================================================

/// How a configured rate is applied to a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum CalculationMode {
    /// `price + price × rate / 100`
    #[default]
    Percentage,
    /// `price + rate`
    Fixed,
}

impl CalculationMode {
    /// Parses a stored setting value. Unknown values yield `None`.
    pub fn from_setting(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "percentage" => Some(CalculationMode::Percentage),
            "fixed" => Some(CalculationMode::Fixed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationMode::Percentage => "percentage",
            CalculationMode::Fixed => "fixed",
        }
    }
}

impl fmt::Display for CalculationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which calculation mode setting applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateKind {
    /// Jurisdiction tax rate.
    General,
    /// Size surcharge.
    Size,
}

// =============================================================================
// Price Context
// =============================================================================

/// The touchpoint asking for a price.
///
/// ## Touchpoints
/// ```text
/// CatalogSingle         product page, listing card
/// CatalogVariableRange  "from $10 – $20" on a variable product
/// CartLine              unit price in cart / mini-cart / checkout review
/// CartSubtotal          unit price × quantity for one line
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceContext {
    CatalogSingle,
    CatalogVariableRange,
    CartLine,
    CartSubtotal { quantity: u32 },
}

impl PriceContext {
    /// True for cart-side touchpoints, which use the short-lived price cache.
    pub fn is_cart(&self) -> bool {
        matches!(self, PriceContext::CartLine | PriceContext::CartSubtotal { .. })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
