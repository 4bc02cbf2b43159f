//! # Error Types
//!
//! Domain-specific error types for maple-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  maple-core errors (this file)                                         │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Malformed configuration values                 │
//! │                                                                         │
//! │  maple-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  storefront errors (in app)                                            │
//! │  └── ApiError         - What the HTTP client sees (serialized)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Where Errors Stop
//! Pricing never fails in front of a shopper. The pipeline, the jurisdiction
//! resolver and the cart recompute guard all turn a `CoreError` into
//! "no adjustment". Errors only escape for explicit validations such as
//! purchase attempts and checkout availability.

use thiserror::Error;

use crate::types::ProductId;

// =============================================================================
// Core Error
// =============================================================================

/// Core pricing and visibility errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product does not exist in the catalog.
    ///
    /// ## When This Occurs
    /// - Cart line references a product that was deleted
    /// - Variation whose parent record is missing
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Product is hidden for the shopper's jurisdiction and cannot be bought.
    #[error("Product {product_id} is not available in {jurisdiction}")]
    NotPurchasable {
        product_id: ProductId,
        jurisdiction: String,
    },

    /// One or more cart lines are hidden for the checkout jurisdiction.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart: [Mango Pod 60ml, Mint Pod 120ml]
    ///      │
    ///      ▼
    /// Checkout with shipping province QC
    ///      │
    ///      ▼
    /// UnavailableItems { names: ["Mango Pod 60ml"] }
    ///      │
    ///      ▼
    /// Notice shown, order not placed
    /// ```
    #[error(
        "The items \"{}\" are not available for the selected province, please remove them or reselect the previous province.",
        .names.join(", ")
    )]
    UnavailableItems { names: Vec<String> },

    /// Cart line key is unknown.
    #[error("Cart line not found: {0}")]
    LineNotFound(String),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: u32, max: u32 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Configuration and input validation errors.
///
/// Pricing itself never rejects bad configuration (it falls back to
/// defaults); these errors feed the settings audit so operators can see what
/// was ignored.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Value could not be read as a decimal number.
    #[error("{field} is not a number: '{value}'")]
    InvalidNumber { field: String, value: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative: '{value}'")]
    Negative { field: String, value: String },

    /// Value is not in the allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// List entry is not a valid identifier.
    #[error("{field} contains an invalid id: '{value}'")]
    InvalidId { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
