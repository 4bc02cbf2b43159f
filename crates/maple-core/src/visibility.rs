//! # Visibility and Purchasability
//!
//! One predicate, `is_hidden`, decides whether a product exists for a
//! jurisdiction. Every surface consumes it, never a copy of the rule.
//!
//! ## Integration Points
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       is_hidden(product, XX)                            │
//! │   id or parent id ∈ hidden_products_XX                                  │
//! │   OR any owner category ∈ hidden_categories_XX                          │
//! │                              │                                          │
//! │     ┌──────────────┬─────────┴──────┬───────────────────┐               │
//! │     ▼              ▼                ▼                   ▼               │
//! │  archive /      shortcode        add to cart         checkout           │
//! │  search query   query            (purchase guard)    validation         │
//! │  scope_listing  scope_listing    check_purchasable   validate_checkout  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The purchase guard only fires from the product page by default; listing
//! exclusion is always on. [`PurchaseGuardScope::Everywhere`] closes the gap
//! for direct add-to-cart requests.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cart::CartLines;
use crate::context::RequestContext;
use crate::error::{CoreError, CoreResult};
use crate::jurisdiction::Jurisdiction;
use crate::settings::{SettingKey, SettingsSource};
use crate::types::{CategoryId, Product, ProductId};

// =============================================================================
// Rules
// =============================================================================

/// Hidden products and categories for one jurisdiction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityRule {
    pub products: BTreeSet<ProductId>,
    pub categories: BTreeSet<CategoryId>,
}

impl VisibilityRule {
    pub fn load(settings: &dyn SettingsSource, jurisdiction: Jurisdiction) -> Self {
        let ids = |key: SettingKey| {
            settings
                .get(&key)
                .map(|raw| raw.as_ids())
                .unwrap_or_default()
        };

        VisibilityRule {
            products: ids(SettingKey::HiddenProducts(jurisdiction))
                .into_iter()
                .map(ProductId)
                .collect(),
            categories: ids(SettingKey::HiddenCategories(jurisdiction))
                .into_iter()
                .map(CategoryId)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.categories.is_empty()
    }

    /// `categories` are the owner's categories (the parent's for variations).
    pub fn hides(&self, product: &Product, categories: &[CategoryId]) -> bool {
        excluded_by(&self.products, &self.categories, product, categories)
    }
}

/// The one exclusion test behind both listings and purchase checks: the
/// product, its parent, or any owner category is in the sets.
fn excluded_by(
    products: &BTreeSet<ProductId>,
    categories: &BTreeSet<CategoryId>,
    product: &Product,
    owner_categories: &[CategoryId],
) -> bool {
    if products.contains(&product.id) {
        return true;
    }
    if matches!(product.parent_id(), Some(parent) if products.contains(&parent)) {
        return true;
    }
    owner_categories.iter().any(|c| categories.contains(c))
}

/// Where the purchase guard applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseGuardScope {
    /// Only add-to-cart from the single product page is rejected.
    #[default]
    ProductPageOnly,
    /// Every add-to-cart is checked.
    Everywhere,
}

impl FromStr for PurchaseGuardScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "product_page_only" => Ok(PurchaseGuardScope::ProductPageOnly),
            "everywhere" => Ok(PurchaseGuardScope::Everywhere),
            other => Err(format!("Unknown purchase guard scope: {}", other)),
        }
    }
}

impl fmt::Display for PurchaseGuardScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurchaseGuardScope::ProductPageOnly => write!(f, "product_page_only"),
            PurchaseGuardScope::Everywhere => write!(f, "everywhere"),
        }
    }
}

/// Where an add-to-cart attempt came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOrigin {
    ProductPage,
    Other,
}

// =============================================================================
// Listing Query
// =============================================================================

/// Product listing constraints, shared by archive, search and shortcode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingQuery {
    /// Explicit whitelist (shortcode `ids=`). `None` means "all".
    pub include_ids: Option<Vec<ProductId>>,
    pub exclude_ids: BTreeSet<ProductId>,
    pub exclude_categories: BTreeSet<CategoryId>,
}

impl ListingQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn including(ids: Vec<ProductId>) -> Self {
        ListingQuery {
            include_ids: Some(ids),
            ..Default::default()
        }
    }

    /// Applies the query to one product record. `owner_categories` are the
    /// product's own categories, or its parent's for a variation.
    pub fn admits(&self, product: &Product, owner_categories: &[CategoryId]) -> bool {
        if let Some(include) = &self.include_ids {
            if !include.contains(&product.id) {
                return false;
            }
        }
        !excluded_by(
            &self.exclude_ids,
            &self.exclude_categories,
            product,
            owner_categories,
        )
    }
}

// =============================================================================
// Request-Scoped Operations
// =============================================================================

impl<'a> RequestContext<'a> {
    /// True when `product` does not exist for `jurisdiction`.
    pub fn is_hidden(&self, product: &Product, jurisdiction: Jurisdiction) -> bool {
        let rule = self.visibility_rule(jurisdiction);
        if rule.is_empty() {
            return false;
        }
        rule.hides(product, &self.owner_categories(product))
    }

    /// Categories that decide visibility: the parent's for a variation, the
    /// product's own otherwise.
    pub fn owner_categories(&self, product: &Product) -> Vec<CategoryId> {
        match product.parent_id() {
            Some(parent) => self
                .catalog()
                .product(parent)
                .map(|p| p.category_ids)
                .unwrap_or_else(|| product.category_ids.clone()),
            None => product.category_ids.clone(),
        }
    }

    /// Narrows a listing query for the request's jurisdiction.
    ///
    /// An explicit include list loses its hidden ids; otherwise hidden ids
    /// become exclusions. Hidden categories are always excluded.
    pub fn scope_listing(&self, mut query: ListingQuery) -> ListingQuery {
        let Some(j) = self.jurisdiction() else {
            return query;
        };
        let rule = self.visibility_rule(j);

        match query.include_ids.as_mut() {
            Some(include) => include.retain(|id| !rule.products.contains(id)),
            None => query.exclude_ids.extend(rule.products.iter().copied()),
        }
        query.exclude_categories.extend(rule.categories.iter().copied());
        query
    }

    /// Visible products from the catalog for this request.
    pub fn visible_products(&self, query: ListingQuery) -> Vec<Product> {
        let scoped = self.scope_listing(query);
        self.catalog()
            .products()
            .into_iter()
            .filter(|p| scoped.admits(p, &self.owner_categories(p)))
            .collect()
    }

    /// Rejects an add-to-cart for a product hidden in the request's
    /// jurisdiction, subject to the configured guard scope.
    pub fn check_purchasable(&self, product: &Product, origin: PurchaseOrigin) -> CoreResult<()> {
        let scope = self.options().purchase_guard;
        if scope == PurchaseGuardScope::ProductPageOnly && origin != PurchaseOrigin::ProductPage {
            return Ok(());
        }
        let Some(j) = self.jurisdiction() else {
            return Ok(());
        };

        if self.is_hidden(product, j) {
            debug!(product_id = %product.id, jurisdiction = %j, "Purchase blocked");
            return Err(CoreError::NotPurchasable {
                product_id: product.id,
                jurisdiction: j.code().to_string(),
            });
        }
        Ok(())
    }

    /// Reports every cart line unavailable in the checkout jurisdiction.
    pub fn validate_checkout(
        &self,
        cart: &dyn CartLines,
        jurisdiction: Option<Jurisdiction>,
    ) -> CoreResult<()> {
        let Some(j) = jurisdiction else {
            return Ok(());
        };

        let mut names: Vec<String> = Vec::new();
        for line in cart.line_items() {
            let Some(product) = self.catalog().product(line.product_id) else {
                continue;
            };
            if self.is_hidden(&product, j) && !names.contains(&line.name) {
                names.push(line.name);
            }
        }

        if names.is_empty() {
            Ok(())
        } else {
            Err(CoreError::UnavailableItems { names })
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
