//! # Taxability Classifier
//!
//! Decides whether a product's categories make it subject to provincial tax.
//!
//! ## Index Construction
//! ```text
//! configured roots: [Vape Juice]
//!
//!   Vape Juice ─┬─ Fruit ──── Tropical
//!               └─ Menthol
//!   Hardware
//!
//! index = { Vape Juice, Fruit, Tropical, Menthol }      (Hardware absent)
//! ```
//!
//! The index is built completely before it is published to the shared cache,
//! so readers see either the previous full set or the next full set. It is
//! rebuilt at most once per TTL window and may lag configuration by that
//! window.

use std::cell::{OnceCell, RefCell};
use std::collections::{BTreeSet, HashMap, VecDeque};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{keys, TtlCache, TtlCacheExt};
use crate::catalog::Catalog;
use crate::settings::{SettingKey, SettingsSource};
use crate::types::{CategoryId, Product, ProductId};

// =============================================================================
// Taxability Index
// =============================================================================

/// Taxable root categories plus every transitive descendant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxabilityIndex {
    categories: BTreeSet<CategoryId>,
}

impl TaxabilityIndex {
    /// Walks the category tree breadth-first from the roots.
    ///
    /// Cycles in the stored tree are tolerated: every category is expanded
    /// at most once.
    pub fn build(roots: &[CategoryId], catalog: &dyn Catalog) -> Self {
        let mut categories = BTreeSet::new();
        let mut queue: VecDeque<CategoryId> = roots.iter().copied().collect();

        while let Some(category) = queue.pop_front() {
            if !categories.insert(category) {
                continue;
            }
            queue.extend(catalog.child_categories(category));
        }

        TaxabilityIndex { categories }
    }

    /// Reads the shared index, rebuilding and publishing it on a miss.
    pub fn load(
        cache: &dyn TtlCache,
        catalog: &dyn Catalog,
        settings: &dyn SettingsSource,
        ttl: Duration,
    ) -> Self {
        if let Some(index) = cache.get_as::<TaxabilityIndex>(keys::TAXABLE_CATEGORIES) {
            return index;
        }

        let roots = taxable_roots(settings);
        let index = Self::build(&roots, catalog);
        debug!(
            roots = roots.len(),
            categories = index.len(),
            "Rebuilt taxability index"
        );
        cache.set_as(keys::TAXABLE_CATEGORIES, &index, ttl);
        index
    }

    pub fn contains(&self, category: CategoryId) -> bool {
        self.categories.contains(&category)
    }

    /// True when any of the given categories is taxable.
    pub fn intersects(&self, categories: &[CategoryId]) -> bool {
        categories.iter().any(|c| self.categories.contains(c))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Configured taxable root categories.
pub fn taxable_roots(settings: &dyn SettingsSource) -> Vec<CategoryId> {
    settings
        .get(&SettingKey::TaxableRootCategories)
        .map(|raw| raw.as_ids().into_iter().map(CategoryId).collect())
        .unwrap_or_default()
}

// =============================================================================
// Classifier
// =============================================================================

/// Request-scoped `is_taxable` with per-product memoization.
pub struct TaxabilityClassifier<'a> {
    catalog: &'a dyn Catalog,
    settings: &'a dyn SettingsSource,
    cache: &'a dyn TtlCache,
    ttl: Duration,
    index: OnceCell<TaxabilityIndex>,
    flags: RefCell<HashMap<ProductId, bool>>,
}

impl<'a> TaxabilityClassifier<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        settings: &'a dyn SettingsSource,
        cache: &'a dyn TtlCache,
        ttl: Duration,
    ) -> Self {
        TaxabilityClassifier {
            catalog,
            settings,
            cache,
            ttl,
            index: OnceCell::new(),
            flags: RefCell::new(HashMap::new()),
        }
    }

    /// True iff the product (or, for a variation, its parent) sits in a
    /// taxable category.
    pub fn is_taxable(&self, product: &Product) -> bool {
        let owner = product.category_owner();
        if let Some(flag) = self.flags.borrow().get(&owner) {
            return *flag;
        }

        let categories = if owner == product.id {
            product.category_ids.clone()
        } else {
            // Missing parent: fall back to whatever the variation carries.
            self.catalog
                .product(owner)
                .map(|parent| parent.category_ids)
                .unwrap_or_else(|| product.category_ids.clone())
        };

        let taxable = self.index().intersects(&categories);
        self.flags.borrow_mut().insert(owner, taxable);
        taxable
    }

    /// The index in effect for this request.
    pub fn index(&self) -> &TaxabilityIndex {
        self.index.get_or_init(|| {
            TaxabilityIndex::load(self.cache, self.catalog, self.settings, self.ttl)
        })
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
    use crate::settings::SettingsMap;
    use crate::types::ProductKind;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_category(CategoryId(1), None)
            .with_category(CategoryId(2), Some(CategoryId(1)))
            .with_category(CategoryId(3), Some(CategoryId(2)))
            .with_category(CategoryId(9), None)
            .with_product(product(10, ProductKind::Variable, vec![CategoryId(3)]))
            .with_product(product(
                11,
                ProductKind::Variation {
                    parent_id: ProductId(10),
                },
                vec![],
            ))
            .with_product(product(20, ProductKind::Simple, vec![CategoryId(9)]))
    }

    fn product(id: u64, kind: ProductKind, category_ids: Vec<CategoryId>) -> Product {
        Product {
            id: ProductId(id),
            name: format!("Product {}", id),
            kind,
            category_ids,
            regular_price: None,
            sale: None,
            size: None,
        }
    }

    fn cache() -> (Arc<ManualClock>, MemoryCache) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        ));
        (clock.clone(), MemoryCache::new(clock))
    }

    #[test]
    fn test_index_includes_transitive_children() {
        let index = TaxabilityIndex::build(&[CategoryId(1)], &catalog());
        assert!(index.contains(CategoryId(1)));
        assert!(index.contains(CategoryId(2)));
        assert!(index.contains(CategoryId(3)));
        assert!(!index.contains(CategoryId(9)));
    }

    #[test]
    fn test_index_tolerates_cycles() {
        let cyclic = MemoryCatalog::new()
            .with_category(CategoryId(1), Some(CategoryId(2)))
            .with_category(CategoryId(2), Some(CategoryId(1)));
        let index = TaxabilityIndex::build(&[CategoryId(1)], &cyclic);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_variation_uses_parent_categories() {
        let catalog = catalog();
        let settings = SettingsMap::new().with_list(SettingKey::TaxableRootCategories, [1]);
        let (_, cache) = cache();
        let classifier =
            TaxabilityClassifier::new(&catalog, &settings, &cache, Duration::hours(1));

        let variation = catalog.product(ProductId(11)).unwrap();
        assert!(classifier.is_taxable(&variation));

        let hardware = catalog.product(ProductId(20)).unwrap();
        assert!(!classifier.is_taxable(&hardware));
    }

    #[test]
    fn test_no_roots_means_nothing_taxable() {
        let catalog = catalog();
        let settings = SettingsMap::new();
        let (_, cache) = cache();
        let classifier =
            TaxabilityClassifier::new(&catalog, &settings, &cache, Duration::hours(1));

        assert!(classifier.index().is_empty());
        assert!(!classifier.is_taxable(&catalog.product(ProductId(10)).unwrap()));
    }

    #[test]
    fn test_index_is_shared_until_ttl_expires() {
        let catalog = catalog();
        let (clock, cache) = cache();

        let before = SettingsMap::new().with_list(SettingKey::TaxableRootCategories, [9]);
        TaxabilityIndex::load(&cache, &catalog, &before, Duration::hours(1));

        // Configuration changed, but the cached index still wins.
        let after = SettingsMap::new().with_list(SettingKey::TaxableRootCategories, [1]);
        let stale = TaxabilityIndex::load(&cache, &catalog, &after, Duration::hours(1));
        assert!(stale.contains(CategoryId(9)));

        clock.advance(Duration::hours(1));
        let fresh = TaxabilityIndex::load(&cache, &catalog, &after, Duration::hours(1));
        assert!(fresh.contains(CategoryId(3)));
        assert!(!fresh.contains(CategoryId(9)));
    }
}
