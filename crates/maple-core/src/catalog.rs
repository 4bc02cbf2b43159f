//! # Catalog Collaborator
//!
//! Read-only view of stored products and the category tree.
//!
//! Every call returns a fresh copy of the stored record. The pricing engine
//! relies on this: a computed price can never leak back into the catalog.

use std::collections::BTreeMap;

use crate::types::{CategoryId, Product, ProductId};

/// Stored catalog data, by id.
pub trait Catalog: Send + Sync {
    /// Stored record for a product, variation or variable parent.
    fn product(&self, id: ProductId) -> Option<Product>;

    /// Variation ids of a variable product, in menu order.
    fn variations(&self, parent: ProductId) -> Vec<ProductId>;

    /// Direct children of a category.
    fn child_categories(&self, category: CategoryId) -> Vec<CategoryId>;

    /// Every listable product (variations excluded).
    fn products(&self) -> Vec<Product>;
}

/// A catalog held in memory.
///
/// Used for tests and as the shape of a loaded database snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    products: BTreeMap<ProductId, Product>,
    category_parents: BTreeMap<CategoryId, Option<CategoryId>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&mut self, product: Product) {
        self.products.insert(product.id, product);
    }

    pub fn add_category(&mut self, id: CategoryId, parent: Option<CategoryId>) {
        self.category_parents.insert(id, parent);
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.add_product(product);
        self
    }

    pub fn with_category(mut self, id: CategoryId, parent: Option<CategoryId>) -> Self {
        self.add_category(id, parent);
        self
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }
}

impl Catalog for MemoryCatalog {
    fn product(&self, id: ProductId) -> Option<Product> {
        self.products.get(&id).cloned()
    }

    fn variations(&self, parent: ProductId) -> Vec<ProductId> {
        self.products
            .values()
            .filter(|p| p.parent_id() == Some(parent))
            .map(|p| p.id)
            .collect()
    }

    fn child_categories(&self, category: CategoryId) -> Vec<CategoryId> {
        self.category_parents
            .iter()
            .filter(|(_, parent)| **parent == Some(category))
            .map(|(id, _)| *id)
            .collect()
    }

    fn products(&self) -> Vec<Product> {
        self.products
            .values()
            .filter(|p| !p.is_variation())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductKind;

    fn product(id: u64, kind: ProductKind) -> Product {
        Product {
            id: ProductId(id),
            name: format!("Product {}", id),
            kind,
            category_ids: vec![],
            regular_price: None,
            sale: None,
            size: None,
        }
    }

    #[test]
    fn test_variations_and_listing() {
        let catalog = MemoryCatalog::new()
            .with_product(product(1, ProductKind::Variable))
            .with_product(product(2, ProductKind::Variation { parent_id: ProductId(1) }))
            .with_product(product(3, ProductKind::Variation { parent_id: ProductId(1) }))
            .with_product(product(4, ProductKind::Simple));

        assert_eq!(catalog.variations(ProductId(1)), vec![ProductId(2), ProductId(3)]);
        let listed: Vec<ProductId> = catalog.products().iter().map(|p| p.id).collect();
        assert_eq!(listed, vec![ProductId(1), ProductId(4)]);
    }

    #[test]
    fn test_child_categories() {
        let catalog = MemoryCatalog::new()
            .with_category(CategoryId(1), None)
            .with_category(CategoryId(2), Some(CategoryId(1)))
            .with_category(CategoryId(3), Some(CategoryId(2)));

        assert_eq!(catalog.child_categories(CategoryId(1)), vec![CategoryId(2)]);
        assert!(catalog.child_categories(CategoryId(3)).is_empty());
    }
}
