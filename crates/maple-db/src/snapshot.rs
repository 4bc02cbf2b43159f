//! # Catalog Snapshot
//!
//! An immutable in-memory copy of the catalog and the pricing options.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   SQLite ──load()──► CatalogSnapshot ──Arc──► PricingEngine             │
//! │                        │                                                │
//! │                        ├── impl Catalog          (products, tree)       │
//! │                        └── impl SettingsSource   (options)              │
//! │                                                                         │
//! │   A refresher swaps in a newer snapshot; requests already running      │
//! │   keep the one they started with.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::DbResult;
use crate::pool::Database;
use maple_core::catalog::{Catalog, MemoryCatalog};
use maple_core::settings::{RawSetting, SettingKey, SettingsMap, SettingsSource};
use maple_core::types::{CategoryId, Product, ProductId};

/// Point-in-time view of everything pricing reads.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    catalog: MemoryCatalog,
    settings: SettingsMap,
    loaded_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    /// Reads categories, products and settings.
    pub async fn load(db: &Database) -> DbResult<Self> {
        let mut catalog = MemoryCatalog::new();

        for category in db.categories().all().await? {
            catalog.add_category(category.id, category.parent_id);
        }
        for product in db.products().all().await? {
            catalog.add_product(product);
        }

        let settings = db.settings().load_map().await?;

        info!(
            products = catalog.product_count(),
            settings = settings.len(),
            "Catalog snapshot loaded"
        );

        Ok(CatalogSnapshot {
            catalog,
            settings,
            loaded_at: Utc::now(),
        })
    }

    /// Builds a snapshot from data already in memory.
    pub fn from_parts(catalog: MemoryCatalog, settings: SettingsMap) -> Self {
        CatalogSnapshot {
            catalog,
            settings,
            loaded_at: Utc::now(),
        }
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn product_count(&self) -> usize {
        self.catalog.product_count()
    }

    pub fn settings(&self) -> &SettingsMap {
        &self.settings
    }
}

impl Catalog for CatalogSnapshot {
    fn product(&self, id: ProductId) -> Option<Product> {
        self.catalog.product(id)
    }

    fn variations(&self, parent: ProductId) -> Vec<ProductId> {
        self.catalog.variations(parent)
    }

    fn child_categories(&self, category: CategoryId) -> Vec<CategoryId> {
        self.catalog.child_categories(category)
    }

    fn products(&self) -> Vec<Product> {
        self.catalog.products()
    }
}

impl SettingsSource for CatalogSnapshot {
    fn get(&self, key: &SettingKey) -> Option<RawSetting> {
        self.settings.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::category::CategoryRecord;
    use crate::DbConfig;
    use maple_core::jurisdiction::Jurisdiction;
    use maple_core::types::ProductKind;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_snapshot_exposes_catalog_and_settings() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        db.categories()
            .insert(&CategoryRecord {
                id: CategoryId(1),
                name: "E-liquids".to_string(),
                parent_id: None,
            })
            .await
            .unwrap();
        db.categories()
            .insert(&CategoryRecord {
                id: CategoryId(2),
                name: "Salt nic".to_string(),
                parent_id: Some(CategoryId(1)),
            })
            .await
            .unwrap();
        db.products()
            .insert(&Product {
                id: ProductId(7),
                name: "Mango".to_string(),
                kind: ProductKind::Simple,
                category_ids: vec![CategoryId(2)],
                regular_price: Some(Decimal::from(20)),
                sale: None,
                size: None,
            })
            .await
            .unwrap();
        db.settings()
            .set_text(&SettingKey::TaxRate(Jurisdiction::Ontario), "13")
            .await
            .unwrap();

        let snapshot = db.snapshot().await.unwrap();

        assert_eq!(snapshot.product_count(), 1);
        assert_eq!(snapshot.child_categories(CategoryId(1)), vec![CategoryId(2)]);
        assert_eq!(
            snapshot.product(ProductId(7)).map(|p| p.category_ids),
            Some(vec![CategoryId(2)])
        );
        assert_eq!(
            SettingsSource::get(&snapshot, &SettingKey::TaxRate(Jurisdiction::Ontario)),
            Some(RawSetting::from("13"))
        );
    }
}
