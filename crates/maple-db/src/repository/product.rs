//! # Product Repository
//!
//! Products, variable parents and their variations.
//!
//! ## Row Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products row                          maple_core::Product              │
//! │  ─────────────                         ───────────────────              │
//! │  kind = 'simple'                  ──►  ProductKind::Simple              │
//! │  kind = 'variable'                ──►  ProductKind::Variable            │
//! │  kind = 'variation', parent_id=7  ──►  ProductKind::Variation{7}        │
//! │  regular_price  "24.50"           ──►  Some(Decimal 24.50)              │
//! │  sale_price     "19.99" + window  ──►  Some(SalePrice{..})              │
//! │  product_categories rows          ──►  category_ids                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Prices are written and read as decimal TEXT. Nothing computed by the
//! pricing pipeline is ever written here.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing::debug;

use super::{domain_id, sql_id};
use crate::error::{DbError, DbResult};
use maple_core::types::{CategoryId, Product, ProductId, ProductKind, SalePrice};

const SELECT_PRODUCT: &str = "SELECT p.id, p.name, p.kind, p.parent_id, p.regular_price, \
     p.sale_price, p.sale_starts_at, p.sale_ends_at, p.size FROM products p";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    kind: String,
    parent_id: Option<i64>,
    regular_price: Option<String>,
    sale_price: Option<String>,
    sale_starts_at: Option<DateTime<Utc>>,
    sale_ends_at: Option<DateTime<Utc>>,
    size: Option<String>,
}

impl ProductRow {
    fn into_product(self, category_ids: Vec<CategoryId>) -> DbResult<Product> {
        let kind = match (self.kind.as_str(), self.parent_id) {
            ("simple", _) => ProductKind::Simple,
            ("variable", _) => ProductKind::Variable,
            ("variation", Some(parent)) => ProductKind::Variation {
                parent_id: ProductId(domain_id("products.parent_id", parent)?),
            },
            (other, _) => return Err(DbError::invalid("products.kind", other)),
        };

        let sale = match self.sale_price {
            Some(amount) => Some(SalePrice {
                amount: parse_price("products.sale_price", &amount)?,
                starts_at: self.sale_starts_at,
                ends_at: self.sale_ends_at,
            }),
            None => None,
        };

        Ok(Product {
            id: ProductId(domain_id("products.id", self.id)?),
            name: self.name,
            kind,
            category_ids,
            regular_price: self
                .regular_price
                .as_deref()
                .map(|p| parse_price("products.regular_price", p))
                .transpose()?,
            sale,
            size: self.size,
        })
    }
}

fn parse_price(column: &str, value: &str) -> DbResult<Decimal> {
    Decimal::from_str(value.trim()).map_err(|_| DbError::invalid(column, value))
}

fn kind_columns(kind: ProductKind) -> DbResult<(&'static str, Option<i64>)> {
    Ok(match kind {
        ProductKind::Simple => ("simple", None),
        ProductKind::Variable => ("variable", None),
        ProductKind::Variation { parent_id } => {
            ("variation", Some(sql_id("products.parent_id", parent_id.0)?))
        }
    })
}

/// Repository for product rows.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product and its category assignments in one transaction.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - id already exists
    /// * `Err(DbError::ForeignKeyViolation)` - missing parent or category
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        let id = sql_id("products.id", product.id.0)?;
        let (kind, parent_id) = kind_columns(product.kind)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, kind, parent_id,
                regular_price, sale_price, sale_starts_at, sale_ends_at, size
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(id)
        .bind(&product.name)
        .bind(kind)
        .bind(parent_id)
        .bind(product.regular_price.map(|p| p.to_string()))
        .bind(product.sale.as_ref().map(|s| s.amount.to_string()))
        .bind(product.sale.as_ref().and_then(|s| s.starts_at))
        .bind(product.sale.as_ref().and_then(|s| s.ends_at))
        .bind(&product.size)
        .execute(&mut *tx)
        .await?;

        for category in &product.category_ids {
            sqlx::query("INSERT INTO product_categories (product_id, category_id) VALUES (?1, ?2)")
                .bind(id)
                .bind(sql_id("product_categories.category_id", category.0)?)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Every stored record, variations included.
    pub async fn all(&self) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!("{} ORDER BY p.id", SELECT_PRODUCT))
            .fetch_all(&self.pool)
            .await?;

        self.attach_categories(rows).await
    }

    /// Number of stored records, variations included.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn attach_categories(&self, rows: Vec<ProductRow>) -> DbResult<Vec<Product>> {
        let assignments: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT product_id, category_id FROM product_categories ORDER BY category_id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_product: HashMap<i64, Vec<CategoryId>> = HashMap::new();
        for (product_id, category_id) in assignments {
            let category = domain_id("product_categories.category_id", category_id)?;
            by_product
                .entry(product_id)
                .or_default()
                .push(CategoryId(category));
        }

        rows.into_iter()
            .map(|row| {
                let categories = by_product.remove(&row.id).unwrap_or_default();
                row.into_product(categories)
            })
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
