//! # Category Repository
//!
//! The category tree. Only the shape matters to pricing: taxable roots are
//! expanded through `parent_id`.

use sqlx::SqlitePool;
use tracing::debug;

use super::{domain_id, sql_id};
use crate::error::DbResult;
use maple_core::types::CategoryId;

/// One stored category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: Option<CategoryId>,
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    parent_id: Option<i64>,
}

impl CategoryRow {
    fn into_record(self) -> DbResult<CategoryRecord> {
        Ok(CategoryRecord {
            id: CategoryId(domain_id("categories.id", self.id)?),
            name: self.name,
            parent_id: self
                .parent_id
                .map(|p| domain_id("categories.parent_id", p).map(CategoryId))
                .transpose()?,
        })
    }
}

/// Repository for category rows.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Inserts a category. Parents must be inserted first.
    pub async fn insert(&self, category: &CategoryRecord) -> DbResult<()> {
        debug!(id = %category.id, name = %category.name, "Inserting category");

        let parent = category
            .parent_id
            .map(|p| sql_id("categories.parent_id", p.0))
            .transpose()?;

        sqlx::query("INSERT INTO categories (id, name, parent_id) VALUES (?1, ?2, ?3)")
            .bind(sql_id("categories.id", category.id.0)?)
            .bind(&category.name)
            .bind(parent)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Direct children of a category.
    pub async fn children(&self, parent: CategoryId) -> DbResult<Vec<CategoryRecord>> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT id, name, parent_id FROM categories WHERE parent_id = ?1 ORDER BY id",
        )
        .bind(sql_id("categories.parent_id", parent.0)?)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CategoryRow::into_record).collect()
    }

    /// The whole tree, ordered by id.
    pub async fn all(&self) -> DbResult<Vec<CategoryRecord>> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT id, name, parent_id FROM categories ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(CategoryRow::into_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};

    fn category(id: u64, parent: Option<u64>) -> CategoryRecord {
        CategoryRecord {
            id: CategoryId(id),
            name: format!("Category {}", id),
            parent_id: parent.map(CategoryId),
        }
    }

    #[tokio::test]
    async fn test_tree_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.categories();

        repo.insert(&category(1, None)).await.unwrap();
        repo.insert(&category(2, Some(1))).await.unwrap();
        repo.insert(&category(3, Some(1))).await.unwrap();

        let children: Vec<CategoryId> =
            repo.children(CategoryId(1)).await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(children, vec![CategoryId(2), CategoryId(3)]);
        assert_eq!(repo.all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_parent_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let result = db.categories().insert(&category(2, Some(99))).await;
        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));
    }
}
