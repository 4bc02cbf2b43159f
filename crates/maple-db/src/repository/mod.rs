//! # Repository Module
//!
//! SQL access for catalog rows and pricing options.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Database::snapshot()                                                   │
//! │       │                                                                 │
//! │       ├── db.categories().all()     ──► category tree                  │
//! │       ├── db.products().all()       ──► products + variations          │
//! │       └── db.settings().load_map()  ──► SettingsMap                    │
//! │                                                                         │
//! │  Request handlers never query SQLite while pricing; they read the      │
//! │  snapshot. Repositories are used by the seed tool and the refresher.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Products and variations
//! - [`CategoryRepository`](category::CategoryRepository) - Category tree
//! - [`SettingsRepository`](settings::SettingsRepository) - Pricing options

pub mod category;
pub mod product;
pub mod settings;

use crate::error::{DbError, DbResult};

/// Converts a domain id to SQLite's signed INTEGER.
pub(crate) fn sql_id(column: &str, id: u64) -> DbResult<i64> {
    i64::try_from(id).map_err(|_| DbError::invalid(column, id.to_string()))
}

/// Converts a stored INTEGER back to a domain id.
pub(crate) fn domain_id(column: &str, id: i64) -> DbResult<u64> {
    u64::try_from(id).map_err(|_| DbError::invalid(column, id.to_string()))
}
