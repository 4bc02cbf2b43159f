//! # maple-db: Database Layer for Maple Pricing
//!
//! Stores the catalog and the pricing options in SQLite and serves them to
//! `maple-core` as immutable snapshots.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Maple Pricing Data Flow                            │
//! │                                                                         │
//! │  storefront refresher (every N seconds)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     maple-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │◄───│ products      │    │  (embedded)  │   │   │
//! │  │   │   SqlitePool  │    │ categories    │    │ 001_catalog  │   │   │
//! │  │   │               │    │ settings      │    │ 002_settings │   │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘   │   │
//! │  │                                ▼                                │   │
//! │  │                        CatalogSnapshot                         │   │
//! │  │                  impl Catalog + SettingsSource                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use maple_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("maple.db")).await?;
//! let snapshot = db.snapshot().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod snapshot;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use snapshot::CatalogSnapshot;

pub use repository::category::{CategoryRecord, CategoryRepository};
pub use repository::product::ProductRepository;
pub use repository::settings::SettingsRepository;
