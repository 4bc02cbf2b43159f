//! # maple-storefront: HTTP Adapters for Maple Pricing
//!
//! A thin axum layer over `maple-core`. Handlers translate cookies, query
//! strings and JSON bodies into core calls and back; they make no pricing
//! or visibility decisions of their own.
//!
//! ## Request Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP request                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  TraceLayer ──► handler                                                 │
//! │                   │                                                     │
//! │                   ├── Shopper: province + session cookies               │
//! │                   ├── AppState::engine(): pin current snapshot          │
//! │                   ├── begin_request(): one RequestContext               │
//! │                   ├── maple-core operations                             │
//! │                   └── cookie directive applied to the response          │
//! │                                                                         │
//! │  Background: spawn_refresher reloads the snapshot from SQLite          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use config::{ConfigError, StorefrontConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::{spawn_refresher, AppState, CartStore};

/// Builds the storefront router over shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/products", get(routes::products::list_products))
        .route("/products/{id}", get(routes::products::get_product))
        .route("/cart", get(routes::cart::get_cart))
        .route("/cart/items", post(routes::cart::add_item))
        .route("/checkout/validate", post(routes::checkout::validate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
