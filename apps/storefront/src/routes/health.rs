//! Health check for load balancers and monitoring.
//!
//! Reports the pinned snapshot and, when a database is attached, whether it
//! still answers. A failing database degrades the status without failing
//! the request: the storefront keeps serving the last good snapshot.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use tracing::warn;

use crate::dto::HealthResponse;
use crate::state::AppState;

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = match &state.db {
        Some(db) => Some(db.health_check().await),
        None => None,
    };

    let snapshot = state.snapshot();
    let status = if database == Some(false) {
        warn!("Database health check failed, serving cached snapshot");
        "degraded"
    } else {
        "ok"
    };

    Json(HealthResponse {
        status: status.to_string(),
        products: u32::try_from(snapshot.product_count()).unwrap_or(u32::MAX),
        snapshot_loaded_at: snapshot.loaded_at().to_rfc3339(),
        database,
    })
}
