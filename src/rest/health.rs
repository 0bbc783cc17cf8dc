//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status; this backend has no degraded mode.
    pub status: String,
    /// Number of registered resources.
    pub resources: usize,
    /// Total records across all tables.
    pub records: usize,
    /// Version
    pub version: String,
}

/// Health check endpoint
///
/// GET /api/v1/health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let tables = state.store.read().await;
    let records = tables.values().map(|t| t.len()).sum();

    Json(HealthResponse {
        status: "healthy".to_string(),
        resources: state.registry.resource_names().len(),
        records,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
