//! REST API endpoints.
//!
//! ## Endpoints
//!
//! ### Generic resources
//! - `GET    /api/v1/{resource}` - List (projection, filters, ordering)
//! - `POST   /api/v1/{resource}` - Create
//! - `GET    /api/v1/{resource}/{id}` - Retrieve
//! - `PUT    /api/v1/{resource}/{id}` - Replace
//! - `PATCH  /api/v1/{resource}/{id}` - Partial update
//! - `DELETE /api/v1/{resource}/{id}` - Delete
//!
//! ### Spreadsheet ingestion
//! - `POST   /api/v1/alt_sub_uploads` - Ingest an alt/sub report
//! - `POST   /api/v1/material_master_uploads` - Ingest a material master extract
//! - `POST   /api/v1/inventory_uploads` - Ingest an inventory extract
//!
//! ### Health
//! - `GET    /api/v1/health` - Health check

pub mod crud;
pub mod health;
pub mod uploads;

pub use crud::PRINCIPAL_HEADER;

use crate::state::AppState;
use axum::{routing::get, Router};

/// Create REST API router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/health", get(health::health_check))
        // Upload collections take multipart POSTs; their fixed paths win
        // over the generic resource routes below.
        .route(
            "/api/v1/alt_sub_uploads",
            get(uploads::list_alt_sub_uploads).post(uploads::create_alt_sub_upload),
        )
        .route(
            "/api/v1/material_master_uploads",
            get(uploads::list_material_master_uploads)
                .post(uploads::create_material_master_upload),
        )
        .route(
            "/api/v1/inventory_uploads",
            get(uploads::list_inventory_uploads).post(uploads::create_inventory_upload),
        )
        // Generic resource CRUD
        .route("/api/v1/{resource}", get(crud::list).post(crud::create))
        .route(
            "/api/v1/{resource}/{id}",
            get(crud::retrieve)
                .put(crud::update)
                .patch(crud::update)
                .delete(crud::destroy),
        )
}
