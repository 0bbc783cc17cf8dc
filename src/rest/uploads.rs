//! Spreadsheet upload endpoints.
//!
//! Each POST takes a multipart form with a `sector` id and a `data_file`
//! CSV, records the upload, and reconciles the file against the persisted
//! items for that sector in one transaction.

use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use indexmap::IndexMap;
use serde_json::Value;

use crate::dispatch::{resolve_shape, Method};
use crate::error::{Error, Result};
use crate::ingest::{diff_and_apply, Sheet, UploadKind};
use crate::rest::crud;
use crate::serialize::{project, validate_write};
use crate::state::AppState;
use crate::store::{table, table_mut, Record};

/// POST /api/v1/alt_sub_uploads
pub async fn create_alt_sub_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>)> {
    create_upload(state, UploadKind::AltSub, headers, multipart).await
}

/// POST /api/v1/material_master_uploads
pub async fn create_material_master_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>)> {
    create_upload(state, UploadKind::MaterialMaster, headers, multipart).await
}

/// POST /api/v1/inventory_uploads
pub async fn create_inventory_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>)> {
    create_upload(state, UploadKind::Inventory, headers, multipart).await
}

/// GET /api/v1/alt_sub_uploads
pub async fn list_alt_sub_uploads(
    State(state): State<AppState>,
    headers: HeaderMap,
    axum::extract::Query(params): axum::extract::Query<IndexMap<String, String>>,
) -> Result<Json<Value>> {
    crud::list_named(state, "alt_sub_uploads", headers, params).await
}

/// GET /api/v1/material_master_uploads
pub async fn list_material_master_uploads(
    State(state): State<AppState>,
    headers: HeaderMap,
    axum::extract::Query(params): axum::extract::Query<IndexMap<String, String>>,
) -> Result<Json<Value>> {
    crud::list_named(state, "material_master_uploads", headers, params).await
}

/// GET /api/v1/inventory_uploads
pub async fn list_inventory_uploads(
    State(state): State<AppState>,
    headers: HeaderMap,
    axum::extract::Query(params): axum::extract::Query<IndexMap<String, String>>,
) -> Result<Json<Value>> {
    crud::list_named(state, "inventory_uploads", headers, params).await
}

struct UploadForm {
    sector_id: u64,
    file_name: String,
    bytes: Vec<u8>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut sector: Option<String> = None;
    let mut file_name: Option<String> = None;
    let mut bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::IngestionInput(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("sector") | Some("sector_id") => {
                sector = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| Error::IngestionInput(format!("unreadable sector: {e}")))?,
                );
            }
            Some("data_file") => {
                file_name = field.file_name().map(str::to_string);
                bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| Error::IngestionInput(format!("unreadable file: {e}")))?
                        .to_vec(),
                );
            }
            _ => {}
        }
    }

    let sector = sector
        .ok_or_else(|| Error::IngestionInput("missing form field: \"sector\"".to_string()))?;
    let sector_id = sector
        .parse::<u64>()
        .map_err(|_| Error::IngestionInput(format!("bad sector id {sector:?}")))?;
    let bytes = bytes
        .ok_or_else(|| Error::IngestionInput("missing file field: \"data_file\"".to_string()))?;

    Ok(UploadForm {
        sector_id,
        file_name: file_name.unwrap_or_else(|| "upload.csv".to_string()),
        bytes,
    })
}

async fn create_upload(
    state: AppState,
    kind: UploadKind,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>)> {
    let form = read_form(multipart).await?;
    let sheet = Sheet::parse(&form.bytes)?;

    let def = state
        .registry
        .get(kind.upload_resource())
        .ok_or_else(|| Error::Internal(format!("unregistered resource: {}", kind.upload_resource())))?;
    let ctx = crud::context(Method::Post, &headers, IndexMap::new());
    let (_, shape) = resolve_shape(def, &ctx)?;

    let mut payload = Record::new();
    payload.insert("sector_id".to_string(), Value::from(form.sector_id));
    payload.insert("data_file".to_string(), Value::String(form.file_name));

    // The upload record and the item reconciliation commit together or not
    // at all.
    let registry = state.registry.clone();
    let body = state
        .store
        .transaction(|tables| {
            let upload = validate_write(def, shape, &payload, &ctx, tables)?;
            let upload_id = table_mut(tables, def.name)?.insert(upload);
            diff_and_apply(kind, tables, form.sector_id, upload_id, &sheet)?;
            let row = table(tables, def.name)?
                .get(upload_id)
                .cloned()
                .ok_or_else(|| Error::Internal(format!("lost upload row {upload_id}")))?;
            project(&registry, tables, def, shape, &row)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(body)))
}
