//! Generic CRUD handlers.
//!
//! One set of handlers serves every registered resource; the path's resource
//! segment selects the definition and everything else (shape, filters,
//! ordering, write rules) comes from the registry.

use axum::{
    extract::{Path, Query as Params, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use indexmap::IndexMap;
use serde_json::Value;

use crate::dispatch::{apply_query, resolve_shape, Method, Principal, RequestContext};
use crate::error::{Error, Result};
use crate::query::Query;
use crate::resource::ResourceDefinition;
use crate::serialize::{project, validate_write};
use crate::state::AppState;
use crate::store::{table, table_mut, Record};

/// Header carrying the authenticated username.
pub const PRINCIPAL_HEADER: &str = "x-progdata-user";

/// Builds the per-request context from the method, headers and query string.
pub(crate) fn context(
    method: Method,
    headers: &HeaderMap,
    params: IndexMap<String, String>,
) -> RequestContext {
    let mut ctx = RequestContext::new(method).with_params(params);
    if let Some(username) = headers
        .get(PRINCIPAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
    {
        ctx = ctx.with_principal(Principal {
            username: username.to_string(),
        });
    }
    ctx
}

fn lookup<'a>(state: &'a AppState, resource: &str) -> Result<&'a ResourceDefinition> {
    state
        .registry
        .get(resource)
        .ok_or_else(|| Error::NotFound(format!("unknown resource: {resource}")))
}

fn object_payload(payload: Value) -> Result<Record> {
    match payload {
        Value::Object(map) => Ok(map),
        _ => Err(Error::Validation(
            "request body must be a JSON object".to_string(),
        )),
    }
}

/// List a resource collection, honoring projection, filters and ordering.
///
/// GET /api/v1/{resource}
pub async fn list(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Params(params): Params<IndexMap<String, String>>,
) -> Result<Json<Value>> {
    list_named(state, &resource, headers, params).await
}

/// Shared list body, also used by the fixed-path upload collection routes.
pub(crate) async fn list_named(
    state: AppState,
    resource: &str,
    headers: HeaderMap,
    params: IndexMap<String, String>,
) -> Result<Json<Value>> {
    let def = lookup(&state, resource)?;
    let ctx = context(Method::Get, &headers, params);
    let (_, shape) = resolve_shape(def, &ctx)?;
    let query = apply_query(def, Query::new(def.name), shape, &ctx)?;

    let tables = state.store.read().await;
    let rows = query.run(&tables)?;
    let body = rows
        .iter()
        .map(|row| project(&state.registry, &tables, def, shape, row))
        .collect::<Result<Vec<_>>>()?;
    Ok(Json(Value::Array(body)))
}

/// Fetch one record by id.
///
/// GET /api/v1/{resource}/{id}
pub async fn retrieve(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, u64)>,
    headers: HeaderMap,
    Params(params): Params<IndexMap<String, String>>,
) -> Result<Json<Value>> {
    let def = lookup(&state, resource.as_str())?;
    let ctx = context(Method::Get, &headers, params);
    let (_, shape) = resolve_shape(def, &ctx)?;
    // Filter keys are validated on retrieve too; the record itself is
    // addressed by id, so the resulting query is not executed.
    apply_query(def, Query::new(def.name), shape, &ctx)?;

    let tables = state.store.read().await;
    let row = table(&tables, def.name)?
        .get(id)
        .ok_or_else(|| Error::NotFound(format!("{resource} {id} not found")))?;
    Ok(Json(project(&state.registry, &tables, def, shape, row)?))
}

/// Create a record.
///
/// POST /api/v1/{resource}
pub async fn create(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>)> {
    let def = lookup(&state, resource.as_str())?;
    let ctx = context(Method::Post, &headers, IndexMap::new());
    let (_, shape) = resolve_shape(def, &ctx)?;
    let payload = object_payload(payload)?;

    let registry = state.registry.clone();
    let body = state
        .store
        .transaction(|tables| {
            let record = validate_write(def, shape, &payload, &ctx, tables)?;
            let id = table_mut(tables, def.name)?.insert(record);
            let row = table(tables, def.name)?
                .get(id)
                .cloned()
                .ok_or_else(|| Error::Internal(format!("lost row {id} after insert")))?;
            project(&registry, tables, def, shape, &row)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(body)))
}

/// Update a record. PUT and PATCH share this handler; the method still
/// selects the shape, so a resource may register distinct contracts.
///
/// PUT|PATCH /api/v1/{resource}/{id}
pub async fn update(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, u64)>,
    method: axum::http::Method,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Json<Value>> {
    let def = lookup(&state, resource.as_str())?;
    let ctx = context(Method::try_from(&method)?, &headers, IndexMap::new());
    let (_, shape) = resolve_shape(def, &ctx)?;
    let payload = object_payload(payload)?;

    let registry = state.registry.clone();
    let body = state
        .store
        .transaction(|tables| {
            let record = validate_write(def, shape, &payload, &ctx, tables)?;
            if !table_mut(tables, def.name)?.update(id, record) {
                return Err(Error::NotFound(format!("{} {id} not found", def.name)));
            }
            let row = table(tables, def.name)?
                .get(id)
                .cloned()
                .ok_or_else(|| Error::Internal(format!("lost row {id} after update")))?;
            project(&registry, tables, def, shape, &row)
        })
        .await?;
    Ok(Json(body))
}

/// Delete a record.
///
/// DELETE /api/v1/{resource}/{id}
pub async fn destroy(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, u64)>,
) -> Result<StatusCode> {
    let def = lookup(&state, resource.as_str())?;
    state
        .store
        .transaction(|tables| {
            if table_mut(tables, def.name)?.delete(id) {
                Ok(())
            } else {
                Err(Error::NotFound(format!("{} {id} not found", def.name)))
            }
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
