//! Request dispatch: shape resolution and filter application.
//!
//! Given an inbound request, the dispatcher selects the output shape
//! ([`resolve_shape`]) and turns the query parameters into a final query
//! ([`apply_query`]): augmentation first, then all-or-nothing filter
//! validation, then each filter in parameter order, then ordering.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::query::{Direction, OrderKey, Query};
use crate::resource::{ResourceDefinition, DEFAULT_PARAMS};
use crate::shape::ShapeContract;

/// The HTTP methods the dispatcher understands, as an explicit enum rather
/// than a string key lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl TryFrom<&axum::http::Method> for Method {
    type Error = Error;

    fn try_from(m: &axum::http::Method) -> Result<Self> {
        match *m {
            axum::http::Method::GET => Ok(Method::Get),
            axum::http::Method::POST => Ok(Method::Post),
            axum::http::Method::PUT => Ok(Method::Put),
            axum::http::Method::PATCH => Ok(Method::Patch),
            axum::http::Method::DELETE => Ok(Method::Delete),
            _ => Err(Error::Internal(format!("unsupported method: {m}"))),
        }
    }
}

/// The authenticated principal, opaque to this layer.
#[derive(Debug, Clone)]
pub struct Principal {
    pub username: String,
}

/// Per-request state handed to shape augmentation and filter functions.
/// Created fresh for each inbound request and discarded with the response.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub principal: Option<Principal>,
    /// Query parameters, unique keys, insertion order preserved.
    pub params: IndexMap<String, String>,
}

impl RequestContext {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            principal: None,
            params: IndexMap::new(),
        }
    }

    pub fn with_params(mut self, params: IndexMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }
}

/// Resolves the output shape for a request.
///
/// Non-GET methods resolve through the method→shape map, falling back to the
/// resource default so a response is always representable. GET resolves the
/// `projection` parameter against the shape map — an unregistered key is a
/// hard `InvalidProjection`, never a silent default.
pub fn resolve_shape<'a>(
    def: &'a ResourceDefinition,
    ctx: &RequestContext,
) -> Result<(&'static str, &'a ShapeContract)> {
    let key = if ctx.method == Method::Get {
        match ctx.params.get("projection") {
            Some(requested) => match def.shapes().get_key_value(requested.as_str()) {
                Some((key, _)) => *key,
                None => return Err(Error::InvalidProjection(requested.clone())),
            },
            None => def.default_shape_key(),
        }
    } else {
        def.method_shape_key(ctx.method)
            .unwrap_or_else(|| def.default_shape_key())
    };

    let shape = def
        .get_shape(key)
        .ok_or_else(|| Error::Internal(format!("unvalidated shape key: {key}")))?;
    Ok((key, shape))
}

/// Applies the resolved shape's augmentation and the request's filters to
/// `base`, returning the final query for execution.
///
/// Validation is all-or-nothing: every non-default parameter key must be a
/// registered filter before any filter runs. Filters apply in parameter
/// order; ordering beyond "conjunctive unless a filter replaces the root"
/// carries no semantic guarantee.
pub fn apply_query(
    def: &ResourceDefinition,
    base: Query,
    shape: &ShapeContract,
    ctx: &RequestContext,
) -> Result<Query> {
    let mut query = base;

    // Augmentation runs before filtering; filters may reference joined data.
    if let Some(augment) = shape.augment {
        query = augment(query, ctx);
    }

    let mut params = ctx.params.clone();
    params.shift_remove("projection");
    let ordering_param = params.shift_remove("ordering");
    for key in DEFAULT_PARAMS {
        params.shift_remove(*key);
    }

    for key in params.keys() {
        if !def.filters().contains_key(key.as_str()) {
            return Err(Error::InvalidFilter(key.clone()));
        }
    }

    for (key, value) in &params {
        let filter = def.filters()[key.as_str()];
        query = filter(value, ctx).apply(query);
    }

    let ordering = ordering_param
        .as_deref()
        .map(parse_ordering)
        .filter(|keys| !keys.is_empty())
        .unwrap_or_else(|| def.default_ordering().to_vec());

    Ok(query.order_by(ordering))
}

/// Parses an `ordering` parameter: comma-separated field names, `-` prefix
/// for descending.
fn parse_ordering(raw: &str) -> Vec<OrderKey> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|field| match field.strip_prefix('-') {
            Some(rest) => OrderKey {
                field: rest.to_string(),
                direction: Direction::Desc,
            },
            None => OrderKey {
                field: field.to_string(),
                direction: Direction::Asc,
            },
        })
        .collect()
}
