//! Shape contracts: named, fixed field-projection views of a resource.
//!
//! A shape declares exactly which fields of a record it exposes, which of
//! those fields embed related records through a nested shape, an optional
//! query-augmentation hook run before filtering (eager-loading the relations
//! the shape will render), and — for write-capable shapes — which fields the
//! client must supply and which the server assigns itself.

use crate::dispatch::RequestContext;
use crate::query::Query;

/// A query-augmentation hook, run when the shape is selected, before any
/// filter is applied.
pub type AugmentFn = fn(Query, &RequestContext) -> Query;

/// A field of a shape that embeds related records, serialized through
/// another resource's shape. The `(resource, shape)` pair is resolved
/// against the registry; the field must name a declared relation of the
/// owning resource whose target matches `resource`.
#[derive(Debug, Clone)]
pub struct NestedShape {
    pub field: &'static str,
    pub resource: &'static str,
    pub shape: &'static str,
    pub many: bool,
}

impl NestedShape {
    pub fn many(field: &'static str, resource: &'static str, shape: &'static str) -> Self {
        Self {
            field,
            resource,
            shape,
            many: true,
        }
    }

    pub fn one(field: &'static str, resource: &'static str, shape: &'static str) -> Self {
        Self {
            field,
            resource,
            shape,
            many: false,
        }
    }
}

/// A server-assigned field: hidden from client input, injected by the
/// dispatcher before validation.
#[derive(Debug, Clone)]
pub enum ServerAssigned {
    /// Set from the authenticated principal (the original's
    /// current-user default).
    CurrentUser(&'static str),
    /// Set to the request's wall-clock time.
    Timestamp(&'static str),
}

impl ServerAssigned {
    pub fn field(&self) -> &'static str {
        match self {
            ServerAssigned::CurrentUser(f) | ServerAssigned::Timestamp(f) => f,
        }
    }
}

/// Validation rules for a write-capable shape.
#[derive(Debug, Clone, Default)]
pub struct WriteRules {
    /// Fields that must be present (after server-assigned injection).
    pub required: Vec<&'static str>,
    /// Fields the server assigns; client-supplied values are discarded.
    pub server_assigned: Vec<ServerAssigned>,
}

impl WriteRules {
    pub fn required(fields: &[&'static str]) -> Self {
        Self {
            required: fields.to_vec(),
            server_assigned: Vec::new(),
        }
    }

    pub fn assigned(mut self, assigned: ServerAssigned) -> Self {
        self.server_assigned.push(assigned);
        self
    }
}

/// A named serialization view of a resource.
#[derive(Clone, Default)]
pub struct ShapeContract {
    /// Exactly the fields the shape exposes; nested fields appear here too.
    pub fields: Vec<&'static str>,
    /// Which of `fields` embed related records.
    pub nested: Vec<NestedShape>,
    /// Run before filtering when this shape is selected.
    pub augment: Option<AugmentFn>,
    /// Present on create/update shapes.
    pub write: Option<WriteRules>,
}

impl ShapeContract {
    pub fn new(fields: &[&'static str]) -> Self {
        Self {
            fields: fields.to_vec(),
            ..Default::default()
        }
    }

    pub fn nest(mut self, nested: NestedShape) -> Self {
        self.nested.push(nested);
        self
    }

    pub fn augment(mut self, f: AugmentFn) -> Self {
        self.augment = Some(f);
        self
    }

    pub fn write(mut self, rules: WriteRules) -> Self {
        self.write = Some(rules);
        self
    }

    /// The nested declaration for `field`, if any.
    pub fn nested_for(&self, field: &str) -> Option<&NestedShape> {
        self.nested.iter().find(|n| n.field == field)
    }
}

impl std::fmt::Debug for ShapeContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShapeContract")
            .field("fields", &self.fields)
            .field("nested", &self.nested)
            .field("augment", &self.augment.is_some())
            .field("write", &self.write)
            .finish()
    }
}
