//! Resource definitions and the process-wide registry.
//!
//! Each entity type exposed through the API owns a [`ResourceDefinition`]:
//! its shape map, filter map, relation metadata, default ordering, and the
//! keys that bypass filter validation. Definitions are assembled at startup
//! into a [`Registry`], validated once, and never mutated afterwards — safe
//! to share across unbounded concurrent requests without locking.

use indexmap::IndexMap;

use crate::dispatch::Method;
use crate::error::{Error, Result};
use crate::filter::FilterFn;
use crate::query::{OrderKey, Relation};
use crate::shape::ShapeContract;

/// Parameter keys accepted on every resource without filter registration:
/// pagination and ordering, handled by collaborators, not this layer.
pub const DEFAULT_PARAMS: &[&str] = &["cursor", "page", "ordering"];

/// One entity type's registration.
pub struct ResourceDefinition {
    /// Table name and route segment (pluralized, as the original router).
    pub name: &'static str,
    shapes: IndexMap<&'static str, ShapeContract>,
    /// Shape keys registered more than once; surfaced by `validate`.
    duplicate_shapes: Vec<&'static str>,
    default_shape: &'static str,
    method_shapes: IndexMap<Method, &'static str>,
    filters: IndexMap<&'static str, FilterFn>,
    relations: IndexMap<&'static str, Relation>,
    default_ordering: Vec<OrderKey>,
}

impl ResourceDefinition {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            shapes: IndexMap::new(),
            duplicate_shapes: Vec::new(),
            default_shape: "summary",
            method_shapes: IndexMap::new(),
            filters: IndexMap::new(),
            relations: IndexMap::new(),
            default_ordering: vec![OrderKey::asc("id")],
        }
    }

    /// Registers a shape under `key`. Duplicate keys are rejected when the
    /// registry is built.
    pub fn shape(mut self, key: &'static str, contract: ShapeContract) -> Self {
        if self.shapes.insert(key, contract).is_some() {
            self.duplicate_shapes.push(key);
        }
        self
    }

    /// Selects the shape returned for GET requests without a `projection`
    /// parameter (and the last-resort fallback for writes).
    pub fn default_shape(mut self, key: &'static str) -> Self {
        self.default_shape = key;
        self
    }

    /// Maps an HTTP method to a shape key. Method-keyed shapes are selected
    /// purely by method, never via `projection`.
    pub fn method_shape(mut self, method: Method, key: &'static str) -> Self {
        self.method_shapes.insert(method, key);
        self
    }

    pub fn filter(mut self, key: &'static str, f: FilterFn) -> Self {
        self.filters.insert(key, f);
        self
    }

    pub fn relation(mut self, field: &'static str, relation: Relation) -> Self {
        self.relations.insert(field, relation);
        self
    }

    pub fn order_by(mut self, keys: Vec<OrderKey>) -> Self {
        self.default_ordering = keys;
        self
    }

    pub fn shapes(&self) -> &IndexMap<&'static str, ShapeContract> {
        &self.shapes
    }

    pub fn get_shape(&self, key: &str) -> Option<&ShapeContract> {
        self.shapes.get(key)
    }

    pub fn default_shape_key(&self) -> &'static str {
        self.default_shape
    }

    pub fn method_shape_key(&self, method: Method) -> Option<&'static str> {
        self.method_shapes.get(&method).copied()
    }

    pub fn filters(&self) -> &IndexMap<&'static str, FilterFn> {
        &self.filters
    }

    pub fn relation_for(&self, field: &str) -> Option<&Relation> {
        self.relations.get(field)
    }

    pub fn relations(&self) -> &IndexMap<&'static str, Relation> {
        &self.relations
    }

    pub fn default_ordering(&self) -> &[OrderKey] {
        &self.default_ordering
    }
}

impl std::fmt::Debug for ResourceDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceDefinition")
            .field("name", &self.name)
            .field("shapes", &self.shapes.keys().collect::<Vec<_>>())
            .field("default_shape", &self.default_shape)
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The immutable set of all registered resources.
pub struct Registry {
    resources: IndexMap<&'static str, ResourceDefinition>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    /// Builds and validates a registry. Errors here are startup
    /// misconfigurations; a validated registry serves traffic unchanged for
    /// the life of the process.
    pub fn build(definitions: Vec<ResourceDefinition>) -> Result<Self> {
        let mut resources = IndexMap::new();
        for def in definitions {
            let name = def.name;
            if resources.insert(name, def).is_some() {
                return Err(Error::Registry(format!("duplicate resource: {name}")));
            }
        }
        let registry = Self { resources };
        registry.validate()?;
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&ResourceDefinition> {
        self.resources.get(name)
    }

    pub fn resource_names(&self) -> Vec<&'static str> {
        self.resources.keys().copied().collect()
    }

    fn validate(&self) -> Result<()> {
        for def in self.resources.values() {
            if let Some(key) = def.duplicate_shapes.first() {
                return Err(Error::Registry(format!(
                    "resource {} registers shape {key:?} twice",
                    def.name
                )));
            }
            if def.shapes.is_empty() {
                return Err(Error::Registry(format!(
                    "resource {} declares no shapes",
                    def.name
                )));
            }
            if def.get_shape(def.default_shape).is_none() {
                return Err(Error::Registry(format!(
                    "resource {} default shape {:?} is not registered",
                    def.name, def.default_shape
                )));
            }
            for (method, key) in &def.method_shapes {
                if def.get_shape(key).is_none() {
                    return Err(Error::Registry(format!(
                        "resource {} maps {method:?} to unknown shape {key:?}",
                        def.name
                    )));
                }
            }
            for (key, shape) in &def.shapes {
                if shape.fields.is_empty() {
                    return Err(Error::Registry(format!(
                        "shape {}.{key} exposes no fields",
                        def.name
                    )));
                }
                for nested in &shape.nested {
                    self.check_nested(def, key, nested)?;
                }
            }
        }
        self.check_cycles()
    }

    fn check_nested(
        &self,
        def: &ResourceDefinition,
        shape_key: &str,
        nested: &crate::shape::NestedShape,
    ) -> Result<()> {
        if !def.shapes[shape_key].fields.contains(&nested.field) {
            return Err(Error::Registry(format!(
                "shape {}.{shape_key} nests {:?} but does not expose it",
                def.name, nested.field
            )));
        }
        let target = self.get(nested.resource).ok_or_else(|| {
            Error::Registry(format!(
                "shape {}.{shape_key} nests unknown resource {:?}",
                def.name, nested.resource
            ))
        })?;
        if target.get_shape(nested.shape).is_none() {
            return Err(Error::Registry(format!(
                "shape {}.{shape_key} nests unknown shape {}.{}",
                def.name, nested.resource, nested.shape
            )));
        }
        let relation = def.relation_for(nested.field).ok_or_else(|| {
            Error::Registry(format!(
                "shape {}.{shape_key} nests {:?} with no declared relation",
                def.name, nested.field
            ))
        })?;
        if relation.target() != nested.resource {
            return Err(Error::Registry(format!(
                "shape {}.{shape_key} nests {:?} into {:?} but the relation targets {:?}",
                def.name, nested.field, nested.resource, relation.target()
            )));
        }
        if relation.is_many() != nested.many {
            return Err(Error::Registry(format!(
                "shape {}.{shape_key} nests {:?} with the wrong cardinality",
                def.name, nested.field
            )));
        }
        Ok(())
    }

    /// A shape may not transitively embed itself. DFS over the
    /// `(resource, shape)` nesting graph.
    fn check_cycles(&self) -> Result<()> {
        for (name, def) in &self.resources {
            for key in def.shapes.keys() {
                let mut stack = vec![(*name, *key)];
                self.walk(*name, *key, &mut stack)?;
            }
        }
        Ok(())
    }

    fn walk(
        &self,
        resource: &'static str,
        shape_key: &'static str,
        stack: &mut Vec<(&'static str, &'static str)>,
    ) -> Result<()> {
        let def = self
            .get(resource)
            .ok_or_else(|| Error::Registry(format!("unknown resource: {resource}")))?;
        let shape = def
            .get_shape(shape_key)
            .ok_or_else(|| Error::Registry(format!("unknown shape: {resource}.{shape_key}")))?;
        for nested in &shape.nested {
            let node = (nested.resource, nested.shape);
            if stack.contains(&node) {
                return Err(Error::Registry(format!(
                    "shape nesting cycle through {}.{}",
                    nested.resource, nested.shape
                )));
            }
            stack.push(node);
            self.walk(nested.resource, nested.shape, stack)?;
            stack.pop();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::NestedShape;

    fn bare(name: &'static str) -> ResourceDefinition {
        ResourceDefinition::new(name)
            .shape("summary", ShapeContract::new(&["id", "name"]))
            .default_shape("summary")
    }

    #[test]
    fn test_build_accepts_minimal_resource() {
        let registry = Registry::build(vec![bare("sectors")]).unwrap();
        assert!(registry.get("sectors").is_some());
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_build_rejects_empty_shape_map() {
        let err = Registry::build(vec![ResourceDefinition::new("sectors")]).unwrap_err();
        assert!(err.to_string().contains("no shapes"));
    }

    #[test]
    fn test_build_rejects_duplicate_shape_keys() {
        let def = bare("sectors").shape("summary", ShapeContract::new(&["id"]));
        let err = Registry::build(vec![def]).unwrap_err();
        assert!(err.to_string().contains("\"summary\" twice"));
    }

    #[test]
    fn test_build_rejects_dangling_default_shape() {
        let def = ResourceDefinition::new("sectors")
            .shape("summary", ShapeContract::new(&["id"]))
            .default_shape("detail");
        assert!(Registry::build(vec![def]).is_err());
    }

    #[test]
    fn test_build_rejects_nested_reference_without_relation() {
        let def = bare("programs").shape(
            "detail",
            ShapeContract::new(&["id", "name", "group_wbs_set"])
                .nest(NestedShape::many("group_wbs_set", "group_wbss", "summary")),
        );
        let err = Registry::build(vec![def, bare("group_wbss")]).unwrap_err();
        assert!(err.to_string().contains("no declared relation"));
    }

    #[test]
    fn test_build_rejects_shape_nesting_cycle() {
        let programs = bare("programs")
            .shape(
                "detail",
                ShapeContract::new(&["id", "group_wbs_set"])
                    .nest(NestedShape::many("group_wbs_set", "group_wbss", "detail")),
            )
            .relation("group_wbs_set", Relation::has_many("group_wbss", "program_id"));
        let group_wbss = bare("group_wbss")
            .shape(
                "detail",
                ShapeContract::new(&["id", "program"])
                    .nest(NestedShape::one("program", "programs", "detail")),
            )
            .relation("program", Relation::belongs_to("programs", "program_id"));

        let err = Registry::build(vec![programs, group_wbss]).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_build_accepts_acyclic_nesting() {
        let programs = bare("programs")
            .shape(
                "detail",
                ShapeContract::new(&["id", "name", "group_wbs_set"])
                    .nest(NestedShape::many("group_wbs_set", "group_wbss", "summary")),
            )
            .relation("group_wbs_set", Relation::has_many("group_wbss", "program_id"));

        assert!(Registry::build(vec![programs, bare("group_wbss")]).is_ok());
    }
}
