//! Record serialization through shape contracts, and write-payload
//! validation.
//!
//! [`project`] renders exactly the field set a shape declares — never more,
//! never less — recursing into nested shapes through the owning resource's
//! relations. [`validate_write`] is the create/update counterpart: the
//! dispatcher injects server-assigned defaults here before required-field
//! validation, so a shape contract never has to know about the request.

use serde_json::Value;

use crate::dispatch::{Method, RequestContext};
use crate::error::{Error, Result};
use crate::query::Relation;
use crate::resource::{Registry, ResourceDefinition};
use crate::shape::{ServerAssigned, ShapeContract};
use crate::store::{table, Record, Tables};

/// Serializes `record` through `shape`.
///
/// Nested fields prefer relation data already embedded by an eager load;
/// otherwise they are resolved lazily through the declared relation.
pub fn project(
    registry: &Registry,
    tables: &Tables,
    def: &ResourceDefinition,
    shape: &ShapeContract,
    record: &Record,
) -> Result<Value> {
    let mut out = serde_json::Map::new();
    for field in &shape.fields {
        match shape.nested_for(field) {
            Some(nested) => {
                let target_def = registry.get(nested.resource).ok_or_else(|| {
                    Error::Internal(format!("unvalidated nested resource: {}", nested.resource))
                })?;
                let target_shape = target_def.get_shape(nested.shape).ok_or_else(|| {
                    Error::Internal(format!(
                        "unvalidated nested shape: {}.{}",
                        nested.resource, nested.shape
                    ))
                })?;

                let related = embedded_records(record, field).map_or_else(
                    || match def.relation_for(field) {
                        Some(relation) => relation.resolve(record, tables),
                        None => Err(Error::Internal(format!(
                            "no relation for nested field {field:?}"
                        ))),
                    },
                    Ok,
                )?;

                let projected = related
                    .iter()
                    .map(|row| project(registry, tables, target_def, target_shape, row))
                    .collect::<Result<Vec<_>>>()?;

                let value = if nested.many {
                    Value::Array(projected)
                } else {
                    projected.into_iter().next().unwrap_or(Value::Null)
                };
                out.insert(field.to_string(), value);
            }
            None => {
                out.insert(
                    field.to_string(),
                    record.get(*field).cloned().unwrap_or(Value::Null),
                );
            }
        }
    }
    Ok(Value::Object(out))
}

/// Related records an eager load already embedded under `field`, if any.
fn embedded_records(record: &Record, field: &str) -> Option<Vec<Record>> {
    match record.get(field) {
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|v| v.as_object().cloned())
                .collect(),
        ),
        Some(Value::Object(obj)) => Some(vec![obj.clone()]),
        _ => None,
    }
}

/// Validates a client write payload against a write-capable shape, returning
/// the record to persist.
///
/// Order matters: server-assigned fields are injected first (discarding any
/// client-supplied value), then required fields are checked (except under
/// PATCH, which is a partial update), then foreign keys are verified against
/// the store.
pub fn validate_write(
    def: &ResourceDefinition,
    shape: &ShapeContract,
    payload: &Record,
    ctx: &RequestContext,
    tables: &Tables,
) -> Result<Record> {
    let mut record = Record::new();

    // Only fields the shape exposes are accepted; unknown payload keys are
    // ignored, and nested read-only fields are not writable.
    for field in &shape.fields {
        if *field == "id" || shape.nested_for(field).is_some() {
            continue;
        }
        if let Some(value) = payload.get(*field) {
            record.insert(field.to_string(), value.clone());
        }
    }

    if let Some(rules) = &shape.write {
        for assigned in &rules.server_assigned {
            match assigned {
                ServerAssigned::CurrentUser(field) => match &ctx.principal {
                    Some(principal) => {
                        record.insert(
                            field.to_string(),
                            Value::String(principal.username.clone()),
                        );
                    }
                    None => {
                        record.remove(*field);
                    }
                },
                ServerAssigned::Timestamp(field) => {
                    record.insert(
                        field.to_string(),
                        Value::String(chrono::Utc::now().to_rfc3339()),
                    );
                }
            }
        }

        // PATCH is a partial update; fields the payload omits keep their
        // stored values, so only supplied fields are checked.
        if ctx.method != Method::Patch {
            for required in &rules.required {
                match record.get(*required) {
                    Some(v) if !v.is_null() => {}
                    _ => {
                        return Err(Error::Validation(format!(
                            "missing required field: \"{required}\""
                        )))
                    }
                }
            }
        }
    }

    check_references(def, &record, tables)?;
    Ok(record)
}

/// Verifies every populated foreign key resolves to an existing record.
fn check_references(def: &ResourceDefinition, record: &Record, tables: &Tables) -> Result<()> {
    for field in record.keys() {
        for (target, target_key) in def.relations().values().filter_map(|r| match r {
            Relation::BelongsTo {
                target,
                local_key,
                target_key,
            } if *local_key == field.as_str() => Some((*target, *target_key)),
            _ => None,
        }) {
            let value = match record.get(field) {
                Some(v) if !v.is_null() => v,
                _ => continue,
            };
            let found = table(tables, target)?
                .iter()
                .any(|(_, row)| row.get(target_key) == Some(value));
            if !found {
                return Err(Error::ReferentialIntegrity(format!(
                    "{}.{field} references missing {target} record {value}",
                    def.name
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{Method, Principal, RequestContext};
    use crate::query::Relation;
    use crate::shape::{NestedShape, WriteRules};
    use crate::store::Table;
    use serde_json::json;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn registry() -> Registry {
        let programs = ResourceDefinition::new("programs")
            .shape("summary", ShapeContract::new(&["id", "name", "model_code"]))
            .shape(
                "detail",
                ShapeContract::new(&["id", "name", "model_code", "group_wbs_set"])
                    .nest(NestedShape::many("group_wbs_set", "group_wbss", "summary")),
            )
            .default_shape("summary")
            .relation(
                "group_wbs_set",
                Relation::has_many("group_wbss", "program_id"),
            );
        let group_wbss = ResourceDefinition::new("group_wbss")
            .shape("summary", ShapeContract::new(&["id", "name"]))
            .default_shape("summary");
        Registry::build(vec![programs, group_wbss]).unwrap()
    }

    fn tables() -> Tables {
        let mut tables = Tables::new();
        let mut programs = Table::default();
        programs.insert(record(&[
            ("name", json!("Apollo")),
            ("model_code", json!("AP-1")),
            ("slug", json!("apollo")),
        ]));
        tables.insert("programs", programs);

        let mut group_wbs = Table::default();
        group_wbs.insert(record(&[
            ("name", json!("Y-AAAAA-AB")),
            ("program_id", json!(1)),
            ("program_type", json!(1)),
        ]));
        tables.insert("group_wbss", group_wbs);
        tables
    }

    #[test]
    fn test_projection_exposes_exactly_declared_fields() {
        let registry = registry();
        let tables = tables();
        let def = registry.get("programs").unwrap();
        let shape = def.get_shape("summary").unwrap();
        let row = table(&tables, "programs").unwrap().get(1).unwrap();

        let value = project(&registry, &tables, def, shape, row).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert!(obj.contains_key("id"));
        assert!(obj.contains_key("name"));
        assert!(obj.contains_key("model_code"));
        // `slug` is persisted but not part of the shape.
        assert!(!obj.contains_key("slug"));
    }

    #[test]
    fn test_nested_shape_projects_through_relation() {
        let registry = registry();
        let tables = tables();
        let def = registry.get("programs").unwrap();
        let shape = def.get_shape("detail").unwrap();
        let row = table(&tables, "programs").unwrap().get(1).unwrap();

        let value = project(&registry, &tables, def, shape, row).unwrap();
        let nested = value["group_wbs_set"].as_array().unwrap();
        assert_eq!(nested.len(), 1);
        let obj = nested[0].as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["name"], json!("Y-AAAAA-AB"));
        // Nested summary hides the group's program_type.
        assert!(!obj.contains_key("program_type"));
    }

    #[test]
    fn test_validate_write_injects_before_required_check() {
        let def = ResourceDefinition::new("alt_sub_uploads")
            .shape(
                "create",
                ShapeContract::new(&["id", "sector_id", "data_file", "uploaded_by"]).write(
                    WriteRules::required(&["sector_id", "uploaded_by"])
                        .assigned(ServerAssigned::CurrentUser("uploaded_by")),
                ),
            )
            .default_shape("create");
        let shape = def.get_shape("create").unwrap();
        let tables = Tables::new();

        // Client cannot spoof uploaded_by; the principal wins.
        let ctx = RequestContext::new(Method::Post).with_principal(Principal {
            username: "mgomez".to_string(),
        });
        let payload = record(&[
            ("sector_id", json!(1)),
            ("uploaded_by", json!("intruder")),
        ]);
        let rec = validate_write(&def, shape, &payload, &ctx, &tables).unwrap();
        assert_eq!(rec["uploaded_by"], json!("mgomez"));

        // Without a principal the required check fails, naming the field.
        let ctx = RequestContext::new(Method::Post);
        let err = validate_write(&def, shape, &payload, &ctx, &tables).unwrap_err();
        assert!(err.to_string().contains("uploaded_by"));
    }

    #[test]
    fn test_patch_skips_required_checks_for_partial_updates() {
        let def = ResourceDefinition::new("programs")
            .shape(
                "edit",
                ShapeContract::new(&["id", "name", "model_code"])
                    .write(WriteRules::required(&["name"])),
            )
            .default_shape("edit");
        let shape = def.get_shape("edit").unwrap();
        let tables = Tables::new();
        let payload = record(&[("model_code", json!("AP-2"))]);

        // PUT replaces the record; the missing name is an error.
        let ctx = RequestContext::new(Method::Put);
        let err = validate_write(&def, shape, &payload, &ctx, &tables).unwrap_err();
        assert!(err.to_string().contains("name"));

        // PATCH merges; omitted fields keep their stored values.
        let ctx = RequestContext::new(Method::Patch);
        let rec = validate_write(&def, shape, &payload, &ctx, &tables).unwrap();
        assert_eq!(rec["model_code"], json!("AP-2"));
        assert!(!rec.contains_key("name"));
    }

    #[test]
    fn test_validate_write_rejects_dangling_foreign_key() {
        let tables = tables();
        let def = ResourceDefinition::new("group_wbss")
            .shape(
                "create",
                ShapeContract::new(&["id", "name", "program_id"])
                    .write(WriteRules::required(&["name", "program_id"])),
            )
            .default_shape("create")
            .relation("program", Relation::belongs_to("programs", "program_id"));
        let shape = def.get_shape("create").unwrap();
        let ctx = RequestContext::new(Method::Post);

        let ok = record(&[("name", json!("Y-CCCCC-EF")), ("program_id", json!(1))]);
        assert!(validate_write(&def, shape, &ok, &ctx, &tables).is_ok());

        let dangling = record(&[("name", json!("Y-CCCCC-EF")), ("program_id", json!(99))]);
        let err = validate_write(&def, shape, &dangling, &ctx, &tables).unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity(_)));
    }
}
