//! Query values executed against the record store.
//!
//! A [`Query`] is the unit the dispatcher threads through shape augmentation
//! and filter application: a resource name, a conjunctive list of predicates,
//! a list of relations to eager-load, and an ordering. Nothing here touches
//! the store until [`Query::run`].

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::store::{table, Record, Tables};

/// Sort direction for one ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// One ordering key: a field name and a direction.
#[derive(Debug, Clone)]
pub struct OrderKey {
    pub field: String,
    pub direction: Direction,
}

impl OrderKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// A row predicate. Receives the full table set so related-record filters
/// can run subqueries.
pub type Predicate = Arc<dyn Fn(&Record, &Tables) -> bool + Send + Sync>;

/// How a record reaches its related records.
#[derive(Debug, Clone)]
pub enum Relation {
    /// Rows of `target` whose `foreign_key` field equals this record's id.
    HasMany {
        target: &'static str,
        foreign_key: &'static str,
    },
    /// The row of `target` whose `target_key` field equals this record's
    /// `local_key` field. `target_key` is usually `id`, but the original data
    /// model also links by natural key (material masters by name).
    BelongsTo {
        target: &'static str,
        local_key: &'static str,
        target_key: &'static str,
    },
    /// Rows of `target` reached through a join table.
    ManyToMany {
        target: &'static str,
        through: &'static str,
        local_fk: &'static str,
        remote_fk: &'static str,
    },
}

impl Relation {
    pub fn has_many(target: &'static str, foreign_key: &'static str) -> Self {
        Relation::HasMany {
            target,
            foreign_key,
        }
    }

    pub fn belongs_to(target: &'static str, local_key: &'static str) -> Self {
        Relation::BelongsTo {
            target,
            local_key,
            target_key: "id",
        }
    }

    pub fn belongs_to_by(
        target: &'static str,
        local_key: &'static str,
        target_key: &'static str,
    ) -> Self {
        Relation::BelongsTo {
            target,
            local_key,
            target_key,
        }
    }

    pub fn many_to_many(
        target: &'static str,
        through: &'static str,
        local_fk: &'static str,
        remote_fk: &'static str,
    ) -> Self {
        Relation::ManyToMany {
            target,
            through,
            local_fk,
            remote_fk,
        }
    }

    /// The resource the relation points at.
    pub fn target(&self) -> &'static str {
        match self {
            Relation::HasMany { target, .. }
            | Relation::BelongsTo { target, .. }
            | Relation::ManyToMany { target, .. } => target,
        }
    }

    /// Whether the relation yields many records (or at most one).
    pub fn is_many(&self) -> bool {
        !matches!(self, Relation::BelongsTo { .. })
    }

    /// Materializes the related records for `record`.
    pub fn resolve(&self, record: &Record, tables: &Tables) -> Result<Vec<Record>> {
        match self {
            Relation::HasMany {
                target,
                foreign_key,
            } => {
                let id = record.get("id").cloned().unwrap_or(Value::Null);
                Ok(table(tables, target)?
                    .iter()
                    .filter(|(_, row)| row.get(*foreign_key) == Some(&id))
                    .map(|(_, row)| row.clone())
                    .collect())
            }
            Relation::BelongsTo {
                target,
                local_key,
                target_key,
            } => {
                let key = match record.get(*local_key) {
                    Some(v) if !v.is_null() => v.clone(),
                    _ => return Ok(Vec::new()),
                };
                Ok(table(tables, target)?
                    .iter()
                    .filter(|(_, row)| row.get(*target_key) == Some(&key))
                    .map(|(_, row)| row.clone())
                    .take(1)
                    .collect())
            }
            Relation::ManyToMany {
                target,
                through,
                local_fk,
                remote_fk,
            } => {
                let id = record.get("id").cloned().unwrap_or(Value::Null);
                let remote_ids: Vec<Value> = table(tables, through)?
                    .iter()
                    .filter(|(_, row)| row.get(*local_fk) == Some(&id))
                    .filter_map(|(_, row)| row.get(*remote_fk).cloned())
                    .collect();
                Ok(table(tables, target)?
                    .iter()
                    .filter(|(_, row)| {
                        row.get("id")
                            .map(|rid| remote_ids.contains(rid))
                            .unwrap_or(false)
                    })
                    .map(|(_, row)| row.clone())
                    .collect())
            }
        }
    }
}

/// A composable query over one resource's table.
#[derive(Clone)]
pub struct Query {
    resource: &'static str,
    predicates: Vec<Predicate>,
    eager: Vec<(&'static str, Relation)>,
    ordering: Vec<OrderKey>,
}

impl Query {
    /// The unfiltered query root for a resource.
    pub fn new(resource: &'static str) -> Self {
        Self {
            resource,
            predicates: Vec::new(),
            eager: Vec::new(),
            ordering: Vec::new(),
        }
    }

    pub fn resource(&self) -> &'static str {
        self.resource
    }

    /// ANDs a predicate onto the query.
    pub fn narrow(mut self, pred: Predicate) -> Self {
        self.predicates.push(pred);
        self
    }

    /// Marks a relation for eager loading; `run` embeds the related records
    /// under `field` in each result row.
    pub fn preload(mut self, field: &'static str, relation: Relation) -> Self {
        self.eager.push((field, relation));
        self
    }

    /// Replaces the ordering.
    pub fn order_by(mut self, keys: Vec<OrderKey>) -> Self {
        self.ordering = keys;
        self
    }

    pub fn ordering(&self) -> &[OrderKey] {
        &self.ordering
    }

    pub fn preloaded_fields(&self) -> Vec<&'static str> {
        self.eager.iter().map(|(f, _)| *f).collect()
    }

    /// Executes the query: filters conjunctively, embeds eager relations,
    /// then sorts.
    pub fn run(&self, tables: &Tables) -> Result<Vec<Record>> {
        let mut rows: Vec<Record> = table(tables, self.resource)?
            .iter()
            .filter(|(_, row)| self.predicates.iter().all(|p| p(row, tables)))
            .map(|(_, row)| row.clone())
            .collect();

        for row in &mut rows {
            for (field, relation) in &self.eager {
                let related = relation.resolve(row, tables)?;
                let embedded = if relation.is_many() {
                    Value::Array(related.into_iter().map(Value::Object).collect())
                } else {
                    related
                        .into_iter()
                        .next()
                        .map(Value::Object)
                        .unwrap_or(Value::Null)
                };
                row.insert(field.to_string(), embedded);
            }
        }

        if !self.ordering.is_empty() {
            let keys = self.ordering.clone();
            rows.sort_by(|a, b| {
                for key in &keys {
                    let av = a.get(&key.field).unwrap_or(&Value::Null);
                    let bv = b.get(&key.field).unwrap_or(&Value::Null);
                    let ord = cmp_values(av, bv);
                    let ord = match key.direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    };
                    if ord != CmpOrdering::Equal {
                        return ord;
                    }
                }
                CmpOrdering::Equal
            });
        }

        Ok(rows)
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("resource", &self.resource)
            .field("predicates", &self.predicates.len())
            .field("eager", &self.preloaded_fields())
            .field("ordering", &self.ordering)
            .finish()
    }
}

/// Total order over JSON values for sorting: null sorts last, then booleans,
/// numbers, strings; everything else compares equal.
fn cmp_values(a: &Value, b: &Value) -> CmpOrdering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Bool(_) => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
            Value::Null => 4,
            _ => 3,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let xf = x.as_f64().unwrap_or(f64::NAN);
            let yf = y.as_f64().unwrap_or(f64::NAN);
            xf.partial_cmp(&yf).unwrap_or(CmpOrdering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Case-insensitive substring match on a string field.
pub fn icontains(field: &'static str, value: &str) -> Predicate {
    let needle = value.to_lowercase();
    Arc::new(move |record, _| {
        record
            .get(field)
            .and_then(Value::as_str)
            .map(|s| s.to_lowercase().contains(&needle))
            .unwrap_or(false)
    })
}

/// Exact match on a field. Numeric fields match when the raw value parses to
/// the same number; everything else matches on the string form.
pub fn exact(field: &'static str, value: &str) -> Predicate {
    let raw = value.to_string();
    Arc::new(move |record, _| match record.get(field) {
        Some(Value::String(s)) => s == &raw,
        Some(Value::Number(n)) => raw.parse::<f64>().ok() == n.as_f64(),
        Some(Value::Bool(b)) => raw.parse::<bool>().ok() == Some(*b),
        _ => false,
    })
}

/// Case-insensitive substring match on a field of any related record.
pub fn related_icontains(relation: Relation, field: &'static str, value: &str) -> Predicate {
    let needle = value.to_lowercase();
    Arc::new(move |record, tables| {
        relation
            .resolve(record, tables)
            .map(|related| {
                related.iter().any(|row| {
                    row.get(field)
                        .and_then(Value::as_str)
                        .map(|s| s.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false)
    })
}

/// True when no row of `through` links this record (via `local_fk`) to the
/// given value of `linked_fk`. This is the negative-existence predicate used
/// by replace-root availability filters.
pub fn unlinked(
    through: &'static str,
    local_fk: &'static str,
    linked_fk: &'static str,
    value: &str,
) -> Predicate {
    let linked: Value = value
        .parse::<u64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(value.to_string()));
    Arc::new(move |record, tables| {
        let id = record.get("id").cloned().unwrap_or(Value::Null);
        match table(tables, through) {
            Ok(t) => !t.iter().any(|(_, row)| {
                row.get(local_fk) == Some(&id) && row.get(linked_fk) == Some(&linked)
            }),
            Err(_) => false,
        }
    })
}
