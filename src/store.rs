//! In-memory record store.
//!
//! The persistence engine is a collaborator the projection/filter core only
//! calls into; this store keeps every resource as a table of JSON records
//! behind a single `RwLock`. Writes that must be all-or-nothing go through
//! [`Datastore::transaction`], which stages a copy of the tables and commits
//! by swap only on success.

use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::error::{Error, Result};

/// A persisted record: a JSON object keyed by field name.
pub type Record = serde_json::Map<String, Value>;

/// All tables, keyed by resource name.
pub type Tables = IndexMap<&'static str, Table>;

/// One resource's rows, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Table {
    rows: IndexMap<u64, Record>,
    next_id: u64,
}

impl Table {
    /// Inserts a record, assigning and returning its id. The `id` field of
    /// the stored record is overwritten with the assigned value.
    pub fn insert(&mut self, mut record: Record) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        record.insert("id".to_string(), Value::from(id));
        self.rows.insert(id, record);
        id
    }

    /// Returns the record with the given id, if present.
    pub fn get(&self, id: u64) -> Option<&Record> {
        self.rows.get(&id)
    }

    /// Replaces the fields of an existing record with those of `patch`,
    /// keeping fields the patch does not mention. Returns `false` if the id
    /// is unknown.
    pub fn update(&mut self, id: u64, patch: Record) -> bool {
        match self.rows.get_mut(&id) {
            Some(existing) => {
                for (k, v) in patch {
                    if k != "id" {
                        existing.insert(k, v);
                    }
                }
                true
            }
            None => false,
        }
    }

    /// Deletes the record with the given id. Returns `false` if absent.
    pub fn delete(&mut self, id: u64) -> bool {
        self.rows.shift_remove(&id).is_some()
    }

    /// Deletes every record matching `pred`, returning how many were removed.
    pub fn delete_where(&mut self, pred: impl Fn(&Record) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|_, r| !pred(r));
        before - self.rows.len()
    }

    /// Iterates rows in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&u64, &Record)> {
        self.rows.iter()
    }

    /// Number of rows in the table.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Thread-safe store of all resource tables.
///
/// Tables for every registered resource are created up front so lookups by
/// resource name never fail at request time.
pub struct Datastore {
    inner: RwLock<Tables>,
}

impl Datastore {
    /// Creates a store with one empty table per resource name.
    pub fn new(resources: &[&'static str]) -> Self {
        let mut tables = Tables::new();
        for name in resources {
            tables.insert(name, Table::default());
        }
        Self {
            inner: RwLock::new(tables),
        }
    }

    /// Acquires a read view of all tables.
    pub async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.inner.read().await
    }

    /// Runs `f` against a staged copy of the tables and commits the copy only
    /// if `f` returns `Ok`. An error leaves the prior committed state intact;
    /// partial application is never observable.
    pub async fn transaction<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let mut guard = self.inner.write().await;
        let mut staged = guard.clone();
        let out = f(&mut staged)?;
        *guard = staged;
        Ok(out)
    }

    /// Inserts a single record, returning its assigned id.
    pub async fn insert(&self, resource: &'static str, record: Record) -> Result<u64> {
        self.transaction(|tables| {
            let table = tables
                .get_mut(resource)
                .ok_or_else(|| Error::Internal(format!("unknown table: {resource}")))?;
            Ok(table.insert(record))
        })
        .await
    }
}

/// Looks up a table by name, mapping absence to an internal error.
pub fn table<'a>(tables: &'a Tables, resource: &str) -> Result<&'a Table> {
    tables
        .get(resource)
        .ok_or_else(|| Error::Internal(format!("unknown table: {resource}")))
}

/// Mutable table lookup for use inside transactions.
pub fn table_mut<'a>(tables: &'a mut Tables, resource: &str) -> Result<&'a mut Table> {
    tables
        .get_mut(resource)
        .ok_or_else(|| Error::Internal(format!("unknown table: {resource}")))
}
