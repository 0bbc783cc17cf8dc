//! Spreadsheet ingestion: parse an uploaded CSV into a normalized row set,
//! then reconcile it against the persisted items for the same sector scope.
//!
//! The reconciliation is a set diff keyed on the items' domain fields (ids
//! and upload links excluded): items present in the database but not in the
//! file are deleted, items present in the file but not the database are
//! bulk-inserted and linked to the new upload record. The whole pipeline —
//! upload record included — runs inside one store transaction, so a failure
//! anywhere leaves the previously committed item set intact and a corrected
//! re-run converges to the same final state.

use serde_json::Value;
use std::collections::BTreeSet;
use tracing::info;

use crate::error::{Error, Result};
use crate::store::{table, table_mut, Record, Tables};

/// The ingestion pipelines served by the upload endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    AltSub,
    MaterialMaster,
    Inventory,
}

impl UploadKind {
    /// The resource holding upload records for this kind.
    pub fn upload_resource(&self) -> &'static str {
        match self {
            UploadKind::AltSub => "alt_sub_uploads",
            UploadKind::MaterialMaster => "material_master_uploads",
            UploadKind::Inventory => "inventory_uploads",
        }
    }

    /// The resource holding the ingested items.
    pub fn item_resource(&self) -> &'static str {
        match self {
            UploadKind::AltSub => "alt_subs",
            UploadKind::MaterialMaster => "material_masters",
            UploadKind::Inventory => "inventory_items",
        }
    }

    /// The fields that identify an item for the diff. `id` and `upload_id`
    /// never participate.
    fn key_fields(&self) -> &'static [&'static str] {
        match self {
            UploadKind::AltSub => &[
                "plant",
                "model_id",
                "type_code",
                "primary_material",
                "replacement_part",
                "next_higher_assembly",
                "alternate_or_substitute_code",
                "sub_code",
                "wbs_element",
                "revision_level",
                "reason_for_change",
                "item_text_line",
                "created_by",
                "created_date",
            ],
            UploadKind::MaterialMaster => &[
                "name",
                "nomenclature",
                "plant",
                "material_type",
                "base_unit_of_measure",
                "procurement_type",
                "goods_receipt_time",
                "planned_delivery_time",
                "storage_condition",
                "base_drawing",
                "electrical_flag",
            ],
            UploadKind::Inventory => &[
                "material_master",
                "plant",
                "storage_location",
                "material_type",
                "wbs",
                "batch",
                "lot_date_code",
                "base_unit_of_measure",
                "unrestricted_inventory",
                "qm_lot_inventory",
                "restricted_inventory",
                "blocked_inventory",
                "shelf_life_expiration_date",
                "discard_date",
                "on_hand_inventory",
            ],
        }
    }

    /// Maps one CSV row to an item record, resolving references against the
    /// store. Unknown references abort the enclosing transaction.
    fn normalize(&self, sheet: &Sheet, row: &csv::StringRecord, tables: &Tables) -> Result<Record> {
        match self {
            UploadKind::AltSub => {
                let model_code = sheet.required(row, "Model")?;
                let model_id = resolve_program(tables, model_code)?;
                let primary = sheet.required(row, "Primary Material")?;
                let replacement = sheet.required(row, "Replacement Part")?;
                require_material(tables, primary)?;
                require_material(tables, replacement)?;

                let mut rec = Record::new();
                rec.insert("plant".into(), sheet.string(row, "Plnt"));
                rec.insert("model_id".into(), Value::from(model_id));
                rec.insert("type_code".into(), sheet.string(row, "Type Code"));
                rec.insert("primary_material".into(), Value::String(primary.to_string()));
                rec.insert(
                    "replacement_part".into(),
                    Value::String(replacement.to_string()),
                );
                rec.insert(
                    "next_higher_assembly".into(),
                    sheet.string(row, "Next Higher Assembly"),
                );
                rec.insert(
                    "alternate_or_substitute_code".into(),
                    sheet.string(row, "Alternate or Substitute Code"),
                );
                rec.insert("sub_code".into(), sheet.string(row, "Sub Code"));
                rec.insert("wbs_element".into(), sheet.string(row, "WBS Element"));
                rec.insert("revision_level".into(), sheet.string(row, "RevLev"));
                rec.insert(
                    "reason_for_change".into(),
                    sheet.string(row, "Reason For Change"),
                );
                rec.insert(
                    "item_text_line".into(),
                    sheet.string(row, "Item Text Line 1"),
                );
                rec.insert("created_by".into(), sheet.string(row, "Created by"));
                rec.insert("created_date".into(), sheet.date(row, "Created"));
                Ok(rec)
            }
            UploadKind::MaterialMaster => {
                let name = sheet.required(row, "Material")?;
                let mut rec = Record::new();
                rec.insert("name".into(), Value::String(name.to_string()));
                rec.insert(
                    "nomenclature".into(),
                    sheet.string(row, "Material Description"),
                );
                rec.insert("plant".into(), sheet.string(row, "Plnt"));
                rec.insert("material_type".into(), material_type(sheet.get(row, "Matl Type")));
                rec.insert(
                    "base_unit_of_measure".into(),
                    sheet.string(row, "Base Unit of Measure"),
                );
                rec.insert(
                    "procurement_type".into(),
                    sheet.string(row, "Procurement Type"),
                );
                rec.insert(
                    "goods_receipt_time".into(),
                    sheet.integer(row, "Goods Receipt Time")?,
                );
                rec.insert(
                    "planned_delivery_time".into(),
                    sheet.integer(row, "Planned Delivery Time")?,
                );
                rec.insert(
                    "storage_condition".into(),
                    sheet.string(row, "Storage Condition"),
                );
                rec.insert("base_drawing".into(), sheet.string(row, "Base Drawing"));
                rec.insert(
                    "electrical_flag".into(),
                    sheet.string(row, "Electrical Flag"),
                );
                Ok(rec)
            }
            UploadKind::Inventory => {
                let material = sheet.required(row, "Material")?;
                require_material(tables, material)?;

                let mut rec = Record::new();
                rec.insert(
                    "material_master".into(),
                    Value::String(material.to_string()),
                );
                rec.insert("plant".into(), sheet.string(row, "Plnt"));
                rec.insert(
                    "storage_location".into(),
                    sheet.string(row, "Storage Location"),
                );
                rec.insert("material_type".into(), material_type(sheet.get(row, "Matl Type")));
                rec.insert("wbs".into(), sheet.string(row, "WBS Element"));
                rec.insert("batch".into(), sheet.string(row, "Batch"));
                rec.insert("lot_date_code".into(), sheet.string(row, "Lot Date Code"));
                rec.insert(
                    "base_unit_of_measure".into(),
                    sheet.string(row, "Base Unit of Measure"),
                );
                rec.insert(
                    "unrestricted_inventory".into(),
                    sheet.number(row, "Unrestricted")?,
                );
                rec.insert("qm_lot_inventory".into(), sheet.number(row, "QM Lot")?);
                rec.insert("restricted_inventory".into(), sheet.number(row, "Restricted")?);
                rec.insert("blocked_inventory".into(), sheet.number(row, "Blocked")?);
                rec.insert(
                    "shelf_life_expiration_date".into(),
                    sheet.date(row, "SLED"),
                );
                rec.insert("discard_date".into(), sheet.date(row, "Discard Date"));
                rec.insert("on_hand_inventory".into(), sheet.number(row, "On Hand")?);
                Ok(rec)
            }
        }
    }
}

/// A parsed CSV file: headers plus data rows. Parsing is purely syntactic;
/// reference resolution happens later, inside the transaction.
#[derive(Debug)]
pub struct Sheet {
    headers: csv::StringRecord,
    rows: Vec<csv::StringRecord>,
}

impl Sheet {
    /// Parses CSV bytes. An empty or malformed file is an
    /// [`Error::IngestionInput`].
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(bytes);
        let headers = reader
            .headers()
            .map_err(|e| Error::IngestionInput(format!("unreadable header row: {e}")))?
            .clone();
        if headers.is_empty() {
            return Err(Error::IngestionInput("file has no header row".to_string()));
        }
        let rows = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::IngestionInput(format!("unreadable row: {e}")))?;
        Ok(Self { headers, rows })
    }

    pub fn rows(&self) -> &[csv::StringRecord] {
        &self.rows
    }

    fn index(&self, column: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| Error::IngestionInput(format!("missing column: \"{column}\"")))
    }

    fn get<'a>(&self, row: &'a csv::StringRecord, column: &str) -> Option<&'a str> {
        self.index(column)
            .ok()
            .and_then(|i| row.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn required<'a>(&self, row: &'a csv::StringRecord, column: &str) -> Result<&'a str> {
        self.index(column)?;
        self.get(row, column)
            .ok_or_else(|| Error::IngestionInput(format!("empty value in column: \"{column}\"")))
    }

    /// Trimmed string value; blank cells become null, as the original fills
    /// blanks before diffing.
    fn string(&self, row: &csv::StringRecord, column: &str) -> Value {
        self.get(row, column)
            .map(|s| Value::String(s.to_string()))
            .unwrap_or(Value::Null)
    }

    /// `m/d/Y` date as an ISO string; blank or unparseable dates coerce to
    /// null.
    fn date(&self, row: &csv::StringRecord, column: &str) -> Value {
        self.get(row, column)
            .and_then(|s| chrono::NaiveDate::parse_from_str(s, "%m/%d/%Y").ok())
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null)
    }

    fn number(&self, row: &csv::StringRecord, column: &str) -> Result<Value> {
        match self.get(row, column) {
            None => Ok(Value::Null),
            Some(raw) => raw
                .parse::<f64>()
                .map_err(|_| {
                    Error::IngestionInput(format!("bad number {raw:?} in column \"{column}\""))
                })
                .map(|n| serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)),
        }
    }

    fn integer(&self, row: &csv::StringRecord, column: &str) -> Result<Value> {
        match self.get(row, column) {
            None => Ok(Value::Null),
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| {
                    Error::IngestionInput(format!("bad integer {raw:?} in column \"{column}\""))
                })
                .map(Value::from),
        }
    }
}

/// Maps a material-type mnemonic to its stored code.
fn material_type(raw: Option<&str>) -> Value {
    match raw {
        Some("MAKE") => Value::from(3),
        Some("MSUB") => Value::from(4),
        Some("PRCH") => Value::from(5),
        _ => Value::Null,
    }
}

fn resolve_program(tables: &Tables, model_code: &str) -> Result<u64> {
    table(tables, "programs")?
        .iter()
        .find(|(_, row)| row.get("model_code").and_then(Value::as_str) == Some(model_code))
        .map(|(id, _)| *id)
        .ok_or_else(|| {
            Error::ReferentialIntegrity(format!("no program with model code {model_code:?}"))
        })
}

fn require_material(tables: &Tables, name: &str) -> Result<()> {
    let known = table(tables, "material_masters")?
        .iter()
        .any(|(_, row)| row.get("name").and_then(Value::as_str) == Some(name));
    if known {
        Ok(())
    } else {
        Err(Error::ReferentialIntegrity(format!(
            "no material master named {name:?}"
        )))
    }
}

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub deleted: usize,
    pub added: usize,
}

/// Reconciles the uploaded rows against the persisted items in the same
/// sector scope. Must run inside a store transaction; the caller has already
/// inserted the upload record with id `upload_id`.
pub fn diff_and_apply(
    kind: UploadKind,
    tables: &mut Tables,
    sector_id: u64,
    upload_id: u64,
    sheet: &Sheet,
) -> Result<IngestStats> {
    let key_fields = kind.key_fields();

    // Normalize every row up front; a bad row aborts before any mutation.
    let mut uploaded: Vec<(String, Record)> = Vec::new();
    let mut file_keys: BTreeSet<String> = BTreeSet::new();
    for row in sheet.rows() {
        let rec = kind.normalize(sheet, row, tables)?;
        let key = item_key(&rec, key_fields)?;
        // The file is a set; duplicate rows collapse.
        if file_keys.insert(key.clone()) {
            uploaded.push((key, rec));
        }
    }

    // Scope: items linked to an upload of this kind for the same sector.
    let scope_uploads: BTreeSet<u64> = table(tables, kind.upload_resource())?
        .iter()
        .filter(|(_, row)| {
            row.get("sector_id").and_then(Value::as_u64) == Some(sector_id)
        })
        .map(|(id, _)| *id)
        .collect();

    let mut existing_keys: BTreeSet<String> = BTreeSet::new();
    let mut to_delete: Vec<u64> = Vec::new();
    for (id, row) in table(tables, kind.item_resource())?.iter() {
        let in_scope = row
            .get("upload_id")
            .and_then(Value::as_u64)
            .map(|u| scope_uploads.contains(&u))
            .unwrap_or(false);
        if !in_scope {
            continue;
        }
        let key = item_key(row, key_fields)?;
        if !file_keys.contains(&key) {
            to_delete.push(*id);
        }
        existing_keys.insert(key);
    }

    let items = table_mut(tables, kind.item_resource())?;
    let deleted = to_delete.len();
    for id in to_delete {
        items.delete(id);
    }

    let mut added = 0;
    for (key, mut rec) in uploaded {
        if existing_keys.contains(&key) {
            continue;
        }
        rec.insert("upload_id".to_string(), Value::from(upload_id));
        items.insert(rec);
        added += 1;
    }

    info!(
        kind = ?kind,
        sector_id,
        upload_id,
        deleted,
        added,
        "ingestion reconciled"
    );
    Ok(IngestStats { deleted, added })
}

/// Canonical diff key: the key fields rendered as a JSON array.
fn item_key(record: &Record, fields: &[&str]) -> Result<String> {
    let values: Vec<&Value> = fields
        .iter()
        .map(|f| record.get(*f).unwrap_or(&Value::Null))
        .collect();
    serde_json::to_string(&values).map_err(|e| Error::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_garbage() {
        // A quoted field left open is a CSV-level error.
        let err = Sheet::parse(b"a,b\n\"unterminated").unwrap_err();
        assert!(matches!(err, Error::IngestionInput(_)));
    }

    #[test]
    fn test_blank_cells_become_null() {
        let sheet = Sheet::parse(b"Plnt,Type Code\n,X1\n").unwrap();
        let row = &sheet.rows()[0];
        assert_eq!(sheet.string(row, "Plnt"), Value::Null);
        assert_eq!(sheet.string(row, "Type Code"), Value::String("X1".into()));
    }

    #[test]
    fn test_dates_coerce_like_the_report_format() {
        let sheet = Sheet::parse(b"Created\n03/15/2024\n").unwrap();
        assert_eq!(
            sheet.date(&sheet.rows()[0], "Created"),
            Value::String("2024-03-15".into())
        );

        let sheet = Sheet::parse(b"Created\nnot-a-date\n").unwrap();
        assert_eq!(sheet.date(&sheet.rows()[0], "Created"), Value::Null);
    }

    #[test]
    fn test_missing_column_is_named() {
        let sheet = Sheet::parse(b"Plnt\nX\n").unwrap();
        let err = sheet.required(&sheet.rows()[0], "Model").unwrap_err();
        assert!(err.to_string().contains("\"Model\""));
    }
}
