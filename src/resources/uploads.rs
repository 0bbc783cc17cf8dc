//! Upload records for the spreadsheet-ingestion endpoints.
//!
//! All three kinds share one template: a `summary`/`detail` pair for
//! browsing past uploads, and a `create` shape whose `uploaded_by` is
//! server-assigned from the authenticated principal and whose `created`
//! timestamp is server-assigned at request time. The create path itself is
//! the ingestion pipeline in `crate::ingest`.

use crate::dispatch::Method;
use crate::filter::FilterOutcome;
use crate::query::{exact, OrderKey, Relation};
use crate::resource::ResourceDefinition;
use crate::shape::{ServerAssigned, ShapeContract, WriteRules};

fn upload_definition(name: &'static str) -> ResourceDefinition {
    ResourceDefinition::new(name)
        .shape("summary", ShapeContract::new(&["id", "data_file"]))
        .shape(
            "detail",
            ShapeContract::new(&["id", "sector_id", "data_file", "created", "uploaded_by"]),
        )
        .shape(
            "create",
            ShapeContract::new(&["id", "sector_id", "data_file", "created", "uploaded_by"])
                .write(
                    WriteRules::required(&["sector_id", "data_file", "uploaded_by"])
                        .assigned(ServerAssigned::CurrentUser("uploaded_by"))
                        .assigned(ServerAssigned::Timestamp("created")),
                ),
        )
        .default_shape("detail")
        .method_shape(Method::Post, "create")
        .relation("sector", Relation::belongs_to("sectors", "sector_id"))
        .order_by(vec![OrderKey::desc("created")])
        .filter("sector", |v, _| FilterOutcome::Narrow(exact("sector_id", v)))
}

pub fn alt_sub_uploads() -> ResourceDefinition {
    upload_definition("alt_sub_uploads")
}

pub fn material_master_uploads() -> ResourceDefinition {
    upload_definition("material_master_uploads")
}

pub fn inventory_uploads() -> ResourceDefinition {
    upload_definition("inventory_uploads")
}
