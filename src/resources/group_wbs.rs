//! Group WBS: one Y-group per program and program type.

use crate::query::{icontains, OrderKey, Relation};
use crate::filter::FilterOutcome;
use crate::resource::ResourceDefinition;
use crate::shape::{NestedShape, ShapeContract};

pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new("group_wbss")
        .shape("summary", ShapeContract::new(&["id", "name"]))
        .shape(
            "detail",
            ShapeContract::new(&["id", "name", "program", "program_type"])
                .nest(NestedShape::one("program", "programs", "summary"))
                .augment(|q, _| {
                    q.preload("program", Relation::belongs_to("programs", "program_id"))
                }),
        )
        .default_shape("summary")
        .relation("program", Relation::belongs_to("programs", "program_id"))
        .order_by(vec![OrderKey::asc("name")])
        .filter("name", |v, _| FilterOutcome::Narrow(icontains("name", v)))
}
