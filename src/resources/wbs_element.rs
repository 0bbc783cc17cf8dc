//! WBS elements and their configuration items.

use crate::filter::FilterOutcome;
use crate::query::{exact, OrderKey, Relation};
use crate::resource::ResourceDefinition;
use crate::shape::{NestedShape, ShapeContract};

fn configuration_items() -> Relation {
    Relation::has_many("configuration_items", "wbs_element_id")
}

pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new("wbs_elements")
        .shape("summary", ShapeContract::new(&["id", "name"]))
        .shape(
            "detail",
            ShapeContract::new(&["id", "name", "configuration_items"])
                .nest(NestedShape::many(
                    "configuration_items",
                    "configuration_items",
                    "summary",
                ))
                .augment(|q, _| q.preload("configuration_items", configuration_items())),
        )
        .default_shape("detail")
        .relation("configuration_items", configuration_items())
        .order_by(vec![OrderKey::asc("name")])
        .filter("name", |v, _| FilterOutcome::Narrow(exact("name", v)))
}
