//! Configuration items: the parts making up a WBS element.

use crate::filter::FilterOutcome;
use crate::query::{exact, icontains, OrderKey, Relation};
use crate::resource::ResourceDefinition;
use crate::shape::ShapeContract;

pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new("configuration_items")
        .shape("summary", ShapeContract::new(&["id", "name", "nomenclature"]))
        .shape(
            "detail",
            ShapeContract::new(&[
                "id",
                "wbs_element_id",
                "name",
                "configuration_type",
                "nomenclature",
                "req_qty",
                "req_date",
                "net_order",
                "replenishment",
                "po_delivery",
            ]),
        )
        .default_shape("summary")
        .relation(
            "wbs_element",
            Relation::belongs_to("wbs_elements", "wbs_element_id"),
        )
        .order_by(vec![OrderKey::asc("name")])
        .filter("name", |v, _| FilterOutcome::Narrow(icontains("name", v)))
        .filter("replenishment", |v, _| {
            FilterOutcome::Narrow(exact("replenishment", v))
        })
        .filter("wbs_element", |v, _| {
            FilterOutcome::Narrow(exact("wbs_element_id", v))
        })
}
