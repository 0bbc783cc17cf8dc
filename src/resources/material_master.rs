//! Material masters: the sector-wide part catalog.

use crate::filter::FilterOutcome;
use crate::query::{exact, icontains, OrderKey};
use crate::resource::ResourceDefinition;
use crate::shape::ShapeContract;

pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new("material_masters")
        .shape("summary", ShapeContract::new(&["id", "name", "nomenclature"]))
        .shape(
            "detail",
            ShapeContract::new(&[
                "id",
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
                "upload_id",
            ]),
        )
        .default_shape("summary")
        .order_by(vec![OrderKey::asc("name")])
        .filter("name", |v, _| FilterOutcome::Narrow(icontains("name", v)))
        .filter("plant", |v, _| FilterOutcome::Narrow(icontains("plant", v)))
        .filter("material_type", |v, _| {
            FilterOutcome::Narrow(exact("material_type", v))
        })
}
