//! Inventory items: on-hand stock per material, plant and batch.

use crate::filter::FilterOutcome;
use crate::query::{exact, icontains, OrderKey, Relation};
use crate::resource::ResourceDefinition;
use crate::shape::ShapeContract;

pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new("inventory_items")
        .shape(
            "summary",
            ShapeContract::new(&["id", "material_master", "plant", "on_hand_inventory"]),
        )
        .shape(
            "detail",
            ShapeContract::new(&[
                "id",
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
                "upload_id",
            ]),
        )
        .default_shape("summary")
        // Inventory links to material masters by natural key, not id.
        .relation(
            "material_master",
            Relation::belongs_to_by("material_masters", "material_master", "name"),
        )
        .order_by(vec![OrderKey::asc("material_master")])
        .filter("material_master", |v, _| {
            FilterOutcome::Narrow(icontains("material_master", v))
        })
        .filter("plant", |v, _| FilterOutcome::Narrow(icontains("plant", v)))
        .filter("batch", |v, _| FilterOutcome::Narrow(exact("batch", v)))
        .filter("wbs", |v, _| FilterOutcome::Narrow(icontains("wbs", v)))
}
