//! Alternate/substitute parts.

use crate::filter::FilterOutcome;
use crate::query::{icontains, related_icontains, OrderKey, Relation};
use crate::resource::ResourceDefinition;
use crate::shape::{NestedShape, ShapeContract};

fn model() -> Relation {
    Relation::belongs_to("programs", "model_id")
}

pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new("alt_subs")
        .shape(
            "summary",
            ShapeContract::new(&["id", "primary_material", "replacement_part"]),
        )
        .shape(
            "detail",
            ShapeContract::new(&[
                "id",
                "plant",
                "model",
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
            ])
            .nest(NestedShape::one("model", "programs", "summary"))
            .augment(|q, _| q.preload("model", model())),
        )
        .default_shape("detail")
        .relation("model", model())
        .relation(
            "primary_material",
            Relation::belongs_to_by("material_masters", "primary_material", "name"),
        )
        .relation(
            "replacement_part",
            Relation::belongs_to_by("material_masters", "replacement_part", "name"),
        )
        .order_by(vec![OrderKey::asc("primary_material")])
        .filter("plant", |v, _| FilterOutcome::Narrow(icontains("plant", v)))
        .filter("model", |v, _| {
            FilterOutcome::Narrow(related_icontains(model(), "model_code", v))
        })
        .filter("type_code", |v, _| {
            FilterOutcome::Narrow(icontains("type_code", v))
        })
        .filter("primary_material", |v, _| {
            FilterOutcome::Narrow(icontains("primary_material", v))
        })
        .filter("replacement_part", |v, _| {
            FilterOutcome::Narrow(icontains("replacement_part", v))
        })
}
