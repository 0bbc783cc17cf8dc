//! Programs: the top of the work-breakdown hierarchy.

use crate::dispatch::Method;
use crate::filter::FilterOutcome;
use crate::query::{icontains, related_icontains, OrderKey, Relation};
use crate::resource::ResourceDefinition;
use crate::shape::{NestedShape, ShapeContract, WriteRules};

fn group_wbs_set() -> Relation {
    Relation::has_many("group_wbss", "program_id")
}

fn users() -> Relation {
    Relation::many_to_many("users", "program_users", "program_id", "user_id")
}

fn program_users() -> Relation {
    Relation::has_many("program_users", "program_id")
}

pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new("programs")
        .shape("summary", ShapeContract::new(&["id", "name", "model_code"]))
        .shape(
            "detail",
            ShapeContract::new(&["id", "name", "group_wbs_set", "users", "model_code"])
                .nest(NestedShape::many("group_wbs_set", "group_wbss", "detail"))
                .nest(NestedShape::many("users", "users", "detail"))
                .augment(|q, _| {
                    q.preload("group_wbs_set", group_wbs_set())
                        .preload("users", users())
                }),
        )
        .shape(
            "edit",
            ShapeContract::new(&["id", "name", "group_wbs_set", "program_users", "model_code"])
                .nest(NestedShape::many("group_wbs_set", "group_wbss", "summary"))
                .nest(NestedShape::many("program_users", "program_users", "detail"))
                .augment(|q, _| {
                    q.preload("group_wbs_set", group_wbs_set())
                        .preload("program_users", program_users())
                })
                .write(WriteRules::required(&["name"])),
        )
        .shape(
            "create",
            ShapeContract::new(&["id", "name", "model_code"])
                .write(WriteRules::required(&["name"])),
        )
        .default_shape("summary")
        .method_shape(Method::Post, "create")
        .method_shape(Method::Put, "edit")
        .method_shape(Method::Patch, "edit")
        .relation("group_wbs_set", group_wbs_set())
        .relation("users", users())
        .relation("program_users", program_users())
        .order_by(vec![OrderKey::asc("name")])
        .filter("name", |v, _| FilterOutcome::Narrow(icontains("name", v)))
        .filter("model_code", |v, _| {
            FilterOutcome::Narrow(icontains("model_code", v))
        })
        .filter("group_wbs", |v, _| {
            FilterOutcome::Narrow(related_icontains(group_wbs_set(), "name", v))
        })
}
