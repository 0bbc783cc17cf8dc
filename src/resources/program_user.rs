//! Program/user assignments (the join records themselves).

use crate::filter::FilterOutcome;
use crate::query::{exact, Relation};
use crate::resource::ResourceDefinition;
use crate::shape::{NestedShape, ShapeContract};

pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new("program_users")
        .shape("summary", ShapeContract::new(&["id", "user_id", "program_id"]))
        .shape(
            "detail",
            ShapeContract::new(&["id", "user", "program"])
                .nest(NestedShape::one("user", "users", "summary"))
                .nest(NestedShape::one("program", "programs", "summary")),
        )
        .default_shape("summary")
        .relation("user", Relation::belongs_to("users", "user_id"))
        .relation("program", Relation::belongs_to("programs", "program_id"))
        .filter("program", |v, _| {
            FilterOutcome::Narrow(exact("program_id", v))
        })
        .filter("user", |v, _| FilterOutcome::Narrow(exact("user_id", v)))
}
