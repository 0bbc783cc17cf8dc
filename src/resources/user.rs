//! Users, including the availability filter used by the program-assignment
//! form: users *not* yet linked to a given program.

use crate::filter::FilterOutcome;
use crate::query::{icontains, unlinked, Query};
use crate::resource::ResourceDefinition;
use crate::shape::ShapeContract;

pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new("users")
        .shape("summary", ShapeContract::new(&["id", "username"]))
        .shape(
            "detail",
            ShapeContract::new(&["id", "username", "first_name", "last_name", "position"]),
        )
        .default_shape("summary")
        .filter("firstName", |v, _| {
            FilterOutcome::Narrow(icontains("first_name", v))
        })
        .filter("lastName", |v, _| {
            FilterOutcome::Narrow(icontains("last_name", v))
        })
        .filter("username", |v, _| {
            FilterOutcome::Narrow(icontains("username", v))
        })
        // Reissues the query from a fresh root rather than narrowing: the
        // result is the set of users with no program_users row for the given
        // program, regardless of any predicate applied so far.
        .filter("available_for_programs", |v, _| {
            FilterOutcome::Replace(Query::new("users").narrow(unlinked(
                "program_users",
                "user_id",
                "program_id",
                v,
            )))
        })
}
