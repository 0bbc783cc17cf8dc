//! Sectors: the scope unit for company-data uploads.

use crate::filter::FilterOutcome;
use crate::query::{exact, OrderKey};
use crate::resource::ResourceDefinition;
use crate::shape::ShapeContract;

pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new("sectors")
        .shape("summary", ShapeContract::new(&["id", "name"]))
        .default_shape("summary")
        .order_by(vec![OrderKey::asc("name")])
        .filter("name", |v, _| FilterOutcome::Narrow(exact("name", v)))
}
