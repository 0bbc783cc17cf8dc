//! Concrete resource definitions.
//!
//! One module per entity, each contributing a [`ResourceDefinition`] to the
//! process-wide registry: its shapes, filters, relations and default
//! ordering. These are configuration, not logic — the generic dispatch layer
//! does the work.

pub mod alt_sub;
pub mod configuration_item;
pub mod group_wbs;
pub mod inventory_item;
pub mod material_master;
pub mod program;
pub mod program_user;
pub mod sector;
pub mod uploads;
pub mod user;
pub mod wbs_element;

use crate::error::Result;
use crate::resource::Registry;

/// Builds and validates the full registry served by the API.
pub fn build_registry() -> Result<Registry> {
    Registry::build(vec![
        user::definition(),
        program::definition(),
        program_user::definition(),
        group_wbs::definition(),
        wbs_element::definition(),
        configuration_item::definition(),
        sector::definition(),
        material_master::definition(),
        inventory_item::definition(),
        alt_sub::definition(),
        uploads::alt_sub_uploads(),
        uploads::material_master_uploads(),
        uploads::inventory_uploads(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_registry_validates() {
        let registry = build_registry().expect("registry must validate at startup");
        for name in [
            "users",
            "programs",
            "program_users",
            "group_wbss",
            "wbs_elements",
            "configuration_items",
            "sectors",
            "material_masters",
            "inventory_items",
            "alt_subs",
            "alt_sub_uploads",
            "material_master_uploads",
            "inventory_uploads",
        ] {
            assert!(registry.get(name).is_some(), "missing resource {name}");
        }
    }

    #[test]
    fn test_program_edit_shape_embeds_assignment_details() {
        let registry = build_registry().unwrap();
        let def = registry.get("programs").unwrap();
        let nested = def
            .get_shape("edit")
            .unwrap()
            .nested_for("program_users")
            .unwrap();
        assert_eq!(nested.resource, "program_users");
        assert_eq!(nested.shape, "detail");
    }
}
