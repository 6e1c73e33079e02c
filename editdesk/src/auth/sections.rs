//! Per-user UI sections and their visibility.
//!
//! Each role has a fixed catalog of sections. Every section is visible by default and stored
//! rows in `user_sections` only ever override that default.

use crate::api::models::users::Role;

/// `(key, label)` pairs shown to admins.
pub const ADMIN_SECTIONS: &[(&str, &str)] = &[
    ("dashboard", "Dashboard"),
    ("inbox", "Inbox"),
    ("projects", "Projects"),
    ("clients", "Clients"),
    ("editors", "Editors"),
    ("payments", "Payments"),
    ("reports", "Reports"),
    ("settings", "Settings"),
    ("shorts", "Shorts"),
];

/// `(key, label)` pairs shown to editors.
pub const EDITOR_SECTIONS: &[(&str, &str)] = &[
    ("dashboard", "Dashboard"),
    ("my_tasks", "My tasks"),
    ("my_projects", "My projects"),
    ("my_payments", "My payments"),
    ("my_shorts", "My shorts"),
];

pub fn catalog_for(role: Role) -> &'static [(&'static str, &'static str)] {
    match role {
        Role::Admin => ADMIN_SECTIONS,
        Role::Editor => EDITOR_SECTIONS,
    }
}

pub fn is_known_section(role: Role, key: &str) -> bool {
    catalog_for(role).iter().any(|(k, _)| *k == key)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveSection {
    pub key: &'static str,
    pub label: &'static str,
    pub can_view: bool,
}

/// The role's catalog with stored overrides applied. Overrides for keys outside the catalog
/// (e.g. left over from a role change) are ignored.
pub fn effective_sections(role: Role, overrides: &[(String, bool)]) -> Vec<EffectiveSection> {
    catalog_for(role)
        .iter()
        .map(|(key, label)| {
            let can_view = overrides
                .iter()
                .find(|(stored, _)| stored == key)
                .map(|(_, can_view)| *can_view)
                .unwrap_or(true);
            EffectiveSection { key, label, can_view }
        })
        .collect()
}
