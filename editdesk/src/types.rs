//! Common type definitions and permission system types.
//!
//! This module defines:
//! - Type aliases for entity IDs (UserId, ProjectId, PlanId, etc.)
//! - Resource and operation enums for access control
//!
//! # Permission System
//!
//! - [`Resource`]: What entity type is being accessed (Projects, Tasks, Closures, etc.)
//! - [`Operation`]: What action is being performed (Read, Create, Update, Delete)
//! - [`Permission`]: Authorization requirement combining resource and operation
//!
//! Operations come in two flavors:
//! - **All**: Unrestricted access to all entities (e.g., `ReadAll`, `DeleteAll`)
//! - **Own**: Restricted to the caller's own entities (e.g., `ReadOwn`, `UpdateOwn`)
//!
//! Editors only ever hold `*Own` operations, see [`crate::auth::permissions`].

use serde::Deserialize;
use std::fmt;
use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type ClientId = Uuid;
pub type TemplateId = Uuid;
pub type ProjectId = Uuid;
pub type TaskId = Uuid;
pub type CommentId = Uuid;
pub type PaymentId = Uuid;
pub type ActivityLogId = Uuid;
pub type PlanId = Uuid;
pub type ShortsTaskId = Uuid;
pub type ClosureId = Uuid;
pub type ReportId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

// Common types for path parameters
#[derive(Debug, Clone, Deserialize)]
pub enum CurrentKeyword {
    #[serde(rename = "current")]
    Current,
}

/// Allows routes like /users/current and /users/{user_id} to hit the same handler.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UserIdOrCurrent {
    Current(CurrentKeyword),
    Id(UserId),
}

impl UserIdOrCurrent {
    /// Resolve to a concrete user id, substituting the caller for `current`.
    pub fn resolve(&self, current_user_id: UserId) -> UserId {
        match self {
            UserIdOrCurrent::Current(_) => current_user_id,
            UserIdOrCurrent::Id(id) => *id,
        }
    }
}

// *-All means unrestricted access, *-Own means restricted to own resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAll,
    ReadAll,
    ReadOwn,
    UpdateAll,
    UpdateOwn,
    DeleteAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Clients,
    Projects,
    Tasks,
    Payments,
    Templates,
    Activity,
    Sections,
    ShortsPlans,
    ShortsTasks,
    Closures,
    Reports,
    Dashboard,
    Inbox,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    /// Simple permission: (Resource, Operation)
    Allow(Resource, Operation),
    /// Logical combinator
    Any(Vec<Permission>),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateAll => write!(f, "Create"),
            Operation::ReadAll | Operation::ReadOwn => write!(f, "Read"),
            Operation::UpdateAll | Operation::UpdateOwn => write!(f, "Update"),
            Operation::DeleteAll => write!(f, "Delete"),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Users => "users",
            Resource::Clients => "clients",
            Resource::Projects => "projects",
            Resource::Tasks => "tasks",
            Resource::Payments => "payments",
            Resource::Templates => "templates",
            Resource::Activity => "activity",
            Resource::Sections => "sections",
            Resource::ShortsPlans => "shorts plans",
            Resource::ShortsTasks => "shorts tasks",
            Resource::Closures => "weekly closures",
            Resource::Reports => "reports",
            Resource::Dashboard => "dashboard",
            Resource::Inbox => "inbox",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbrev_uuid() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(abbrev_uuid(&id), "550e8400");
    }

    #[test]
    fn test_user_id_or_current_deserializes_both_forms() {
        let current: UserIdOrCurrent = serde_json::from_str("\"current\"").unwrap();
        let me = Uuid::new_v4();
        assert_eq!(current.resolve(me), me);

        let other = Uuid::new_v4();
        let explicit: UserIdOrCurrent = serde_json::from_str(&format!("\"{other}\"")).unwrap();
        assert_eq!(explicit.resolve(me), other);
    }
}
