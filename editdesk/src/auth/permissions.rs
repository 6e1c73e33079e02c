//! Role based access control.
//!
//! Handlers declare what they need in their signature:
//!
//! ```ignore
//! async fn list_closures(
//!     State(state): State<AppState>,
//!     current_user: RequiresPermission<resource::Closures, operation::ReadOwn>,
//! ) -> Result<Json<...>> {
//!     let only_own = !can_read_all_resources(&current_user, Resource::Closures);
//!     ...
//! }
//! ```
//!
//! A `*Own` requirement is satisfied by either the `Own` or the `All` grant; handlers then narrow
//! their queries with [`can_read_all_resources`].

use crate::{
    AppState,
    api::models::users::{CurrentUser, Role},
    errors::{Error, Result},
    types::{Operation, Permission, Resource},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use std::{marker::PhantomData, ops::Deref};

macro_rules! markers {
    ($module:ident, $trait_name:ident, $kind:ident, $const_name:ident, [$($name:ident),* $(,)?]) => {
        pub mod $module {
            use crate::types::$kind;

            pub trait $trait_name {
                const $const_name: $kind;
            }

            $(
                pub struct $name;

                impl $trait_name for $name {
                    const $const_name: $kind = $kind::$name;
                }
            )*
        }
    };
}

markers!(
    resource,
    ResourceMarker,
    Resource,
    RESOURCE,
    [
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
    ]
);

markers!(
    operation,
    OperationMarker,
    Operation,
    OPERATION,
    [CreateAll, ReadAll, ReadOwn, UpdateAll, UpdateOwn, DeleteAll]
);

const EDITOR_READ_OWN: &[Resource] = &[
    Resource::Projects,
    Resource::Tasks,
    Resource::Payments,
    Resource::ShortsPlans,
    Resource::ShortsTasks,
    Resource::Closures,
    Resource::Reports,
    Resource::Dashboard,
    Resource::Sections,
];

const EDITOR_UPDATE_OWN: &[Resource] = &[Resource::Tasks, Resource::ShortsTasks];

/// Whether `role` is granted exactly `operation` on `resource`.
pub fn role_has_permission(role: Role, resource: Resource, operation: Operation) -> bool {
    match role {
        Role::Admin => true,
        Role::Editor => match operation {
            Operation::ReadOwn => EDITOR_READ_OWN.contains(&resource),
            Operation::UpdateOwn => EDITOR_UPDATE_OWN.contains(&resource),
            _ => false,
        },
    }
}

/// Whether the user may perform `operation`; an `All` grant covers the matching `Own` operation.
pub fn has_permission(user: &CurrentUser, resource: Resource, operation: Operation) -> bool {
    let broader = match operation {
        Operation::ReadOwn => Some(Operation::ReadAll),
        Operation::UpdateOwn => Some(Operation::UpdateAll),
        _ => None,
    };

    role_has_permission(user.role, resource, operation) || broader.is_some_and(|op| role_has_permission(user.role, resource, op))
}

/// Whether list endpoints should return every row rather than the caller's own.
pub fn can_read_all_resources(user: &CurrentUser, resource: Resource) -> bool {
    role_has_permission(user.role, resource, Operation::ReadAll)
}

/// Fail with 403 unless the user holds the permission.
pub fn ensure(user: &CurrentUser, resource: Resource, operation: Operation) -> Result<()> {
    if has_permission(user, resource, operation) {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions {
            required: Permission::Allow(resource, operation),
            action: operation,
            resource: resource.to_string(),
        })
    }
}

/// Fail with 403 unless the user may act on every row, or owns this one.
pub fn ensure_owner_or(user: &CurrentUser, resource: Resource, operation: Operation, owner: Option<crate::types::UserId>) -> Result<()> {
    let all = match operation {
        Operation::ReadOwn => Operation::ReadAll,
        Operation::UpdateOwn => Operation::UpdateAll,
        other => other,
    };
    if role_has_permission(user.role, resource, all) || (owner == Some(user.id) && has_permission(user, resource, operation)) {
        return Ok(());
    }
    Err(Error::InsufficientPermissions {
        required: Permission::Any(vec![Permission::Allow(resource, all), Permission::Allow(resource, operation)]),
        action: operation,
        resource: resource.to_string(),
    })
}

/// Extractor that authenticates the caller and checks a static permission.
pub struct RequiresPermission<R, O> {
    user: CurrentUser,
    _marker: PhantomData<fn() -> (R, O)>,
}

impl<R, O> RequiresPermission<R, O> {
    pub fn into_inner(self) -> CurrentUser {
        self.user
    }
}

impl<R, O> Deref for RequiresPermission<R, O> {
    type Target = CurrentUser;

    fn deref(&self) -> &CurrentUser {
        &self.user
    }
}

impl<R, O> FromRequestParts<AppState> for RequiresPermission<R, O>
where
    R: resource::ResourceMarker,
    O: operation::OperationMarker,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        ensure(&user, R::RESOURCE, O::OPERATION)?;
        Ok(Self {
            user,
            _marker: PhantomData,
        })
    }
}
