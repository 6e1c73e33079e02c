use crate::{
    AppState,
    activity::client_ip,
    api::models::{
        pagination::PaginatedResponse,
        users::{CurrentUser, ListUsersQuery, Role, UserCreate, UserCreatedResponse, UserResponse, UserUpdate},
    },
    auth::{
        password,
        permissions::{RequiresPermission, ensure, operation, resource},
    },
    db::{
        errors::DbError,
        handlers::{Repository, Users, users::UserFilter},
        models::{
            activity::ActivityLogCreateDBRequest,
            users::{UserCreateDBRequest, UserUpdateDBRequest},
        },
    },
    errors::{Error, Result},
    types::{Operation, Resource, UserId, UserIdOrCurrent},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};

fn user_not_found(id: UserId) -> Error {
    Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    summary = "List users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Paginated list of users", body = PaginatedResponse<UserResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
    _: RequiresPermission<resource::Users, operation::ReadAll>,
) -> Result<Json<PaginatedResponse<UserResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = UserFilter::new(skip, limit).including_inactive(query.include_inactive.unwrap_or(false));
    if let Some(role) = query.role {
        filter = filter.with_role(role);
    }
    if let Some(search) = query.search.filter(|s| !s.trim().is_empty()) {
        filter = filter.with_search(search);
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);
    let users = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        users.into_iter().map(UserResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    summary = "Create user",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created; a generated password is returned once", body = UserCreatedResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Username or email already taken"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    current_user: RequiresPermission<resource::Users, operation::CreateAll>,
    Json(create): Json<UserCreate>,
) -> Result<(StatusCode, Json<UserCreatedResponse>)> {
    if create.username.trim().is_empty() || create.full_name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Username and full name are required".to_string(),
        });
    }

    let (plain_password, generated_password) = match create.password {
        Some(given) => {
            password::validate_length(&given, &state.config.auth.native.password)?;
            (given, None)
        }
        None => {
            let generated = password::generate_password();
            (generated.clone(), Some(generated))
        }
    };
    let password_hash = password::hash_blocking(plain_password).await?;

    let request = UserCreateDBRequest {
        username: create.username.trim().to_string(),
        email: create.email,
        full_name: create.full_name.trim().to_string(),
        phone: create.phone,
        role: create.role,
        payment_frequency: create.payment_frequency,
        auth_source: "native".to_string(),
        password_hash: Some(password_hash),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn).create(&request).await?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("create")
                .entity_type("user")
                .entity_id(user.id)
                .entity_name(user.full_name.clone())
                .details(serde_json::json!({ "role": user.role }))
                .maybe_ip_address(client_ip(&headers))
                .build(),
        )
        .await;

    Ok((
        StatusCode::CREATED,
        Json(UserCreatedResponse {
            user: UserResponse::from(user),
            generated_password,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tag = "users",
    summary = "Get user",
    params(("user_id" = String, Path, description = "User ID (UUID) or 'current'")),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserIdOrCurrent>,
    current_user: CurrentUser,
) -> Result<Json<UserResponse>> {
    let target_id = user_id.resolve(current_user.id);
    if target_id != current_user.id {
        ensure(&current_user, Resource::Users, Operation::ReadAll)?;
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn).get_by_id(target_id).await?.ok_or_else(|| user_not_found(target_id))?;

    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    patch,
    path = "/users/{user_id}",
    tag = "users",
    summary = "Update user",
    request_body = UserUpdate,
    params(("user_id" = uuid::Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Forbidden or the last active admin"),
        (status = 404, description = "User not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    headers: HeaderMap,
    current_user: RequiresPermission<resource::Users, operation::UpdateAll>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UserResponse>> {
    if user_id == current_user.id && update.is_active == Some(false) {
        return Err(Error::BadRequest {
            message: "You cannot deactivate your own account".to_string(),
        });
    }

    let password_hash = match update.password {
        Some(new_password) => {
            password::validate_length(&new_password, &state.config.auth.native.password)?;
            Some(password::hash_blocking(new_password).await?)
        }
        None => None,
    };

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut tx);
    let existing = repo.get_by_id(user_id).await?.ok_or_else(|| user_not_found(user_id))?;

    let loses_admin = existing.role == Role::Admin
        && existing.is_active
        && (update.role.is_some_and(|r| r != Role::Admin) || update.is_active == Some(false));
    if loses_admin && repo.count_active_with_role(Role::Admin).await? <= 1 {
        return Err(Error::Database(DbError::ProtectedEntity {
            operation: Operation::UpdateAll,
            reason: "it is the last active admin".to_string(),
            entity_type: "user".to_string(),
            entity_id: Some(user_id.to_string()),
        }));
    }

    let request = UserUpdateDBRequest {
        full_name: update.full_name,
        email: update.email,
        phone: update.phone,
        role: update.role,
        payment_frequency: update.payment_frequency,
        is_active: update.is_active,
        password_hash,
    };
    let user = repo.update(user_id, &request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("update")
                .entity_type("user")
                .entity_id(user.id)
                .entity_name(user.full_name.clone())
                .maybe_ip_address(client_ip(&headers))
                .build(),
        )
        .await;

    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    delete,
    path = "/users/{user_id}",
    tag = "users",
    summary = "Deactivate user",
    params(("user_id" = uuid::Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deactivated"),
        (status = 400, description = "Cannot deactivate yourself"),
        (status = 404, description = "User not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    headers: HeaderMap,
    current_user: RequiresPermission<resource::Users, operation::DeleteAll>,
) -> Result<StatusCode> {
    if user_id == current_user.id {
        return Err(Error::BadRequest {
            message: "You cannot deactivate your own account".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !Users::new(&mut conn).delete(user_id).await? {
        return Err(user_not_found(user_id));
    }

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("deactivate")
                .entity_type("user")
                .entity_id(user_id)
                .maybe_ip_address(client_ip(&headers))
                .build(),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
