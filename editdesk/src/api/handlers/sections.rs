use crate::{
    AppState,
    api::models::{
        sections::{SectionResponse, SectionUpdate},
        users::CurrentUser,
    },
    auth::{
        permissions::{RequiresPermission, ensure, operation, resource},
        sections::{effective_sections, is_known_section},
    },
    db::{
        handlers::{Repository, UserSections, Users},
        models::activity::ActivityLogCreateDBRequest,
    },
    errors::{Error, Result},
    types::{Operation, Resource, UserId, UserIdOrCurrent},
};
use axum::{
    Json,
    extract::{Path, State},
};
use sqlx::PgConnection;
use std::collections::BTreeMap;

async fn load_sections(conn: &mut PgConnection, user_id: UserId) -> Result<Vec<SectionResponse>> {
    let user = Users::new(&mut *conn).get_by_id(user_id).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
        id: user_id.to_string(),
    })?;
    let overrides = UserSections::new(&mut *conn).list_for_user(user_id).await?;

    Ok(effective_sections(user.role, &overrides).into_iter().map(SectionResponse::from).collect())
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/sections",
    tag = "sections",
    summary = "Effective UI sections for a user",
    params(("user_id" = String, Path, description = "User ID (UUID) or 'current'")),
    responses(
        (status = 200, description = "Sections with visibility", body = Vec<SectionResponse>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_user_sections(
    State(state): State<AppState>,
    Path(user_id): Path<UserIdOrCurrent>,
    current_user: CurrentUser,
) -> Result<Json<Vec<SectionResponse>>> {
    let target_id = user_id.resolve(current_user.id);
    if target_id != current_user.id {
        ensure(&current_user, Resource::Sections, Operation::ReadAll)?;
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Ok(Json(load_sections(&mut conn, target_id).await?))
}

#[utoipa::path(
    put,
    path = "/users/{user_id}/sections",
    tag = "sections",
    summary = "Override section visibility",
    request_body = Vec<SectionUpdate>,
    params(("user_id" = uuid::Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Updated sections", body = Vec<SectionResponse>),
        (status = 400, description = "Unknown section for the user's role"),
        (status = 404, description = "User not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_user_sections(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    current_user: RequiresPermission<resource::Sections, operation::UpdateAll>,
    Json(updates): Json<Vec<SectionUpdate>>,
) -> Result<Json<Vec<SectionResponse>>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let user = Users::new(&mut tx).get_by_id(user_id).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
        id: user_id.to_string(),
    })?;

    if let Some(unknown) = updates.iter().find(|u| !is_known_section(user.role, &u.section_key)) {
        return Err(Error::BadRequest {
            message: format!("Unknown section '{}' for this user's role", unknown.section_key),
        });
    }

    let entries: Vec<(String, bool)> = updates.into_iter().map(|u| (u.section_key, u.can_view)).collect();
    UserSections::new(&mut tx).upsert_many(user_id, &entries).await?;
    let sections = load_sections(&mut tx, user_id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("update_sections")
                .entity_type("user")
                .entity_id(user.id)
                .entity_name(user.full_name)
                .details(serde_json::json!({ "sections": entries.into_iter().collect::<BTreeMap<String, bool>>() }))
                .build(),
        )
        .await;

    Ok(Json(sections))
}
