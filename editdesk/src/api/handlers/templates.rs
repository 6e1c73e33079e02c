use crate::{
    AppState,
    api::models::{
        pagination::PaginatedResponse,
        templates::{ListTemplatesQuery, TemplateCreate, TemplateResponse, TemplateUpdate},
    },
    auth::permissions::{RequiresPermission, operation, resource},
    db::{
        errors::DbError,
        handlers::{Repository, Templates, templates::TemplateFilter},
        models::{
            activity::ActivityLogCreateDBRequest,
            templates::{TemplateCreateDBRequest, TemplateUpdateDBRequest},
        },
    },
    errors::{Error, Result},
    types::TemplateId,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

fn template_not_found(id: TemplateId) -> Error {
    Error::NotFound {
        resource: "Template".to_string(),
        id: id.to_string(),
    }
}

/// Task titles are trimmed and blank entries dropped.
fn clean_tasks(tasks: Vec<String>) -> Vec<String> {
    tasks
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[utoipa::path(
    get,
    path = "/templates",
    tag = "templates",
    summary = "List project templates",
    params(ListTemplatesQuery),
    responses(
        (status = 200, description = "Paginated list of templates", body = PaginatedResponse<TemplateResponse>),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<ListTemplatesQuery>,
    _: RequiresPermission<resource::Templates, operation::ReadAll>,
) -> Result<Json<PaginatedResponse<TemplateResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = TemplateFilter::new(skip, limit).including_inactive(query.include_inactive.unwrap_or(false));

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Templates::new(&mut conn);
    let templates = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        templates.into_iter().map(TemplateResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    post,
    path = "/templates",
    tag = "templates",
    summary = "Create project template",
    request_body = TemplateCreate,
    responses(
        (status = 201, description = "Template created", body = TemplateResponse),
        (status = 400, description = "Invalid request"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_template(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Templates, operation::CreateAll>,
    Json(mut create): Json<TemplateCreate>,
) -> Result<(StatusCode, Json<TemplateResponse>)> {
    if create.name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Template name is required".to_string(),
        });
    }
    create.default_tasks = clean_tasks(create.default_tasks);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let template = Templates::new(&mut conn).create(&TemplateCreateDBRequest::from(create)).await?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("create")
                .entity_type("template")
                .entity_id(template.id)
                .entity_name(template.name.clone())
                .build(),
        )
        .await;

    Ok((StatusCode::CREATED, Json(TemplateResponse::from(template))))
}

#[utoipa::path(
    get,
    path = "/templates/{template_id}",
    tag = "templates",
    summary = "Get project template",
    params(("template_id" = uuid::Uuid, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template details", body = TemplateResponse),
        (status = 404, description = "Template not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_template(
    State(state): State<AppState>,
    Path(template_id): Path<TemplateId>,
    _: RequiresPermission<resource::Templates, operation::ReadAll>,
) -> Result<Json<TemplateResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let template = Templates::new(&mut conn)
        .get_by_id(template_id)
        .await?
        .ok_or_else(|| template_not_found(template_id))?;

    Ok(Json(TemplateResponse::from(template)))
}

#[utoipa::path(
    patch,
    path = "/templates/{template_id}",
    tag = "templates",
    summary = "Update project template",
    request_body = TemplateUpdate,
    params(("template_id" = uuid::Uuid, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template updated", body = TemplateResponse),
        (status = 404, description = "Template not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_template(
    State(state): State<AppState>,
    Path(template_id): Path<TemplateId>,
    current_user: RequiresPermission<resource::Templates, operation::UpdateAll>,
    Json(mut update): Json<TemplateUpdate>,
) -> Result<Json<TemplateResponse>> {
    update.default_tasks = update.default_tasks.map(clean_tasks);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let template = Templates::new(&mut conn)
        .update(template_id, &TemplateUpdateDBRequest::from(update))
        .await
        .map_err(|e| match e {
            DbError::NotFound => template_not_found(template_id),
            other => other.into(),
        })?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("update")
                .entity_type("template")
                .entity_id(template.id)
                .entity_name(template.name.clone())
                .build(),
        )
        .await;

    Ok(Json(TemplateResponse::from(template)))
}

#[utoipa::path(
    delete,
    path = "/templates/{template_id}",
    tag = "templates",
    summary = "Deactivate project template",
    params(("template_id" = uuid::Uuid, Path, description = "Template ID")),
    responses(
        (status = 204, description = "Template deactivated"),
        (status = 404, description = "Template not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_template(
    State(state): State<AppState>,
    Path(template_id): Path<TemplateId>,
    current_user: RequiresPermission<resource::Templates, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !Templates::new(&mut conn).delete(template_id).await? {
        return Err(template_not_found(template_id));
    }

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("deactivate")
                .entity_type("template")
                .entity_id(template_id)
                .build(),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{auth_header, create_test_admin, create_test_app};
    use serde_json::json;
    use sqlx::PgPool;

    #[test]
    fn test_clean_tasks() {
        let tasks = clean_tasks(vec![" Guion ".to_string(), "".to_string(), "  ".to_string(), "Edición".to_string()]);
        assert_eq!(tasks, vec!["Guion".to_string(), "Edición".to_string()]);
    }

    #[sqlx::test]
    async fn test_template_lifecycle(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&admin);

        let created: TemplateResponse = server
            .post("/admin/api/v1/templates")
            .add_header(name.clone(), value.clone())
            .json(&json!({
                "name": "Reel package",
                "default_tasks": ["Script", "Edit", " ", "Color"],
                "default_content_type": "reel",
                "default_content_quantity": 3
            }))
            .await
            .json();
        assert_eq!(created.default_tasks, vec!["Script", "Edit", "Color"]);

        let updated: TemplateResponse = server
            .patch(&format!("/admin/api/v1/templates/{}", created.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({"default_content_quantity": 5}))
            .await
            .json();
        assert_eq!(updated.default_content_quantity, Some(5));
        assert_eq!(updated.default_tasks.len(), 3);

        server
            .delete(&format!("/admin/api/v1/templates/{}", created.id))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let active: PaginatedResponse<TemplateResponse> =
            server.get("/admin/api/v1/templates").add_header(name.clone(), value.clone()).await.json();
        assert_eq!(active.total_count, 0);

        let all: PaginatedResponse<TemplateResponse> = server
            .get("/admin/api/v1/templates?include_inactive=true")
            .add_header(name, value)
            .await
            .json();
        assert_eq!(all.total_count, 1);
        assert!(!all.data[0].is_active);
    }
}
