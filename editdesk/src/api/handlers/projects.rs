use crate::{
    AppState,
    activity::client_ip,
    api::models::{
        pagination::PaginatedResponse,
        projects::{
            CommentCreate, CommentResponse, ListProjectsQuery, ProjectCreate, ProjectDetailResponse, ProjectResponse, ProjectStatus,
            ProjectUpdate,
        },
        tasks::TaskResponse,
        users::CurrentUser,
    },
    auth::permissions::{RequiresPermission, can_read_all_resources, ensure_owner_or, operation, resource},
    db::{
        handlers::{Comments, Projects, Repository, Tasks, Templates, projects::ProjectFilter},
        models::{
            activity::ActivityLogCreateDBRequest,
            projects::{CommentCreateDBRequest, ProjectCreateDBRequest, ProjectDBResponse, ProjectUpdateDBRequest},
        },
    },
    errors::{Error, Result},
    types::{Operation, ProjectId, Resource},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::debug;

fn project_not_found(id: ProjectId) -> Error {
    Error::NotFound {
        resource: "Project".to_string(),
        id: id.to_string(),
    }
}

/// Load a project the caller may read: admins read all, editors only their own.
async fn readable_project(conn: &mut PgConnection, id: ProjectId, user: &CurrentUser) -> Result<ProjectDBResponse> {
    let project = Projects::new(conn).get_by_id(id).await?.ok_or_else(|| project_not_found(id))?;
    ensure_owner_or(user, Resource::Projects, Operation::ReadOwn, project.editor_id)?;
    Ok(project)
}

fn validate_amounts(amounts: &[Option<Decimal>]) -> Result<()> {
    if amounts.iter().flatten().any(|a| a.is_sign_negative()) {
        return Err(Error::BadRequest {
            message: "Amounts cannot be negative".to_string(),
        });
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/projects",
    tag = "projects",
    summary = "List projects",
    params(ListProjectsQuery),
    responses(
        (status = 200, description = "Paginated list of projects", body = PaginatedResponse<ProjectResponse>),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ListProjectsQuery>,
    current_user: RequiresPermission<resource::Projects, operation::ReadOwn>,
) -> Result<Json<PaginatedResponse<ProjectResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = ProjectFilter::new(skip, limit);
    filter.status = query.status;
    filter.client_id = query.client_id;
    filter.search = query.search.filter(|s| !s.trim().is_empty());
    filter.editor_id = if can_read_all_resources(&current_user, Resource::Projects) {
        query.editor_id
    } else {
        Some(current_user.id)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Projects::new(&mut conn);
    let projects = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        projects.into_iter().map(ProjectResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    post,
    path = "/projects",
    tag = "projects",
    summary = "Create project",
    description = "When an active template is given, its default tasks are created with the project.",
    request_body = ProjectCreate,
    responses(
        (status = 201, description = "Project created", body = ProjectDetailResponse),
        (status = 400, description = "Invalid request"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    current_user: RequiresPermission<resource::Projects, operation::CreateAll>,
    Json(create): Json<ProjectCreate>,
) -> Result<(StatusCode, Json<ProjectDetailResponse>)> {
    if create.title.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Project title is required".to_string(),
        });
    }
    validate_amounts(&[create.billed_amount, create.editor_payment])?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let template = match create.template_id {
        Some(template_id) => Templates::new(&mut tx).get_by_id(template_id).await?.filter(|t| t.is_active),
        None => None,
    };

    let request = ProjectCreateDBRequest {
        title: create.title.trim().to_string(),
        description: create.description,
        client_id: create.client_id,
        editor_id: create.editor_id,
        template_id: template.as_ref().map(|t| t.id),
        status: create.status.unwrap_or(ProjectStatus::Pending),
        content_type: create.content_type.or_else(|| template.as_ref().and_then(|t| t.default_content_type.clone())),
        content_quantity: create
            .content_quantity
            .or_else(|| template.as_ref().and_then(|t| t.default_content_quantity)),
        due_date: create.due_date,
        billed_amount: create.billed_amount.unwrap_or_default(),
        editor_payment: create.editor_payment.unwrap_or_default(),
    };
    let project = Projects::new(&mut tx).create(&request).await?;

    if let Some(template) = &template {
        let created = Tasks::new(&mut tx)
            .create_from_titles(project.id, project.editor_id, &template.default_tasks)
            .await?;
        debug!("Created {created} tasks from template {}", template.name);
    }
    let tasks = Tasks::new(&mut tx).list_for_project(project.id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("create")
                .entity_type("project")
                .entity_id(project.id)
                .entity_name(project.title.clone())
                .maybe_ip_address(client_ip(&headers))
                .build(),
        )
        .await;

    Ok((
        StatusCode::CREATED,
        Json(ProjectDetailResponse {
            project: ProjectResponse::from(project),
            tasks: tasks.into_iter().map(TaskResponse::from).collect(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}",
    tag = "projects",
    summary = "Get project with its tasks",
    params(("project_id" = uuid::Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project details", body = ProjectDetailResponse),
        (status = 403, description = "Not the assigned editor"),
        (status = 404, description = "Project not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<ProjectId>,
    current_user: RequiresPermission<resource::Projects, operation::ReadOwn>,
) -> Result<Json<ProjectDetailResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let project = readable_project(&mut conn, project_id, &current_user).await?;
    let tasks = Tasks::new(&mut conn).list_for_project(project_id).await?;

    Ok(Json(ProjectDetailResponse {
        project: ProjectResponse::from(project),
        tasks: tasks.into_iter().map(TaskResponse::from).collect(),
    }))
}

#[utoipa::path(
    patch,
    path = "/projects/{project_id}",
    tag = "projects",
    summary = "Update project",
    description = "Status changes add a system comment. Completing a project stamps delivered_at once.",
    request_body = ProjectUpdate,
    params(("project_id" = uuid::Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project updated", body = ProjectResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Project not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_project(
    State(state): State<AppState>,
    Path(project_id): Path<ProjectId>,
    headers: HeaderMap,
    current_user: RequiresPermission<resource::Projects, operation::UpdateAll>,
    Json(update): Json<ProjectUpdate>,
) -> Result<Json<ProjectResponse>> {
    validate_amounts(&[update.billed_amount, update.editor_payment])?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let existing = Projects::new(&mut tx)
        .get_by_id(project_id)
        .await?
        .ok_or_else(|| project_not_found(project_id))?;

    let newly_billed = update.payment_received == Some(true) && !existing.payment_received;
    let newly_paid = update.payment_made == Some(true) && !existing.payment_made;
    let request = ProjectUpdateDBRequest {
        title: update.title,
        description: update.description,
        client_id: update.client_id,
        editor_id: update.editor_id,
        status: update.status,
        content_type: update.content_type,
        content_quantity: update.content_quantity,
        due_date: update.due_date,
        billed_amount: update.billed_amount,
        editor_payment: update.editor_payment,
        payment_received: update.payment_received,
        payment_made: update.payment_made,
        billed_by: newly_billed.then_some(current_user.id),
        paid_by: newly_paid.then_some(current_user.id),
    };
    let project = Projects::new(&mut tx).update(project_id, &request).await?;

    let status_change = update.status.filter(|status| *status != existing.status);
    if let Some(new_status) = status_change {
        Comments::new(&mut tx)
            .create(&CommentCreateDBRequest {
                project_id,
                user_id: Some(current_user.id),
                content: format!("Status changed from {} to {}", existing.status, new_status),
                attachment_url: None,
                is_system: true,
            })
            .await?;
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let details = status_change.map(|new_status| serde_json::json!({ "from": existing.status, "to": new_status }));
    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action(if status_change.is_some() { "status_change" } else { "update" })
                .entity_type("project")
                .entity_id(project.id)
                .entity_name(project.title.clone())
                .maybe_details(details)
                .maybe_ip_address(client_ip(&headers))
                .build(),
        )
        .await;

    Ok(Json(ProjectResponse::from(project)))
}

#[utoipa::path(
    delete,
    path = "/projects/{project_id}",
    tag = "projects",
    summary = "Delete project",
    description = "Hard delete; tasks and comments go with it.",
    params(("project_id" = uuid::Uuid, Path, description = "Project ID")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 404, description = "Project not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<ProjectId>,
    headers: HeaderMap,
    current_user: RequiresPermission<resource::Projects, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Projects::new(&mut conn);
    let project = repo.get_by_id(project_id).await?.ok_or_else(|| project_not_found(project_id))?;
    repo.delete(project_id).await?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("delete")
                .entity_type("project")
                .entity_id(project_id)
                .entity_name(project.title)
                .maybe_ip_address(client_ip(&headers))
                .build(),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}/comments",
    tag = "projects",
    summary = "List project comments",
    params(("project_id" = uuid::Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Comments, oldest first", body = Vec<CommentResponse>),
        (status = 403, description = "Not the assigned editor"),
        (status = 404, description = "Project not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(project_id): Path<ProjectId>,
    current_user: RequiresPermission<resource::Projects, operation::ReadOwn>,
) -> Result<Json<Vec<CommentResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    readable_project(&mut conn, project_id, &current_user).await?;
    let comments = Comments::new(&mut conn).list_for_project(project_id).await?;

    Ok(Json(comments.into_iter().map(CommentResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/comments",
    tag = "projects",
    summary = "Comment on a project",
    request_body = CommentCreate,
    params(("project_id" = uuid::Uuid, Path, description = "Project ID")),
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Empty comment"),
        (status = 403, description = "Not the assigned editor"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_comment(
    State(state): State<AppState>,
    Path(project_id): Path<ProjectId>,
    current_user: RequiresPermission<resource::Projects, operation::ReadOwn>,
    Json(create): Json<CommentCreate>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    if create.content.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Comment content is required".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let project = readable_project(&mut conn, project_id, &current_user).await?;
    let comment = Comments::new(&mut conn)
        .create(&CommentCreateDBRequest {
            project_id,
            user_id: Some(current_user.id),
            content: create.content,
            attachment_url: create.attachment_url,
            is_system: false,
        })
        .await?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("comment")
                .entity_type("project")
                .entity_id(project_id)
                .entity_name(project.title)
                .build(),
        )
        .await;

    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{auth_header, create_test_admin, create_test_app, create_test_client, create_test_editor};
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_create_from_template(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme").await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&admin);

        let template: serde_json::Value = server
            .post("/admin/api/v1/templates")
            .add_header(name.clone(), value.clone())
            .json(&json!({"name": "Wedding", "default_tasks": ["Sync audio", "Rough cut", "Color"], "default_content_type": "video", "default_content_quantity": 2}))
            .await
            .json();

        let response = server
            .post("/admin/api/v1/projects")
            .add_header(name, value)
            .json(&json!({
                "title": "Ana & Leo",
                "client_id": client.id,
                "editor_id": editor.id,
                "template_id": template["id"],
                "billed_amount": "1000",
                "editor_payment": "400"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let detail: ProjectDetailResponse = response.json();
        assert_eq!(detail.project.status, ProjectStatus::Pending);
        assert_eq!(detail.project.content_type.as_deref(), Some("video"));
        assert_eq!(detail.project.content_quantity, Some(2));
        assert_eq!(detail.project.net_profit, Decimal::new(600, 0));
        assert_eq!(detail.project.client_name.as_deref(), Some("Acme"));

        let titles: Vec<_> = detail.tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Sync audio", "Rough cut", "Color"]);
        assert!(detail.tasks.iter().all(|t| t.assigned_to == Some(editor.id)));
        assert_eq!(detail.tasks[2].sort_order, 2);
    }

    #[sqlx::test]
    async fn test_status_change_adds_system_comment(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&admin);

        let detail: ProjectDetailResponse = server
            .post("/admin/api/v1/projects")
            .add_header(name.clone(), value.clone())
            .json(&json!({"title": "Podcast ep. 4"}))
            .await
            .json();
        let id = detail.project.id;

        let updated: ProjectResponse = server
            .patch(&format!("/admin/api/v1/projects/{id}"))
            .add_header(name.clone(), value.clone())
            .json(&json!({"status": "completed", "payment_received": true}))
            .await
            .json();
        assert!(updated.delivered_at.is_some());
        assert!(updated.payment_received);
        assert_eq!(updated.billed_by, Some(admin.id));
        assert_eq!(updated.paid_by, None);

        // Same status again: no extra comment
        server
            .patch(&format!("/admin/api/v1/projects/{id}"))
            .add_header(name.clone(), value.clone())
            .json(&json!({"status": "completed"}))
            .await
            .assert_status_ok();

        let comments: Vec<CommentResponse> = server
            .get(&format!("/admin/api/v1/projects/{id}/comments"))
            .add_header(name, value)
            .await
            .json();
        assert_eq!(comments.len(), 1);
        assert!(comments[0].is_system);
        assert_eq!(comments[0].content, "Status changed from pending to completed");
    }

    #[sqlx::test]
    async fn test_editor_sees_only_own_projects(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let editor = create_test_editor(&pool).await;
        let other = create_test_editor(&pool).await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&admin);

        let mine: ProjectDetailResponse = server
            .post("/admin/api/v1/projects")
            .add_header(name.clone(), value.clone())
            .json(&json!({"title": "Mine", "editor_id": editor.id}))
            .await
            .json();
        let theirs: ProjectDetailResponse = server
            .post("/admin/api/v1/projects")
            .add_header(name, value)
            .json(&json!({"title": "Theirs", "editor_id": other.id}))
            .await
            .json();

        let (name, value) = auth_header(&editor);
        // editor_id in the query is ignored for editors
        let page: PaginatedResponse<ProjectResponse> = server
            .get(&format!("/admin/api/v1/projects?editor_id={}", other.id))
            .add_header(name.clone(), value.clone())
            .await
            .json();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.data[0].id, mine.project.id);

        server
            .get(&format!("/admin/api/v1/projects/{}", theirs.project.id))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(StatusCode::FORBIDDEN);

        // Editors can comment on their own project but cannot edit it
        server
            .post(&format!("/admin/api/v1/projects/{}/comments", mine.project.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({"content": "First cut uploaded", "attachment_url": "https://drive.example/cut1"}))
            .await
            .assert_status(StatusCode::CREATED);
        server
            .patch(&format!("/admin/api/v1/projects/{}", mine.project.id))
            .add_header(name, value)
            .json(&json!({"title": "Renamed"}))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    async fn test_negative_amounts_rejected(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&admin);

        server
            .post("/admin/api/v1/projects")
            .add_header(name, value)
            .json(&json!({"title": "Broken", "billed_amount": "-5"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    async fn test_delete_cascades(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let server = create_test_app(pool.clone());
        let (name, value) = auth_header(&admin);

        let detail: ProjectDetailResponse = server
            .post("/admin/api/v1/projects")
            .add_header(name.clone(), value.clone())
            .json(&json!({"title": "Short-lived"}))
            .await
            .json();
        server
            .post("/admin/api/v1/tasks")
            .add_header(name.clone(), value.clone())
            .json(&json!({"project_id": detail.project.id, "title": "Only task"}))
            .await
            .assert_status(StatusCode::CREATED);

        server
            .delete(&format!("/admin/api/v1/projects/{}", detail.project.id))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .get(&format!("/admin/api/v1/projects/{}", detail.project.id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE project_id = $1")
            .bind(detail.project.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
