use crate::{
    AppState,
    api::models::{
        pagination::PaginatedResponse,
        tasks::{GroupedTasksResponse, ListTasksQuery, TaskCreate, TaskResponse, TaskUpdate},
    },
    auth::permissions::{RequiresPermission, can_read_all_resources, ensure_owner_or, operation, resource},
    db::{
        handlers::{Projects, Repository, Tasks, tasks::TaskFilter},
        models::{
            activity::ActivityLogCreateDBRequest,
            tasks::{TaskCreateDBRequest, TaskUpdateDBRequest},
        },
    },
    errors::{Error, Result},
    types::{Operation, Resource, TaskId},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

fn task_not_found(id: TaskId) -> Error {
    Error::NotFound {
        resource: "Task".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    summary = "List tasks",
    description = "Ordered by due date, then sort order. Editors only see tasks assigned to them.",
    params(ListTasksQuery),
    responses(
        (status = 200, description = "Paginated list of tasks", body = PaginatedResponse<TaskResponse>),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
    current_user: RequiresPermission<resource::Tasks, operation::ReadOwn>,
) -> Result<Json<PaginatedResponse<TaskResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = TaskFilter::new(skip, limit);
    filter.project_id = query.project_id;
    filter.status = query.status;
    filter.assigned_to = if can_read_all_resources(&current_user, Resource::Tasks) {
        query.assigned_to
    } else {
        Some(current_user.id)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Tasks::new(&mut conn);
    let tasks = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        tasks.into_iter().map(TaskResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    get,
    path = "/tasks/grouped",
    tag = "tasks",
    summary = "The caller's tasks grouped by status",
    responses(
        (status = 200, description = "Tasks bucketed into pending, in_progress and completed", body = GroupedTasksResponse),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn grouped_tasks(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Tasks, operation::ReadOwn>,
) -> Result<Json<GroupedTasksResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let tasks = Tasks::new(&mut conn).list_for_assignee(current_user.id).await?;

    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/tasks",
    tag = "tasks",
    summary = "Create task",
    request_body = TaskCreate,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Project not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_task(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Tasks, operation::CreateAll>,
    Json(create): Json<TaskCreate>,
) -> Result<(StatusCode, Json<TaskResponse>)> {
    if create.title.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Task title is required".to_string(),
        });
    }
    if create.payment_amount.is_some_and(|a| a.is_sign_negative()) {
        return Err(Error::BadRequest {
            message: "Amounts cannot be negative".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let project = Projects::new(&mut conn)
        .get_by_id(create.project_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Project".to_string(),
            id: create.project_id.to_string(),
        })?;

    let request = TaskCreateDBRequest {
        project_id: project.id,
        title: create.title.trim().to_string(),
        description: create.description,
        assigned_to: create.assigned_to.or(project.editor_id),
        due_date: create.due_date,
        sort_order: create.sort_order.unwrap_or_default(),
        payment_amount: create.payment_amount.unwrap_or_default(),
    };
    let task = Tasks::new(&mut conn).create(&request).await?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("create")
                .entity_type("task")
                .entity_id(task.id)
                .entity_name(task.title.clone())
                .build(),
        )
        .await;

    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

#[utoipa::path(
    patch,
    path = "/tasks/{task_id}",
    tag = "tasks",
    summary = "Update task",
    description = "Admins may change any field. The assigned editor may only change status and notes.",
    request_body = TaskUpdate,
    params(("task_id" = uuid::Uuid, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 403, description = "Not allowed to change these fields"),
        (status = 404, description = "Task not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
    current_user: RequiresPermission<resource::Tasks, operation::UpdateOwn>,
    Json(update): Json<TaskUpdate>,
) -> Result<Json<TaskResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let existing = Tasks::new(&mut conn).get_by_id(task_id).await?.ok_or_else(|| task_not_found(task_id))?;

    ensure_owner_or(&current_user, Resource::Tasks, Operation::UpdateOwn, existing.assigned_to)?;
    if update.touches_admin_fields() {
        ensure_owner_or(&current_user, Resource::Tasks, Operation::UpdateAll, None)?;
    }
    if update.payment_amount.is_some_and(|a| a.is_sign_negative()) {
        return Err(Error::BadRequest {
            message: "Amounts cannot be negative".to_string(),
        });
    }

    let status_change = update.status.filter(|s| *s != existing.status);
    let request = TaskUpdateDBRequest {
        title: update.title,
        description: update.description,
        status: update.status,
        assigned_to: update.assigned_to,
        due_date: update.due_date,
        sort_order: update.sort_order,
        payment_amount: update.payment_amount,
        notes: update.notes,
    };
    let task = Tasks::new(&mut conn).update(task_id, &request).await?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action(if status_change.is_some() { "status_change" } else { "update" })
                .entity_type("task")
                .entity_id(task.id)
                .entity_name(task.title.clone())
                .maybe_details(status_change.map(|to| serde_json::json!({ "from": existing.status, "to": to })))
                .build(),
        )
        .await;

    Ok(Json(TaskResponse::from(task)))
}

#[utoipa::path(
    delete,
    path = "/tasks/{task_id}",
    tag = "tasks",
    summary = "Delete task",
    params(("task_id" = uuid::Uuid, Path, description = "Task ID")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "Task not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
    current_user: RequiresPermission<resource::Tasks, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !Tasks::new(&mut conn).delete(task_id).await? {
        return Err(task_not_found(task_id));
    }

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("delete")
                .entity_type("task")
                .entity_id(task_id)
                .build(),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
