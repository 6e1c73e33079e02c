use crate::{
    AppState,
    api::models::{
        pagination::PaginatedResponse,
        shorts::{
            GenerateWeekRequest, GenerationResult, ListPlansQuery, ListShortsTasksQuery, MyShortsResponse, PlanCreate, PlanCreatedResponse,
            PlanDetailResponse, PlanResponse, PlanUpdate, ShortsTaskResponse, ShortsTaskStatus, ShortsTaskUpdate,
        },
    },
    auth::permissions::{RequiresPermission, can_read_all_resources, ensure_owner_or, has_permission, operation, resource},
    db::{
        errors::DbError,
        handlers::{Repository, ShortsPlans, ShortsTasks, shorts_plans::PlanFilter, shorts_tasks::ShortsTaskFilter},
        models::{
            activity::ActivityLogCreateDBRequest,
            shorts::{PlanCreateDBRequest, PlanDBResponse, PlanUpdateDBRequest, ShortsTaskDBResponse},
        },
    },
    errors::{Error, Result},
    planning::{self, PlanRates},
    types::{Operation, PlanId, Resource, ShortsTaskId, UserId, abbrev_uuid},
    weekly,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use sqlx::PgConnection;
use tracing::error;

fn plan_not_found(id: PlanId) -> Error {
    Error::NotFound {
        resource: "Plan".to_string(),
        id: id.to_string(),
    }
}

fn shorts_task_not_found(id: ShortsTaskId) -> Error {
    Error::NotFound {
        resource: "Shorts task".to_string(),
        id: id.to_string(),
    }
}

fn plan_label(plan: &PlanDBResponse) -> String {
    format!("{} / {}", plan.client_name, plan.editor_name)
}

async fn load_plan(conn: &mut PgConnection, id: PlanId) -> Result<PlanDBResponse> {
    ShortsPlans::new(conn).get_by_id(id).await?.ok_or_else(|| plan_not_found(id))
}

async fn load_shorts_task(conn: &mut PgConnection, id: ShortsTaskId) -> Result<ShortsTaskDBResponse> {
    ShortsTasks::new(conn).get_by_id(id).await?.ok_or_else(|| shorts_task_not_found(id))
}

#[utoipa::path(
    get,
    path = "/shorts/plans",
    tag = "shorts",
    summary = "List shorts plans",
    description = "Newest first. Editors only see their own plans.",
    params(ListPlansQuery),
    responses(
        (status = 200, description = "Paginated list of plans", body = PaginatedResponse<PlanResponse>),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_plans(
    State(state): State<AppState>,
    Query(query): Query<ListPlansQuery>,
    current_user: RequiresPermission<resource::ShortsPlans, operation::ReadOwn>,
) -> Result<Json<PaginatedResponse<PlanResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = PlanFilter::new(skip, limit);
    filter.status = query.status;
    filter.client_id = query.client_id;
    filter.editor_id = if can_read_all_resources(&current_user, Resource::ShortsPlans) {
        query.editor_id
    } else {
        Some(current_user.id)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = ShortsPlans::new(&mut conn);
    let plans = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        plans.into_iter().map(PlanResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    post,
    path = "/shorts/plans",
    tag = "shorts",
    summary = "Create shorts plan",
    description = "Creates the plan and generates the week starting at `start_date`.",
    request_body = PlanCreate,
    responses(
        (status = 201, description = "Plan created", body = PlanCreatedResponse),
        (status = 400, description = "Invalid plan"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_plan(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::ShortsPlans, operation::CreateAll>,
    Json(create): Json<PlanCreate>,
) -> Result<(StatusCode, Json<PlanCreatedResponse>)> {
    let rates = PlanRates {
        client: create.weekly_rate_client,
        editor: create.weekly_rate_editor,
    };
    let active_days = planning::validate_plan(create.shorts_per_day, &create.active_days, rates)
        .map_err(|e| Error::BadRequest { message: e.to_string() })?;

    let shorts = &state.config.shorts;
    let request = PlanCreateDBRequest::from_api(create, active_days.to_vec(), &shorts.default_currency, &shorts.default_timezone);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    // The first week is generated outside any transaction, so a failed generation removes the plan again
    let plan = ShortsPlans::new(&mut conn).create(&request).await?;
    let generation = match weekly::generate_week(&mut conn, plan.id, plan.start_date).await {
        Ok(generation) => generation,
        Err(e) => {
            if let Err(cleanup) = ShortsPlans::new(&mut conn).delete(plan.id).await {
                error!(plan_id = %abbrev_uuid(&plan.id), error = %cleanup, "Failed to remove plan after its first week failed to generate");
            }
            return Err(e);
        }
    };

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("create")
                .entity_type("shorts_plan")
                .entity_id(plan.id)
                .entity_name(plan_label(&plan))
                .details(serde_json::json!({ "tasks_created": generation.tasks_created }))
                .build(),
        )
        .await;

    Ok((
        StatusCode::CREATED,
        Json(PlanCreatedResponse {
            plan: plan.into(),
            generation,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/shorts/plans/{plan_id}",
    tag = "shorts",
    summary = "Get shorts plan",
    description = "The plan with its closures and the tasks of its open week.",
    params(("plan_id" = uuid::Uuid, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Plan details", body = PlanDetailResponse),
        (status = 403, description = "Not the plan's editor"),
        (status = 404, description = "Plan not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<PlanId>,
    current_user: RequiresPermission<resource::ShortsPlans, operation::ReadOwn>,
) -> Result<Json<PlanDetailResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let plan = load_plan(&mut conn, plan_id).await?;
    ensure_owner_or(&current_user, Resource::ShortsPlans, Operation::ReadOwn, Some(plan.editor_id))?;

    Ok(Json(weekly::plan_detail(&mut conn, plan).await?))
}

#[utoipa::path(
    patch,
    path = "/shorts/plans/{plan_id}",
    tag = "shorts",
    summary = "Update shorts plan",
    description = "Changes only apply to weeks generated afterwards.",
    request_body = PlanUpdate,
    params(("plan_id" = uuid::Uuid, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Plan updated", body = PlanResponse),
        (status = 400, description = "Invalid plan"),
        (status = 404, description = "Plan not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<PlanId>,
    current_user: RequiresPermission<resource::ShortsPlans, operation::UpdateAll>,
    Json(update): Json<PlanUpdate>,
) -> Result<Json<PlanResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let existing = load_plan(&mut conn, plan_id).await?;

    // Validate the plan as it will look after the update
    let rates = PlanRates {
        client: update.weekly_rate_client.unwrap_or(existing.weekly_rate_client),
        editor: update.weekly_rate_editor.unwrap_or(existing.weekly_rate_editor),
    };
    let active_days = planning::validate_plan(
        update.shorts_per_day.unwrap_or(existing.shorts_per_day),
        update.active_days.as_deref().unwrap_or(&existing.active_days),
        rates,
    )
    .map_err(|e| Error::BadRequest { message: e.to_string() })?;

    let status_change = update.status.filter(|s| *s != existing.status);
    let mut request = PlanUpdateDBRequest::from(update);
    request.active_days = request.active_days.map(|_| active_days.to_vec());

    let plan = ShortsPlans::new(&mut conn)
        .update(plan_id, &request)
        .await
        .map_err(|e| match e {
            DbError::NotFound => plan_not_found(plan_id),
            other => other.into(),
        })?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action(if status_change.is_some() { "status_change" } else { "update" })
                .entity_type("shorts_plan")
                .entity_id(plan.id)
                .entity_name(plan_label(&plan))
                .maybe_details(status_change.map(|to| serde_json::json!({ "from": existing.status, "to": to })))
                .build(),
        )
        .await;

    Ok(Json(PlanResponse::from(plan)))
}

#[utoipa::path(
    delete,
    path = "/shorts/plans/{plan_id}",
    tag = "shorts",
    summary = "Delete shorts plan",
    description = "Also deletes the plan's tasks and closures.",
    params(("plan_id" = uuid::Uuid, Path, description = "Plan ID")),
    responses(
        (status = 204, description = "Plan deleted"),
        (status = 404, description = "Plan not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<PlanId>,
    current_user: RequiresPermission<resource::ShortsPlans, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let plan = load_plan(&mut conn, plan_id).await?;
    if !ShortsPlans::new(&mut conn).delete(plan_id).await? {
        return Err(plan_not_found(plan_id));
    }

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("delete")
                .entity_type("shorts_plan")
                .entity_id(plan_id)
                .entity_name(plan_label(&plan))
                .build(),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/shorts/plans/{plan_id}/generate",
    tag = "shorts",
    summary = "Generate a week of shorts",
    description = "Creates the tasks and open closure for the 7 days starting at `week_start`. Safe to repeat.",
    request_body = GenerateWeekRequest,
    params(("plan_id" = uuid::Uuid, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Generation result", body = GenerationResult),
        (status = 404, description = "Plan not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn generate_week(
    State(state): State<AppState>,
    Path(plan_id): Path<PlanId>,
    _: RequiresPermission<resource::ShortsPlans, operation::UpdateAll>,
    Json(request): Json<GenerateWeekRequest>,
) -> Result<Json<GenerationResult>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Ok(Json(weekly::generate_week(&mut conn, plan_id, request.week_start).await?))
}

#[utoipa::path(
    post,
    path = "/shorts/plans/{plan_id}/generate-current",
    tag = "shorts",
    summary = "Generate the current week of shorts",
    params(("plan_id" = uuid::Uuid, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Generation result", body = GenerationResult),
        (status = 404, description = "Plan not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn generate_current_week(
    State(state): State<AppState>,
    Path(plan_id): Path<PlanId>,
    _: RequiresPermission<resource::ShortsPlans, operation::UpdateAll>,
) -> Result<Json<GenerationResult>> {
    let week_start = planning::week_start_for(Utc::now().date_naive(), state.config.shorts.week_starts_on);
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Ok(Json(weekly::generate_week(&mut conn, plan_id, week_start).await?))
}

#[utoipa::path(
    get,
    path = "/shorts/tasks",
    tag = "shorts",
    summary = "List shorts tasks",
    description = "Ordered by due date. Editors only see their own.",
    params(ListShortsTasksQuery),
    responses(
        (status = 200, description = "Paginated list of shorts tasks", body = PaginatedResponse<ShortsTaskResponse>),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_shorts_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListShortsTasksQuery>,
    current_user: RequiresPermission<resource::ShortsTasks, operation::ReadOwn>,
) -> Result<Json<PaginatedResponse<ShortsTaskResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = ShortsTaskFilter::new(skip, limit);
    filter.plan_id = query.plan_id;
    filter.status = query.status;
    filter.from = query.from;
    filter.to = query.to;
    if !can_read_all_resources(&current_user, Resource::ShortsTasks) {
        filter.editor_id = Some(current_user.id);
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = ShortsTasks::new(&mut conn);
    let tasks = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        tasks.into_iter().map(ShortsTaskResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    patch,
    path = "/shorts/tasks/{task_id}",
    tag = "shorts",
    summary = "Update shorts task",
    description = "Editors may move their own tasks between pending, in progress and done while the week is open.",
    request_body = ShortsTaskUpdate,
    params(("task_id" = uuid::Uuid, Path, description = "Shorts task ID")),
    responses(
        (status = 200, description = "Task updated", body = ShortsTaskResponse),
        (status = 400, description = "Week closed or status not allowed"),
        (status = 403, description = "Not the task's editor"),
        (status = 404, description = "Task not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_shorts_task(
    State(state): State<AppState>,
    Path(task_id): Path<ShortsTaskId>,
    current_user: RequiresPermission<resource::ShortsTasks, operation::UpdateOwn>,
    Json(update): Json<ShortsTaskUpdate>,
) -> Result<Json<ShortsTaskResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let existing = load_shorts_task(&mut conn, task_id).await?;
    ensure_owner_or(&current_user, Resource::ShortsTasks, Operation::UpdateOwn, Some(existing.editor_id))?;

    if !has_permission(&current_user, Resource::ShortsTasks, Operation::UpdateAll) {
        if update.status.is_some_and(|s| !s.editor_settable()) {
            return Err(Error::BadRequest {
                message: "Only an admin can reject a short".to_string(),
            });
        }
        weekly::ensure_week_open(&mut conn, &existing).await?;
    }

    let proof_url = update.proof_url.as_deref().map(str::trim);
    let task = ShortsTasks::new(&mut conn)
        .update(task_id, update.status, proof_url)
        .await
        .map_err(|e| match e {
            DbError::NotFound => shorts_task_not_found(task_id),
            other => other.into(),
        })?;

    if let Some(to) = update.status.filter(|s| *s != existing.status) {
        state
            .activity()
            .record(
                ActivityLogCreateDBRequest::builder()
                    .user_id(current_user.id)
                    .action("status_change")
                    .entity_type("shorts_task")
                    .entity_id(task.id)
                    .entity_name(format!("{} ({})", task.title, task.due_date))
                    .details(serde_json::json!({ "from": existing.status, "to": to }))
                    .build(),
            )
            .await;
    }

    Ok(Json(ShortsTaskResponse::from(task)))
}

async fn review_shorts_task(
    state: &AppState,
    task_id: ShortsTaskId,
    reviewer: UserId,
    outcome: ShortsTaskStatus,
) -> Result<ShortsTaskResponse> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let existing = load_shorts_task(&mut conn, task_id).await?;
    if existing.status != ShortsTaskStatus::Done {
        return Err(Error::BadRequest {
            message: "Only delivered shorts can be reviewed".to_string(),
        });
    }

    let task = ShortsTasks::new(&mut conn).review(task_id, outcome, reviewer).await?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(reviewer)
                .action(if outcome == ShortsTaskStatus::Rejected { "reject" } else { "approve" })
                .entity_type("shorts_task")
                .entity_id(task.id)
                .entity_name(format!("{} ({})", task.title, task.due_date))
                .build(),
        )
        .await;

    Ok(ShortsTaskResponse::from(task))
}

#[utoipa::path(
    post,
    path = "/shorts/tasks/{task_id}/approve",
    tag = "shorts",
    summary = "Approve a delivered short",
    params(("task_id" = uuid::Uuid, Path, description = "Shorts task ID")),
    responses(
        (status = 200, description = "Task approved", body = ShortsTaskResponse),
        (status = 400, description = "Task is not done"),
        (status = 404, description = "Task not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn approve_shorts_task(
    State(state): State<AppState>,
    Path(task_id): Path<ShortsTaskId>,
    current_user: RequiresPermission<resource::ShortsTasks, operation::UpdateAll>,
) -> Result<Json<ShortsTaskResponse>> {
    Ok(Json(review_shorts_task(&state, task_id, current_user.id, ShortsTaskStatus::Done).await?))
}

#[utoipa::path(
    post,
    path = "/shorts/tasks/{task_id}/reject",
    tag = "shorts",
    summary = "Reject a delivered short",
    params(("task_id" = uuid::Uuid, Path, description = "Shorts task ID")),
    responses(
        (status = 200, description = "Task rejected", body = ShortsTaskResponse),
        (status = 400, description = "Task is not done"),
        (status = 404, description = "Task not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn reject_shorts_task(
    State(state): State<AppState>,
    Path(task_id): Path<ShortsTaskId>,
    current_user: RequiresPermission<resource::ShortsTasks, operation::UpdateAll>,
) -> Result<Json<ShortsTaskResponse>> {
    Ok(Json(review_shorts_task(&state, task_id, current_user.id, ShortsTaskStatus::Rejected).await?))
}

#[utoipa::path(
    get,
    path = "/shorts/mine",
    tag = "shorts",
    summary = "My current shorts week",
    description = "The caller's first active plan, its open closure and that week's tasks.",
    responses(
        (status = 200, description = "Current week", body = MyShortsResponse),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn my_shorts(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::ShortsTasks, operation::ReadOwn>,
) -> Result<Json<MyShortsResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Ok(Json(weekly::my_shorts(&mut conn, current_user.id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::shorts::PlanStatus;
    use crate::test_utils::{auth_header, create_test_admin, create_test_app, create_test_client, create_test_editor, create_test_plan};
    use chrono::NaiveDate;
    use serde_json::json;
    use sqlx::PgPool;

    const MONDAY: &str = "2025-06-02";

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    #[sqlx::test]
    async fn test_create_plan_generates_first_week(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&admin);

        let response = server
            .post("/admin/api/v1/shorts/plans")
            .add_header(name.clone(), value.clone())
            .json(&json!({
                "client_id": client.id,
                "editor_id": editor.id,
                "shorts_per_day": 1,
                "active_days": [5, 1, 1, 3],
                "weekly_rate_client": "400",
                "weekly_rate_editor": "200",
                "start_date": MONDAY
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: PlanCreatedResponse = response.json();

        assert_eq!(created.plan.active_days, vec![1, 3, 5]);
        assert_eq!(created.plan.currency, "USD");
        assert_eq!(created.plan.timezone, "America/Argentina/Buenos_Aires");
        assert_eq!(created.plan.status, PlanStatus::Active);
        assert_eq!(created.generation.tasks_created, 3);
        assert!(created.generation.closure_created);

        // Repeating the same week creates nothing
        let again: GenerationResult = server
            .post(&format!("/admin/api/v1/shorts/plans/{}/generate", created.plan.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({"week_start": MONDAY}))
            .await
            .json();
        assert_eq!(again.tasks_created, 0);
        assert!(!again.closure_created);

        let detail: PlanDetailResponse = server
            .get(&format!("/admin/api/v1/shorts/plans/{}", created.plan.id))
            .add_header(name, value)
            .await
            .json();
        assert_eq!(detail.closures.len(), 1);
        assert_eq!(detail.tasks.len(), 3);
        assert!(detail.tasks.iter().all(|t| t.title == "Short #1"));
    }

    #[sqlx::test]
    async fn test_create_plan_validation(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&admin);

        for (shorts_per_day, active_days, rate) in [(0, json!([1]), "100"), (1, json!([]), "100"), (1, json!([7]), "100"), (1, json!([1]), "-5")] {
            server
                .post("/admin/api/v1/shorts/plans")
                .add_header(name.clone(), value.clone())
                .json(&json!({
                    "client_id": client.id,
                    "editor_id": editor.id,
                    "shorts_per_day": shorts_per_day,
                    "active_days": active_days,
                    "weekly_rate_client": rate,
                    "weekly_rate_editor": "50",
                    "start_date": MONDAY
                }))
                .await
                .assert_status(StatusCode::BAD_REQUEST);
        }
    }

    #[sqlx::test]
    async fn test_create_plan_rejects_too_many_shorts_per_day(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let server = create_test_app(pool.clone());
        let (name, value) = auth_header(&admin);

        for shorts_per_day in [planning::MAX_SHORTS_PER_DAY + 1, 2000, i32::MAX] {
            server
                .post("/admin/api/v1/shorts/plans")
                .add_header(name.clone(), value.clone())
                .json(&json!({
                    "client_id": client.id,
                    "editor_id": editor.id,
                    "shorts_per_day": shorts_per_day,
                    "active_days": [0, 1, 2, 3, 4, 5, 6],
                    "weekly_rate_client": "100",
                    "weekly_rate_editor": "50",
                    "start_date": MONDAY
                }))
                .await
                .assert_status(StatusCode::BAD_REQUEST);
        }

        let created: PlanCreatedResponse = server
            .post("/admin/api/v1/shorts/plans")
            .add_header(name, value)
            .json(&json!({
                "client_id": client.id,
                "editor_id": editor.id,
                "shorts_per_day": planning::MAX_SHORTS_PER_DAY,
                "active_days": [0, 1, 2, 3, 4, 5, 6],
                "weekly_rate_client": "100",
                "weekly_rate_editor": "50",
                "start_date": MONDAY
            }))
            .await
            .json();
        assert_eq!(created.generation.tasks_created, i64::from(planning::MAX_SHORTS_PER_DAY) * 7);
    }

    #[sqlx::test]
    async fn test_create_plan_removed_when_first_week_fails(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        for statement in [
            "CREATE FUNCTION refuse_shorts_task() RETURNS trigger AS $$ BEGIN RAISE EXCEPTION 'shorts tasks are read-only'; END; $$ LANGUAGE plpgsql",
            "CREATE TRIGGER refuse_shorts_task BEFORE INSERT ON shorts_tasks FOR EACH ROW EXECUTE FUNCTION refuse_shorts_task()",
        ] {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }
        let server = create_test_app(pool.clone());
        let (name, value) = auth_header(&admin);

        server
            .post("/admin/api/v1/shorts/plans")
            .add_header(name, value)
            .json(&json!({
                "client_id": client.id,
                "editor_id": editor.id,
                "shorts_per_day": 1,
                "active_days": [1],
                "weekly_rate_client": "100",
                "weekly_rate_editor": "50",
                "start_date": MONDAY
            }))
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        let plans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shorts_plans").fetch_one(&pool).await.unwrap();
        assert_eq!(plans, 0);
    }

    #[sqlx::test]
    async fn test_update_plan_validates_merged_values(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let plan = create_test_plan(&pool, client.id, editor.id, monday()).await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&admin);

        server
            .patch(&format!("/admin/api/v1/shorts/plans/{}", plan.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({"active_days": [9]}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let updated: PlanResponse = server
            .patch(&format!("/admin/api/v1/shorts/plans/{}", plan.id))
            .add_header(name, value)
            .json(&json!({"status": "paused", "active_days": [2, 2, 4]}))
            .await
            .json();
        assert_eq!(updated.status, PlanStatus::Paused);
        assert_eq!(updated.active_days, vec![2, 4]);
        assert_eq!(updated.shorts_per_day, 2);
    }

    #[sqlx::test]
    async fn test_editor_task_workflow(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let editor = create_test_editor(&pool).await;
        let other_editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let plan = create_test_plan(&pool, client.id, editor.id, monday()).await;
        let server = create_test_app(pool);
        let (admin_name, admin_value) = auth_header(&admin);
        let (name, value) = auth_header(&editor);

        server
            .post(&format!("/admin/api/v1/shorts/plans/{}/generate", plan.id))
            .add_header(admin_name.clone(), admin_value.clone())
            .json(&json!({"week_start": MONDAY}))
            .await
            .assert_status_ok();

        let mine: MyShortsResponse = server.get("/admin/api/v1/shorts/mine").add_header(name.clone(), value.clone()).await.json();
        assert_eq!(mine.plan.unwrap().id, plan.id);
        assert_eq!(mine.tasks.len(), 6);
        let task = &mine.tasks[0];

        let done: ShortsTaskResponse = server
            .patch(&format!("/admin/api/v1/shorts/tasks/{}", task.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({"status": "done", "proof_url": " https://example.com/short-1 "}))
            .await
            .json();
        assert_eq!(done.status, ShortsTaskStatus::Done);
        assert_eq!(done.proof_url.as_deref(), Some("https://example.com/short-1"));

        // Editors cannot reject, nor touch someone else's task
        server
            .patch(&format!("/admin/api/v1/shorts/tasks/{}", task.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({"status": "rejected"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        let (other_name, other_value) = auth_header(&other_editor);
        server
            .patch(&format!("/admin/api/v1/shorts/tasks/{}", task.id))
            .add_header(other_name.clone(), other_value.clone())
            .json(&json!({"status": "pending"}))
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .post(&format!("/admin/api/v1/shorts/tasks/{}/approve", task.id))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let theirs: PaginatedResponse<ShortsTaskResponse> = server
            .get("/admin/api/v1/shorts/tasks")
            .add_header(other_name, other_value)
            .await
            .json();
        assert_eq!(theirs.total_count, 0);

        let approved: ShortsTaskResponse = server
            .post(&format!("/admin/api/v1/shorts/tasks/{}/approve", task.id))
            .add_header(admin_name.clone(), admin_value.clone())
            .await
            .json();
        assert_eq!(approved.status, ShortsTaskStatus::Done);
        assert_eq!(approved.reviewed_by, Some(admin.id));

        // Pending tasks cannot be reviewed
        server
            .post(&format!("/admin/api/v1/shorts/tasks/{}/reject", mine.tasks[1].id))
            .add_header(admin_name, admin_value)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let done_only: PaginatedResponse<ShortsTaskResponse> = server
            .get(&format!("/admin/api/v1/shorts/tasks?status=done&from={MONDAY}&to={MONDAY}"))
            .add_header(name, value)
            .await
            .json();
        assert_eq!(done_only.total_count, 1);
    }

    #[sqlx::test]
    async fn test_editors_only_see_their_plans(pool: PgPool) {
        let editor = create_test_editor(&pool).await;
        let other_editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let own = create_test_plan(&pool, client.id, editor.id, monday()).await;
        let other = create_test_plan(&pool, client.id, other_editor.id, monday()).await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&editor);

        let plans: PaginatedResponse<PlanResponse> = server
            .get(&format!("/admin/api/v1/shorts/plans?editor_id={}", other_editor.id))
            .add_header(name.clone(), value.clone())
            .await
            .json();
        assert_eq!(plans.total_count, 1);
        assert_eq!(plans.data[0].id, own.id);

        server
            .get(&format!("/admin/api/v1/shorts/plans/{}", other.id))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .post("/admin/api/v1/shorts/plans")
            .add_header(name, value)
            .json(&json!({}))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    async fn test_delete_plan_cascades(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let plan = create_test_plan(&pool, client.id, editor.id, monday()).await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&admin);

        server
            .post(&format!("/admin/api/v1/shorts/plans/{}/generate-current", plan.id))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status_ok();
        server
            .delete(&format!("/admin/api/v1/shorts/plans/{}", plan.id))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let tasks: PaginatedResponse<ShortsTaskResponse> = server
            .get(&format!("/admin/api/v1/shorts/tasks?plan_id={}", plan.id))
            .add_header(name.clone(), value.clone())
            .await
            .json();
        assert_eq!(tasks.total_count, 0);
        server
            .get(&format!("/admin/api/v1/shorts/plans/{}", plan.id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
