use crate::{
    AppState,
    api::models::{
        pagination::PaginatedResponse,
        shorts::{ClosureDetailResponse, ClosureResponse, ClosureStatus, ListClosuresQuery},
    },
    auth::permissions::{RequiresPermission, can_read_all_resources, ensure_owner_or, operation, resource},
    db::{
        handlers::{WeeklyClosures, closures::ClosureFilter},
        models::{activity::ActivityLogCreateDBRequest, shorts::ClosureDBResponse},
    },
    errors::{Error, Result},
    types::{ClosureId, Operation, Resource, UserId},
    weekly,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};

fn closure_label(closure: &ClosureDBResponse) -> String {
    format!("{} / {} ({})", closure.client_name, closure.editor_name, closure.week_start_date)
}

async fn record_transition(state: &AppState, actor: UserId, action: &str, closure: &ClosureDBResponse) {
    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(actor)
                .action(action)
                .entity_type("weekly_closure")
                .entity_id(closure.id)
                .entity_name(closure_label(closure))
                .details(serde_json::json!({ "status": closure.status }))
                .build(),
        )
        .await;
}

#[utoipa::path(
    get,
    path = "/shorts/closures",
    tag = "closures",
    summary = "List weekly closures",
    description = "Newest week first. Editors only see their own.",
    params(ListClosuresQuery),
    responses(
        (status = 200, description = "Paginated list of closures", body = PaginatedResponse<ClosureResponse>),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_closures(
    State(state): State<AppState>,
    Query(query): Query<ListClosuresQuery>,
    current_user: RequiresPermission<resource::Closures, operation::ReadOwn>,
) -> Result<Json<PaginatedResponse<ClosureResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = ClosureFilter::new(skip, limit);
    filter.plan_id = query.plan_id;
    filter.status = query.status;
    if !can_read_all_resources(&current_user, Resource::Closures) {
        filter.editor_id = Some(current_user.id);
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = WeeklyClosures::new(&mut conn);
    let closures = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        closures.into_iter().map(ClosureResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    get,
    path = "/shorts/closures/{closure_id}",
    tag = "closures",
    summary = "Get weekly closure",
    description = "The closure with compliance and payouts recounted from its week's tasks.",
    params(("closure_id" = uuid::Uuid, Path, description = "Closure ID")),
    responses(
        (status = 200, description = "Closure with live summary", body = ClosureDetailResponse),
        (status = 403, description = "Not the closure's editor"),
        (status = 404, description = "Closure not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_closure(
    State(state): State<AppState>,
    Path(closure_id): Path<ClosureId>,
    current_user: RequiresPermission<resource::Closures, operation::ReadOwn>,
) -> Result<Json<ClosureDetailResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let (closure, summary) = weekly::closure_detail(&mut conn, closure_id).await?;
    ensure_owner_or(&current_user, Resource::Closures, Operation::ReadOwn, Some(closure.editor_id))?;

    Ok(Json(ClosureDetailResponse {
        closure: closure.into(),
        summary,
    }))
}

#[utoipa::path(
    post,
    path = "/shorts/closures/{closure_id}/confirm",
    tag = "closures",
    summary = "Confirm weekly closure",
    description = "Freezes the week's totals and books the editor payout and client charge.",
    params(("closure_id" = uuid::Uuid, Path, description = "Closure ID")),
    responses(
        (status = 200, description = "Closure confirmed", body = ClosureResponse),
        (status = 400, description = "Closure is not open"),
        (status = 404, description = "Closure not found"),
        (status = 409, description = "Closure changed concurrently"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn confirm_closure(
    State(state): State<AppState>,
    Path(closure_id): Path<ClosureId>,
    current_user: RequiresPermission<resource::Closures, operation::UpdateAll>,
) -> Result<Json<ClosureResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let closure = weekly::confirm_closure(&mut tx, closure_id, current_user.id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    record_transition(&state, current_user.id, "confirm", &closure).await;
    Ok(Json(ClosureResponse::from(closure)))
}

#[utoipa::path(
    post,
    path = "/shorts/closures/{closure_id}/mark-editor-paid",
    tag = "closures",
    summary = "Mark editor paid",
    params(("closure_id" = uuid::Uuid, Path, description = "Closure ID")),
    responses(
        (status = 200, description = "Closure updated", body = ClosureResponse),
        (status = 400, description = "Closure is not confirmed"),
        (status = 404, description = "Closure not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn mark_editor_paid(
    State(state): State<AppState>,
    Path(closure_id): Path<ClosureId>,
    current_user: RequiresPermission<resource::Closures, operation::UpdateAll>,
) -> Result<Json<ClosureResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let closure = weekly::mark_closure(&mut conn, closure_id, ClosureStatus::PaidEditor).await?;

    record_transition(&state, current_user.id, "mark_editor_paid", &closure).await;
    Ok(Json(ClosureResponse::from(closure)))
}

#[utoipa::path(
    post,
    path = "/shorts/closures/{closure_id}/mark-client-charged",
    tag = "closures",
    summary = "Mark client charged",
    params(("closure_id" = uuid::Uuid, Path, description = "Closure ID")),
    responses(
        (status = 200, description = "Closure updated", body = ClosureResponse),
        (status = 400, description = "Closure is not confirmed"),
        (status = 404, description = "Closure not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn mark_client_charged(
    State(state): State<AppState>,
    Path(closure_id): Path<ClosureId>,
    current_user: RequiresPermission<resource::Closures, operation::UpdateAll>,
) -> Result<Json<ClosureResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let closure = weekly::mark_closure(&mut conn, closure_id, ClosureStatus::ChargedClient).await?;

    record_transition(&state, current_user.id, "mark_client_charged", &closure).await;
    Ok(Json(ClosureResponse::from(closure)))
}

#[utoipa::path(
    post,
    path = "/shorts/closures/{closure_id}/reopen",
    tag = "closures",
    summary = "Reopen weekly closure",
    description = "Removes the payments booked on confirmation. Not allowed once paid or charged.",
    params(("closure_id" = uuid::Uuid, Path, description = "Closure ID")),
    responses(
        (status = 200, description = "Closure reopened", body = ClosureResponse),
        (status = 400, description = "Closure is not confirmed"),
        (status = 404, description = "Closure not found"),
        (status = 409, description = "Closure changed concurrently"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn reopen_closure(
    State(state): State<AppState>,
    Path(closure_id): Path<ClosureId>,
    current_user: RequiresPermission<resource::Closures, operation::UpdateAll>,
) -> Result<Json<ClosureResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let closure = weekly::reopen_closure(&mut tx, closure_id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    record_transition(&state, current_user.id, "reopen", &closure).await;
    Ok(Json(ClosureResponse::from(closure)))
}
