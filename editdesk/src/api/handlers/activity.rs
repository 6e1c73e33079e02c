use crate::{
    AppState,
    api::models::{
        activity::{ActivityLogResponse, ListActivityQuery},
        pagination::PaginatedResponse,
    },
    auth::permissions::{RequiresPermission, operation, resource},
    db::handlers::{ActivityLogs, activity::ActivityFilter},
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Query, State},
};

#[utoipa::path(
    get,
    path = "/activity",
    tag = "activity",
    summary = "Audit log",
    description = "Newest first.",
    params(ListActivityQuery),
    responses(
        (status = 200, description = "Paginated activity entries", body = PaginatedResponse<ActivityLogResponse>),
        (status = 403, description = "Forbidden"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_activity(
    State(state): State<AppState>,
    Query(query): Query<ListActivityQuery>,
    _: RequiresPermission<resource::Activity, operation::ReadAll>,
) -> Result<Json<PaginatedResponse<ActivityLogResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = ActivityFilter::new(skip, limit);
    filter.user_id = query.user_id;
    filter.entity_type = query.entity_type.filter(|s| !s.is_empty());
    filter.action = query.action.filter(|s| !s.is_empty());

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = ActivityLogs::new(&mut conn);
    let entries = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        entries.into_iter().map(ActivityLogResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}
