use crate::{
    AppState,
    api::models::{
        pagination::PaginatedResponse,
        reports::{GenerateReportsRequest, GenerateReportsResponse, ListReportsQuery, WeeklyReportResponse},
    },
    auth::permissions::{RequiresPermission, can_read_all_resources, operation, resource},
    db::{
        errors::DbError,
        handlers::{WeeklyReports, reports::ReportFilter},
        models::activity::ActivityLogCreateDBRequest,
    },
    errors::{Error, Result},
    planning::week_start_for,
    types::{ReportId, Resource},
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{Days, Utc};
use tracing::info;

/// Reports always cover Monday to Sunday, independent of the shorts week setting.
const REPORT_WEEK_STARTS_ON: u8 = 1;

#[utoipa::path(
    post,
    path = "/reports/weekly/generate",
    tag = "reports",
    summary = "Generate weekly reports",
    description = "Aggregates tasks completed in the week into one report per editor. Re-running refreshes the figures \
                   and keeps each report's payment status.",
    request_body = GenerateReportsRequest,
    responses(
        (status = 200, description = "Reports for the week", body = GenerateReportsResponse),
        (status = 403, description = "Admins only"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn generate_reports(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Reports, operation::CreateAll>,
    body: Option<Json<GenerateReportsRequest>>,
) -> Result<Json<GenerateReportsResponse>> {
    let requested = body.and_then(|Json(b)| b.week_start).unwrap_or_else(|| Utc::now().date_naive());
    let week_start = week_start_for(requested, REPORT_WEEK_STARTS_ON);
    let week_end = week_start + Days::new(6);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = WeeklyReports::new(&mut conn);
    let written = repo.generate(week_start, week_end).await?;
    let reports = repo.list_for_week(week_start).await?;
    info!(%week_start, written, "Generated weekly reports");

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("generate")
                .entity_type("weekly_report")
                .entity_name(week_start.to_string())
                .details(serde_json::json!({ "reports": reports.len() }))
                .build(),
        )
        .await;

    Ok(Json(GenerateReportsResponse {
        week_start,
        week_end,
        reports: reports.into_iter().map(WeeklyReportResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/reports/weekly",
    tag = "reports",
    summary = "List weekly reports",
    description = "Newest week first. Editors only see their own.",
    params(ListReportsQuery),
    responses(
        (status = 200, description = "Paginated list of reports", body = PaginatedResponse<WeeklyReportResponse>),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ListReportsQuery>,
    current_user: RequiresPermission<resource::Reports, operation::ReadOwn>,
) -> Result<Json<PaginatedResponse<WeeklyReportResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = ReportFilter::new(skip, limit);
    filter.status = query.status;
    filter.editor_id = if can_read_all_resources(&current_user, Resource::Reports) {
        query.editor_id
    } else {
        Some(current_user.id)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = WeeklyReports::new(&mut conn);
    let reports = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        reports.into_iter().map(WeeklyReportResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    post,
    path = "/reports/weekly/{report_id}/mark-paid",
    tag = "reports",
    summary = "Mark weekly report paid",
    description = "Marking an already paid report changes nothing.",
    params(("report_id" = uuid::Uuid, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report marked paid", body = WeeklyReportResponse),
        (status = 404, description = "Report not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn mark_report_paid(
    State(state): State<AppState>,
    Path(report_id): Path<ReportId>,
    current_user: RequiresPermission<resource::Reports, operation::UpdateAll>,
) -> Result<Json<WeeklyReportResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let report = WeeklyReports::new(&mut conn).mark_paid(report_id).await.map_err(|e| match e {
        DbError::NotFound => Error::NotFound {
            resource: "Report".to_string(),
            id: report_id.to_string(),
        },
        other => other.into(),
    })?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("mark_paid")
                .entity_type("weekly_report")
                .entity_id(report.id)
                .entity_name(format!("{} ({})", report.editor_name, report.week_start))
                .build(),
        )
        .await;

    Ok(Json(WeeklyReportResponse::from(report)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::projects::ProjectDetailResponse;
    use crate::api::models::reports::ReportStatus;
    use crate::api::models::tasks::TaskResponse;
    use crate::test_utils::{auth_header, create_test_admin, create_test_app, create_test_editor};
    use axum::http::StatusCode;
    use rust_decimal::Decimal;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_generate_and_pay_reports(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let editor = create_test_editor(&pool).await;
        let other_editor = create_test_editor(&pool).await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&admin);

        let project: ProjectDetailResponse = server
            .post("/admin/api/v1/projects")
            .add_header(name.clone(), value.clone())
            .json(&json!({"title": "Launch reels", "editor_id": editor.id, "content_quantity": 4}))
            .await
            .json();
        for (title, amount) in [("Cut", "120"), ("Grade", "80")] {
            let task: TaskResponse = server
                .post("/admin/api/v1/tasks")
                .add_header(name.clone(), value.clone())
                .json(&json!({"project_id": project.project.id, "title": title, "payment_amount": amount}))
                .await
                .json();
            server
                .patch(&format!("/admin/api/v1/tasks/{}", task.id))
                .add_header(name.clone(), value.clone())
                .json(&json!({"status": "completed"}))
                .await
                .assert_status_ok();
        }

        let generated: GenerateReportsResponse = server
            .post("/admin/api/v1/reports/weekly/generate")
            .add_header(name.clone(), value.clone())
            .json(&json!({}))
            .await
            .json();
        assert_eq!(generated.week_end, generated.week_start + Days::new(6));
        assert_eq!(generated.reports.len(), 1);
        let report = &generated.reports[0];
        assert_eq!(report.editor_id, editor.id);
        assert_eq!(report.total_tasks, 2);
        assert_eq!(report.total_videos, 4);
        assert_eq!(report.total_payment, Decimal::new(200, 0));
        assert_eq!(report.payment_status, ReportStatus::Pending);

        let paid: WeeklyReportResponse = server
            .post(&format!("/admin/api/v1/reports/weekly/{}/mark-paid", report.id))
            .add_header(name.clone(), value.clone())
            .await
            .json();
        assert_eq!(paid.payment_status, ReportStatus::Paid);
        let paid_at = paid.paid_at.unwrap();

        let again: WeeklyReportResponse = server
            .post(&format!("/admin/api/v1/reports/weekly/{}/mark-paid", report.id))
            .add_header(name.clone(), value.clone())
            .await
            .json();
        assert_eq!(again.paid_at, Some(paid_at));

        // Regenerating keeps the payment status
        let regenerated: GenerateReportsResponse = server
            .post("/admin/api/v1/reports/weekly/generate")
            .add_header(name.clone(), value.clone())
            .await
            .json();
        assert_eq!(regenerated.reports[0].id, report.id);
        assert_eq!(regenerated.reports[0].payment_status, ReportStatus::Paid);

        let (other_name, other_value) = auth_header(&other_editor);
        let theirs: PaginatedResponse<WeeklyReportResponse> = server
            .get(&format!("/admin/api/v1/reports/weekly?editor_id={}", editor.id))
            .add_header(other_name.clone(), other_value.clone())
            .await
            .json();
        assert_eq!(theirs.total_count, 0);
        server
            .post("/admin/api/v1/reports/weekly/generate")
            .add_header(other_name, other_value)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let (editor_name, editor_value) = auth_header(&editor);
        let own: PaginatedResponse<WeeklyReportResponse> = server
            .get("/admin/api/v1/reports/weekly?status=paid")
            .add_header(editor_name, editor_value)
            .await
            .json();
        assert_eq!(own.total_count, 1);
    }

    #[sqlx::test]
    async fn test_mark_unknown_report(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&admin);

        server
            .post(&format!("/admin/api/v1/reports/weekly/{}/mark-paid", uuid::Uuid::new_v4()))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
