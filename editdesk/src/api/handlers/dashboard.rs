use crate::{
    AppState,
    api::models::{
        dashboard::{DashboardQuery, DashboardResponse, EditorDashboardResponse},
        users::Role,
    },
    auth::permissions::{RequiresPermission, operation, resource},
    db::handlers::{Clients, Projects, Tasks, Users, clients::ClientFilter, projects::ProjectFilter},
    errors::{Error, Result},
    insights::{DashboardCounts, DateFilter, compute_dashboard, compute_editor_dashboard},
};
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;

#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "dashboard",
    summary = "Business dashboard",
    description = "Revenue, payouts and rankings over projects created in the chosen window. \
                   Active projects and the monthly series always cover every project.",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Dashboard figures", body = DashboardResponse),
        (status = 403, description = "Admins only"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
    _: RequiresPermission<resource::Dashboard, operation::ReadAll>,
) -> Result<Json<DashboardResponse>> {
    let now = Utc::now();
    let window = DateFilter::from_parts(query.filter, query.from, query.to).range(now);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let all = Projects::new(&mut conn).list_unpaginated(&ProjectFilter::default()).await?;
    let filtered: Vec<_> = match window {
        Some((start, end)) => all
            .iter()
            .filter(|p| p.created_at >= start && p.created_at < end)
            .cloned()
            .collect(),
        None => all.clone(),
    };

    let counts = DashboardCounts {
        clients: Clients::new(&mut conn).count(&ClientFilter::default()).await?,
        editors: Users::new(&mut conn).count_active_with_role(Role::Editor).await?,
        pending_tasks: Tasks::new(&mut conn).count_open(None).await?,
    };

    Ok(Json(compute_dashboard(&filtered, &all, counts, now.date_naive())))
}

#[utoipa::path(
    get,
    path = "/dashboard/editor",
    tag = "dashboard",
    summary = "Editor dashboard",
    description = "The caller's pending tasks, active projects and payout status.",
    responses(
        (status = 200, description = "Editor figures", body = EditorDashboardResponse),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_editor_dashboard(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Dashboard, operation::ReadOwn>,
) -> Result<Json<EditorDashboardResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let filter = ProjectFilter {
        editor_id: Some(current_user.id),
        ..Default::default()
    };
    let projects = Projects::new(&mut conn).list_unpaginated(&filter).await?;
    let pending = Tasks::new(&mut conn).count_open(Some(current_user.id)).await?;

    Ok(Json(compute_editor_dashboard(&projects, pending)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::projects::ProjectDetailResponse;
    use crate::test_utils::{auth_header, create_test_admin, create_test_app, create_test_client, create_test_editor};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rust_decimal::Decimal;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    async fn create_project(server: &TestServer, auth: &(String, String), body: Value) -> ProjectDetailResponse {
        let response = server.post("/admin/api/v1/projects").add_header(auth.0.clone(), auth.1.clone()).json(&body).await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    #[sqlx::test]
    async fn test_dashboard_totals(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let server = create_test_app(pool);
        let auth = auth_header(&admin);

        let paid = create_project(
            &server,
            &auth,
            json!({
                "title": "Paid wedding",
                "client_id": client.id,
                "editor_id": editor.id,
                "billed_amount": "1000",
                "editor_payment": "400"
            }),
        )
        .await;
        server
            .patch(&format!("/admin/api/v1/projects/{}", paid.project.id))
            .add_header(auth.0.clone(), auth.1.clone())
            .json(&json!({"status": "completed", "payment_received": true, "payment_made": true}))
            .await
            .assert_status_ok();
        create_project(&server, &auth, json!({"title": "Open reel", "billed_amount": "250"})).await;
        server
            .post("/admin/api/v1/tasks")
            .add_header(auth.0.clone(), auth.1.clone())
            .json(&json!({"project_id": paid.project.id, "title": "Color pass"}))
            .await
            .assert_status(StatusCode::CREATED);

        let dashboard: DashboardResponse = server
            .get("/admin/api/v1/dashboard?filter=month")
            .add_header(auth.0.clone(), auth.1.clone())
            .await
            .json();
        assert_eq!(dashboard.total_revenue, Decimal::new(1000, 0));
        assert_eq!(dashboard.total_payments, Decimal::new(400, 0));
        assert_eq!(dashboard.net_profit, Decimal::new(600, 0));
        assert_eq!(dashboard.clients_count, 1);
        assert_eq!(dashboard.editors_count, 1);
        assert_eq!(dashboard.active_projects, 1);
        assert_eq!(dashboard.pending_tasks, 1);
        assert_eq!(dashboard.top_clients[0].name, "Acme Media");
        assert_eq!(dashboard.top_editors[0].payments, Decimal::new(400, 0));
        assert_eq!(dashboard.monthly.len(), 6);

        // A window with no projects still counts active work over everything
        let empty: DashboardResponse = server
            .get("/admin/api/v1/dashboard?filter=custom&from=2001-01-01&to=2001-01-31")
            .add_header(auth.0.clone(), auth.1.clone())
            .await
            .json();
        assert_eq!(empty.total_revenue, Decimal::ZERO);
        assert_eq!(empty.active_projects, 1);
        assert!(empty.top_clients.is_empty());
    }

    #[sqlx::test]
    async fn test_editor_dashboard(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let editor = create_test_editor(&pool).await;
        let server = create_test_app(pool);
        let admin_auth = auth_header(&admin);
        let editor_auth = auth_header(&editor);

        let done = create_project(
            &server,
            &admin_auth,
            json!({"title": "Delivered", "editor_id": editor.id, "editor_payment": "300"}),
        )
        .await;
        server
            .patch(&format!("/admin/api/v1/projects/{}", done.project.id))
            .add_header(admin_auth.0.clone(), admin_auth.1.clone())
            .json(&json!({"status": "completed"}))
            .await
            .assert_status_ok();
        create_project(
            &server,
            &admin_auth,
            json!({"title": "In progress", "editor_id": editor.id, "editor_payment": "150"}),
        )
        .await;

        let figures: EditorDashboardResponse = server
            .get("/admin/api/v1/dashboard/editor")
            .add_header(editor_auth.0.clone(), editor_auth.1.clone())
            .await
            .json();
        assert_eq!(figures.active_projects, 1);
        assert_eq!(figures.unpaid_amount, Decimal::new(300, 0));
        assert_eq!(figures.paid_amount, Decimal::ZERO);

        server
            .get("/admin/api/v1/dashboard")
            .add_header(editor_auth.0, editor_auth.1)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
