use crate::{
    AppState,
    activity::client_ip,
    api::models::{
        inbox::{InboxKind, InboxResponse, parse_item_id},
        projects::ProjectResponse,
    },
    auth::permissions::{RequiresPermission, operation, resource},
    db::{
        handlers::{Projects, Repository, projects::ProjectFilter},
        models::{activity::ActivityLogCreateDBRequest, projects::ProjectUpdateDBRequest},
    },
    errors::{Error, Result},
    insights::derive_inbox,
};
use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use chrono::Utc;

#[utoipa::path(
    get,
    path = "/inbox",
    tag = "inbox",
    summary = "Projects needing attention",
    description = "Overdue work, outstanding payments and projects missing an editor or due date.",
    responses(
        (status = 200, description = "Inbox items with counts", body = InboxResponse),
        (status = 403, description = "Admins only"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_inbox(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Inbox, operation::ReadAll>,
) -> Result<Json<InboxResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let projects = Projects::new(&mut conn).list_unpaginated(&ProjectFilter::default()).await?;

    Ok(Json(derive_inbox(&projects, Utc::now().date_naive())))
}

#[utoipa::path(
    post,
    path = "/inbox/{item_id}/resolve",
    tag = "inbox",
    summary = "Resolve an inbox item",
    description = "Only payment items resolve here; the others go away once the project is edited.",
    params(("item_id" = String, Path, description = "Item ID, `{kind}-{project_id}`")),
    responses(
        (status = 200, description = "Project after resolving", body = ProjectResponse),
        (status = 400, description = "Item cannot be resolved directly"),
        (status = 404, description = "Project not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn resolve_inbox_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
    current_user: RequiresPermission<resource::Inbox, operation::UpdateAll>,
) -> Result<Json<ProjectResponse>> {
    let (kind, project_id) = parse_item_id(&item_id).ok_or_else(|| Error::BadRequest {
        message: format!("Invalid inbox item id: {item_id}"),
    })?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let existing = Projects::new(&mut conn).get_by_id(project_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Project".to_string(),
        id: project_id.to_string(),
    })?;

    let (request, action) = match kind {
        InboxKind::PaymentClient => (
            ProjectUpdateDBRequest {
                payment_received: Some(true),
                billed_by: (!existing.payment_received).then_some(current_user.id),
                ..Default::default()
            },
            "payment_received",
        ),
        InboxKind::PaymentEditor => (
            ProjectUpdateDBRequest {
                payment_made: Some(true),
                paid_by: (!existing.payment_made).then_some(current_user.id),
                ..Default::default()
            },
            "payment_made",
        ),
        other => {
            return Err(Error::BadRequest {
                message: format!("{other} items are resolved by editing the project"),
            });
        }
    };

    let project = Projects::new(&mut conn).update(project_id, &request).await?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action(action)
                .entity_type("project")
                .entity_id(project.id)
                .entity_name(project.title.clone())
                .details(serde_json::json!({ "inbox_item": item_id }))
                .maybe_ip_address(client_ip(&headers))
                .build(),
        )
        .await;

    Ok(Json(ProjectResponse::from(project)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::projects::ProjectDetailResponse;
    use crate::test_utils::{auth_header, create_test_admin, create_test_app, create_test_editor};
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_inbox_items_and_resolution(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let editor = create_test_editor(&pool).await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&admin);

        let created: ProjectDetailResponse = server
            .post("/admin/api/v1/projects")
            .add_header(name.clone(), value.clone())
            .json(&json!({
                "title": "Finished promo",
                "editor_id": editor.id,
                "due_date": "2020-01-10",
                "billed_amount": "900",
                "editor_payment": "350"
            }))
            .await
            .json();
        let project_id = created.project.id;

        let before: InboxResponse = server.get("/admin/api/v1/inbox").add_header(name.clone(), value.clone()).await.json();
        let overdue = before.items.iter().find(|i| i.kind == InboxKind::Overdue).unwrap();
        assert_eq!(overdue.id, format!("overdue-{project_id}"));
        assert!(overdue.days_overdue.unwrap() > 0);
        assert_eq!(before.counts.overdue, 1);
        assert_eq!(before.counts.payments, 0);

        server
            .patch(&format!("/admin/api/v1/projects/{project_id}"))
            .add_header(name.clone(), value.clone())
            .json(&json!({"status": "completed"}))
            .await
            .assert_status_ok();

        let after: InboxResponse = server.get("/admin/api/v1/inbox").add_header(name.clone(), value.clone()).await.json();
        assert_eq!(after.counts.overdue, 0);
        assert_eq!(after.counts.payments, 2);
        let client_item = after.items.iter().find(|i| i.kind == InboxKind::PaymentClient).unwrap();
        assert_eq!(client_item.amount, Some(rust_decimal::Decimal::new(900, 0)));

        // Overdue and missing-field items are not resolvable here
        server
            .post(&format!("/admin/api/v1/inbox/no_editor-{project_id}/resolve"))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .post("/admin/api/v1/inbox/garbage/resolve")
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let resolved: ProjectResponse = server
            .post(&format!("/admin/api/v1/inbox/{}/resolve", client_item.id))
            .add_header(name.clone(), value.clone())
            .await
            .json();
        assert!(resolved.payment_received);
        assert_eq!(resolved.billed_by, Some(admin.id));

        let resolved: ProjectResponse = server
            .post(&format!("/admin/api/v1/inbox/payment_editor-{project_id}/resolve"))
            .add_header(name.clone(), value.clone())
            .await
            .json();
        assert!(resolved.payment_made);
        assert_eq!(resolved.paid_by, Some(admin.id));

        let cleared: InboxResponse = server.get("/admin/api/v1/inbox").add_header(name, value).await.json();
        assert!(cleared.items.is_empty());
    }

    #[sqlx::test]
    async fn test_inbox_is_admin_only(pool: PgPool) {
        let editor = create_test_editor(&pool).await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&editor);

        server.get("/admin/api/v1/inbox").add_header(name, value).await.assert_status(StatusCode::FORBIDDEN);
    }
}
