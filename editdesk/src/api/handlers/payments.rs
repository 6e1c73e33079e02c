use crate::{
    AppState,
    activity::client_ip,
    api::models::{
        pagination::PaginatedResponse,
        payments::{EditorBalanceResponse, ListPaymentsQuery, PaymentCreate, PaymentResponse, PaymentType},
    },
    auth::permissions::{RequiresPermission, can_read_all_resources, ensure_owner_or, operation, resource},
    db::{
        handlers::{Payments, payments::PaymentFilter},
        models::{activity::ActivityLogCreateDBRequest, payments::PaymentCreateDBRequest},
    },
    errors::{Error, Result},
    types::{Operation, PaymentId, Resource, UserId},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use rust_decimal::Decimal;

#[utoipa::path(
    get,
    path = "/payments",
    tag = "payments",
    summary = "List payments",
    description = "Newest first. Editors only see payments made to them.",
    params(ListPaymentsQuery),
    responses(
        (status = 200, description = "Paginated list of payments", body = PaginatedResponse<PaymentResponse>),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<ListPaymentsQuery>,
    current_user: RequiresPermission<resource::Payments, operation::ReadOwn>,
) -> Result<Json<PaginatedResponse<PaymentResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = PaymentFilter::new(skip, limit);
    filter.payment_type = query.payment_type;
    filter.project_id = query.project_id;
    filter.editor_id = if can_read_all_resources(&current_user, Resource::Payments) {
        query.editor_id
    } else {
        Some(current_user.id)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Payments::new(&mut conn);
    let payments = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        payments.into_iter().map(PaymentResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    post,
    path = "/payments",
    tag = "payments",
    summary = "Record a payment",
    request_body = PaymentCreate,
    responses(
        (status = 201, description = "Payment recorded", body = PaymentResponse),
        (status = 400, description = "Invalid amount or reference"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    current_user: RequiresPermission<resource::Payments, operation::CreateAll>,
    Json(create): Json<PaymentCreate>,
) -> Result<(StatusCode, Json<PaymentResponse>)> {
    if create.amount <= Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "Payment amount must be greater than zero".to_string(),
        });
    }

    let request = PaymentCreateDBRequest {
        payment_type: create.payment_type,
        amount: create.amount,
        project_id: create.project_id,
        editor_id: create.editor_id,
        closure_id: None,
        payment_method: create.payment_method,
        reference: create.reference,
        notes: create.notes,
        paid_at: create.paid_at,
        created_by: Some(current_user.id),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let payment = Payments::new(&mut conn).create(&request).await?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("create")
                .entity_type("payment")
                .entity_id(payment.id)
                .maybe_entity_name(payment.project_title.clone().or_else(|| payment.editor_name.clone()))
                .details(serde_json::json!({ "payment_type": payment.payment_type, "amount": payment.amount }))
                .maybe_ip_address(client_ip(&headers))
                .build(),
        )
        .await;

    Ok((StatusCode::CREATED, Json(PaymentResponse::from(payment))))
}

#[utoipa::path(
    delete,
    path = "/payments/{payment_id}",
    tag = "payments",
    summary = "Delete payment",
    params(("payment_id" = uuid::Uuid, Path, description = "Payment ID")),
    responses(
        (status = 204, description = "Payment deleted"),
        (status = 400, description = "Payment belongs to a weekly closure"),
        (status = 404, description = "Payment not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<PaymentId>,
    headers: HeaderMap,
    current_user: RequiresPermission<resource::Payments, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Payments::new(&mut conn);
    let payment = repo.get_by_id(payment_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Payment".to_string(),
        id: payment_id.to_string(),
    })?;

    // Closure payments go away by reopening the closure, which keeps its totals consistent
    if payment.closure_id.is_some() {
        return Err(Error::BadRequest {
            message: "This payment belongs to a weekly closure; reopen the closure instead".to_string(),
        });
    }
    repo.delete(payment_id).await?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("delete")
                .entity_type("payment")
                .entity_id(payment_id)
                .details(serde_json::json!({ "payment_type": payment.payment_type, "amount": payment.amount }))
                .maybe_ip_address(client_ip(&headers))
                .build(),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/accounting/editors",
    tag = "payments",
    summary = "Balances of all active editors",
    responses(
        (status = 200, description = "Earned, paid and pending per editor", body = Vec<EditorBalanceResponse>),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_editor_balances(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Payments, operation::ReadAll>,
) -> Result<Json<Vec<EditorBalanceResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let balances = Payments::new(&mut conn).editor_balances(None).await?;

    Ok(Json(balances.into_iter().map(EditorBalanceResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/accounting/editors/{editor_id}",
    tag = "payments",
    summary = "Balance of one editor",
    params(("editor_id" = uuid::Uuid, Path, description = "Editor user ID")),
    responses(
        (status = 200, description = "Earned, paid and pending", body = EditorBalanceResponse),
        (status = 403, description = "Editors may only read their own balance"),
        (status = 404, description = "Editor not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_editor_balance(
    State(state): State<AppState>,
    Path(editor_id): Path<UserId>,
    current_user: RequiresPermission<resource::Payments, operation::ReadOwn>,
) -> Result<Json<EditorBalanceResponse>> {
    ensure_owner_or(&current_user, Resource::Payments, Operation::ReadOwn, Some(editor_id))?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let balance = Payments::new(&mut conn)
        .editor_balances(Some(editor_id))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::NotFound {
            resource: "Editor".to_string(),
            id: editor_id.to_string(),
        })?;

    Ok(Json(EditorBalanceResponse::from(balance)))
}
