use crate::{
    AppState,
    activity::client_ip,
    api::models::{
        clients::{ClientCreate, ClientResponse, ClientUpdate, ListClientsQuery},
        pagination::PaginatedResponse,
    },
    auth::permissions::{RequiresPermission, operation, resource},
    db::{
        handlers::{Clients, Repository, clients::ClientFilter},
        models::{
            activity::ActivityLogCreateDBRequest,
            clients::{ClientCreateDBRequest, ClientUpdateDBRequest},
        },
    },
    errors::{Error, Result},
    types::ClientId,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};

fn client_not_found(id: ClientId) -> Error {
    Error::NotFound {
        resource: "Client".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/clients",
    tag = "clients",
    summary = "List clients",
    params(ListClientsQuery),
    responses(
        (status = 200, description = "Paginated list of clients", body = PaginatedResponse<ClientResponse>),
        (status = 403, description = "Forbidden"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<ListClientsQuery>,
    _: RequiresPermission<resource::Clients, operation::ReadAll>,
) -> Result<Json<PaginatedResponse<ClientResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = ClientFilter::new(skip, limit).including_inactive(query.include_inactive.unwrap_or(false));
    if let Some(search) = query.search.filter(|s| !s.trim().is_empty()) {
        filter = filter.with_search(search);
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Clients::new(&mut conn);
    let clients = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        clients.into_iter().map(ClientResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    post,
    path = "/clients",
    tag = "clients",
    summary = "Create client",
    request_body = ClientCreate,
    responses(
        (status = 201, description = "Client created", body = ClientResponse),
        (status = 400, description = "Invalid request"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    current_user: RequiresPermission<resource::Clients, operation::CreateAll>,
    Json(create): Json<ClientCreate>,
) -> Result<(StatusCode, Json<ClientResponse>)> {
    if create.name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Client name is required".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let client = Clients::new(&mut conn).create(&ClientCreateDBRequest::from(create)).await?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("create")
                .entity_type("client")
                .entity_id(client.id)
                .entity_name(client.name.clone())
                .maybe_ip_address(client_ip(&headers))
                .build(),
        )
        .await;

    Ok((StatusCode::CREATED, Json(ClientResponse::from(client))))
}

#[utoipa::path(
    get,
    path = "/clients/{client_id}",
    tag = "clients",
    summary = "Get client",
    params(("client_id" = uuid::Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client details", body = ClientResponse),
        (status = 404, description = "Client not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_client(
    State(state): State<AppState>,
    Path(client_id): Path<ClientId>,
    _: RequiresPermission<resource::Clients, operation::ReadAll>,
) -> Result<Json<ClientResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let client = Clients::new(&mut conn)
        .get_by_id(client_id)
        .await?
        .ok_or_else(|| client_not_found(client_id))?;

    Ok(Json(ClientResponse::from(client)))
}

#[utoipa::path(
    patch,
    path = "/clients/{client_id}",
    tag = "clients",
    summary = "Update client",
    request_body = ClientUpdate,
    params(("client_id" = uuid::Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client updated", body = ClientResponse),
        (status = 404, description = "Client not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_client(
    State(state): State<AppState>,
    Path(client_id): Path<ClientId>,
    headers: HeaderMap,
    current_user: RequiresPermission<resource::Clients, operation::UpdateAll>,
    Json(update): Json<ClientUpdate>,
) -> Result<Json<ClientResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let client = Clients::new(&mut conn)
        .update(client_id, &ClientUpdateDBRequest::from(update))
        .await
        .map_err(|e| match e {
            crate::db::errors::DbError::NotFound => client_not_found(client_id),
            other => other.into(),
        })?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("update")
                .entity_type("client")
                .entity_id(client.id)
                .entity_name(client.name.clone())
                .maybe_ip_address(client_ip(&headers))
                .build(),
        )
        .await;

    Ok(Json(ClientResponse::from(client)))
}

#[utoipa::path(
    delete,
    path = "/clients/{client_id}",
    tag = "clients",
    summary = "Deactivate client",
    params(("client_id" = uuid::Uuid, Path, description = "Client ID")),
    responses(
        (status = 204, description = "Client deactivated"),
        (status = 404, description = "Client not found"),
    ),
    security(("CookieAuth" = []), ("X-Editdesk-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_client(
    State(state): State<AppState>,
    Path(client_id): Path<ClientId>,
    headers: HeaderMap,
    current_user: RequiresPermission<resource::Clients, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !Clients::new(&mut conn).delete(client_id).await? {
        return Err(client_not_found(client_id));
    }

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(current_user.id)
                .action("deactivate")
                .entity_type("client")
                .entity_id(client_id)
                .maybe_ip_address(client_ip(&headers))
                .build(),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
