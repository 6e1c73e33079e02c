//! Database repository for projects.

use crate::api::models::projects::ProjectStatus;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::projects::{ProjectCreateDBRequest, ProjectDBResponse, ProjectUpdateDBRequest},
};
use crate::types::{ClientId, ProjectId, UserId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// Projects joined with client and editor names. Every read goes through this.
const PROJECT_SELECT: &str = r#"
    SELECT p.*, c.name AS client_name, u.full_name AS editor_name
    FROM projects p
    LEFT JOIN clients c ON c.id = p.client_id
    LEFT JOIN users u ON u.id = p.editor_id
"#;

#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub skip: i64,
    pub limit: i64,
    pub status: Option<ProjectStatus>,
    pub client_id: Option<ClientId>,
    pub editor_id: Option<UserId>,
    /// Case-insensitive substring search on title and client name
    pub search: Option<String>,
    /// Half-open `[from, to)` window on `created_at`
    pub created_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl ProjectFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    fn push_conditions(&self, query: &mut QueryBuilder<'_, Postgres>) {
        if let Some(status) = self.status {
            query.push(" AND p.status = ");
            query.push_bind(status);
        }
        if let Some(client_id) = self.client_id {
            query.push(" AND p.client_id = ");
            query.push_bind(client_id);
        }
        if let Some(editor_id) = self.editor_id {
            query.push(" AND p.editor_id = ");
            query.push_bind(editor_id);
        }
        if let Some(ref search) = self.search {
            let pattern = format!("%{}%", search.to_lowercase());
            query.push(" AND (LOWER(p.title) LIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR LOWER(COALESCE(c.name, '')) LIKE ");
            query.push_bind(pattern);
            query.push(")");
        }
        if let Some((from, to)) = self.created_between {
            query.push(" AND p.created_at >= ");
            query.push_bind(from);
            query.push(" AND p.created_at < ");
            query.push_bind(to);
        }
    }
}

pub struct Projects<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Projects<'c> {
    type CreateRequest = ProjectCreateDBRequest;
    type UpdateRequest = ProjectUpdateDBRequest;
    type Response = ProjectDBResponse;
    type Id = ProjectId;
    type Filter = ProjectFilter;

    #[instrument(skip(self, request), fields(title = %request.title), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let project = sqlx::query_as::<_, ProjectDBResponse>(
            r#"
            WITH p AS (
                INSERT INTO projects (id, title, description, client_id, editor_id, template_id, status,
                                      content_type, content_quantity, due_date, billed_amount, editor_payment)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                RETURNING *
            )
            SELECT p.*, c.name AS client_name, u.full_name AS editor_name
            FROM p
            LEFT JOIN clients c ON c.id = p.client_id
            LEFT JOIN users u ON u.id = p.editor_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.client_id)
        .bind(request.editor_id)
        .bind(request.template_id)
        .bind(request.status)
        .bind(&request.content_type)
        .bind(request.content_quantity)
        .bind(request.due_date)
        .bind(request.billed_amount)
        .bind(request.editor_payment)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(project)
    }

    #[instrument(skip(self), fields(project_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let mut query = QueryBuilder::new(PROJECT_SELECT);
        query.push(" WHERE p.id = ");
        query.push_bind(id);
        let project = query.build_query_as::<ProjectDBResponse>().fetch_optional(&mut *self.db).await?;
        Ok(project)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<ProjectId>) -> Result<HashMap<Self::Id, ProjectDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut query = QueryBuilder::new(PROJECT_SELECT);
        query.push(" WHERE p.id = ANY(");
        query.push_bind(ids);
        query.push(")");
        let projects = query.build_query_as::<ProjectDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(projects.into_iter().map(|p| (p.id, p)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new(PROJECT_SELECT);
        query.push(" WHERE 1=1");
        filter.push_conditions(&mut query);
        query.push(" ORDER BY p.created_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let projects = query.build_query_as::<ProjectDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(projects)
    }

    /// Hard delete. Tasks and comments go with the project.
    #[instrument(skip(self), fields(project_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Completing a project stamps `delivered_at` once.
    #[instrument(skip(self, request), fields(project_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let project = sqlx::query_as::<_, ProjectDBResponse>(
            r#"
            WITH p AS (
                UPDATE projects SET
                    title = COALESCE($2, title),
                    description = COALESCE($3, description),
                    client_id = COALESCE($4, client_id),
                    editor_id = COALESCE($5, editor_id),
                    status = COALESCE($6, status),
                    content_type = COALESCE($7, content_type),
                    content_quantity = COALESCE($8, content_quantity),
                    due_date = COALESCE($9, due_date),
                    billed_amount = COALESCE($10, billed_amount),
                    editor_payment = COALESCE($11, editor_payment),
                    payment_received = COALESCE($12, payment_received),
                    payment_made = COALESCE($13, payment_made),
                    billed_by = COALESCE($14, billed_by),
                    paid_by = COALESCE($15, paid_by),
                    delivered_at = CASE
                        WHEN $6 = 'completed'::project_status AND delivered_at IS NULL THEN NOW()
                        ELSE delivered_at
                    END,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT p.*, c.name AS client_name, u.full_name AS editor_name
            FROM p
            LEFT JOIN clients c ON c.id = p.client_id
            LEFT JOIN users u ON u.id = p.editor_id
            "#,
        )
        .bind(id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.client_id)
        .bind(request.editor_id)
        .bind(request.status)
        .bind(&request.content_type)
        .bind(request.content_quantity)
        .bind(request.due_date)
        .bind(request.billed_amount)
        .bind(request.editor_payment)
        .bind(request.payment_received)
        .bind(request.payment_made)
        .bind(request.billed_by)
        .bind(request.paid_by)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(project)
    }
}

impl<'c> Projects<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &ProjectFilter) -> Result<i64> {
        let mut query = QueryBuilder::new(
            "SELECT COUNT(*) FROM projects p LEFT JOIN clients c ON c.id = p.client_id WHERE 1=1",
        );
        filter.push_conditions(&mut query);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// Every project matching the filter, ignoring pagination. Feeds dashboard and inbox.
    #[instrument(skip(self, filter), err)]
    pub async fn list_unpaginated(&mut self, filter: &ProjectFilter) -> Result<Vec<ProjectDBResponse>> {
        let mut query = QueryBuilder::new(PROJECT_SELECT);
        query.push(" WHERE 1=1");
        filter.push_conditions(&mut query);
        query.push(" ORDER BY p.created_at DESC");
        let projects = query.build_query_as::<ProjectDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(projects)
    }
}
