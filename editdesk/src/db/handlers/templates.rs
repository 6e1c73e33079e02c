//! Database repository for project templates.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::templates::{TemplateCreateDBRequest, TemplateDBResponse, TemplateUpdateDBRequest},
};
use crate::types::{TemplateId, abbrev_uuid};
use sqlx::{PgConnection, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct TemplateFilter {
    pub skip: i64,
    pub limit: i64,
    pub include_inactive: bool,
}

impl TemplateFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            include_inactive: false,
        }
    }

    pub fn including_inactive(mut self, include: bool) -> Self {
        self.include_inactive = include;
        self
    }
}

pub struct Templates<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Templates<'c> {
    type CreateRequest = TemplateCreateDBRequest;
    type UpdateRequest = TemplateUpdateDBRequest;
    type Response = TemplateDBResponse;
    type Id = TemplateId;
    type Filter = TemplateFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let template = sqlx::query_as::<_, TemplateDBResponse>(
            r#"
            INSERT INTO project_templates (id, name, description, default_tasks, default_content_type, default_content_quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.default_tasks)
        .bind(&request.default_content_type)
        .bind(request.default_content_quantity)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(template)
    }

    #[instrument(skip(self), fields(template_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let template = sqlx::query_as::<_, TemplateDBResponse>("SELECT * FROM project_templates WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(template)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<TemplateId>) -> Result<HashMap<Self::Id, TemplateDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let templates = sqlx::query_as::<_, TemplateDBResponse>("SELECT * FROM project_templates WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(templates.into_iter().map(|t| (t.id, t)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT * FROM project_templates WHERE 1=1");
        if !filter.include_inactive {
            query.push(" AND is_active");
        }
        query.push(" ORDER BY name LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let templates = query.build_query_as::<TemplateDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(templates)
    }

    #[instrument(skip(self), fields(template_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("UPDATE project_templates SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(template_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let template = sqlx::query_as::<_, TemplateDBResponse>(
            r#"
            UPDATE project_templates SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                default_tasks = COALESCE($4, default_tasks),
                default_content_type = COALESCE($5, default_content_type),
                default_content_quantity = COALESCE($6, default_content_quantity),
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.default_tasks)
        .bind(&request.default_content_type)
        .bind(request.default_content_quantity)
        .bind(request.is_active)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(template)
    }
}

impl<'c> Templates<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &TemplateFilter) -> Result<i64> {
        let sql = if filter.include_inactive {
            "SELECT COUNT(*) FROM project_templates"
        } else {
            "SELECT COUNT(*) FROM project_templates WHERE is_active"
        };
        let count: i64 = sqlx::query_scalar(sql).fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}
