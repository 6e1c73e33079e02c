//! Database repository for the activity log.

use crate::db::{
    errors::Result,
    models::activity::{ActivityLogCreateDBRequest, ActivityLogDBResponse},
};
use crate::types::UserId;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub skip: i64,
    pub limit: i64,
    pub user_id: Option<UserId>,
    pub entity_type: Option<String>,
    pub action: Option<String>,
}

impl ActivityFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    fn push_conditions(&self, query: &mut QueryBuilder<'_, Postgres>) {
        if let Some(user_id) = self.user_id {
            query.push(" AND a.user_id = ");
            query.push_bind(user_id);
        }
        if let Some(ref entity_type) = self.entity_type {
            query.push(" AND a.entity_type = ");
            query.push_bind(entity_type.clone());
        }
        if let Some(ref action) = self.action {
            query.push(" AND a.action = ");
            query.push_bind(action.clone());
        }
    }
}

pub struct ActivityLogs<'c> {
    db: &'c mut PgConnection,
}

impl<'c> ActivityLogs<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(action = %request.action, entity_type = ?request.entity_type), err)]
    pub async fn create(&mut self, request: &ActivityLogCreateDBRequest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_logs (id, user_id, action, entity_type, entity_id, entity_name, details, ip_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(&request.action)
        .bind(&request.entity_type)
        .bind(request.entity_id)
        .bind(&request.entity_name)
        .bind(&request.details)
        .bind(&request.ip_address)
        .execute(&mut *self.db)
        .await?;
        Ok(())
    }

    /// Newest first.
    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    pub async fn list(&mut self, filter: &ActivityFilter) -> Result<Vec<ActivityLogDBResponse>> {
        let mut query = QueryBuilder::new(
            "SELECT a.*, u.full_name AS user_name FROM activity_logs a LEFT JOIN users u ON u.id = a.user_id WHERE 1=1",
        );
        filter.push_conditions(&mut query);
        query.push(" ORDER BY a.created_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let entries = query.build_query_as::<ActivityLogDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(entries)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &ActivityFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM activity_logs a WHERE 1=1");
        filter.push_conditions(&mut query);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}
