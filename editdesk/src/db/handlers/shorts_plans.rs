//! Database repository for shorts plans.

use crate::api::models::shorts::PlanStatus;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::shorts::{PlanCreateDBRequest, PlanDBResponse, PlanUpdateDBRequest},
};
use crate::types::{ClientId, PlanId, UserId, abbrev_uuid};
use chrono::NaiveDate;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

const PLAN_SELECT: &str = r#"
    SELECT sp.*, c.name AS client_name, u.full_name AS editor_name
    FROM shorts_plans sp
    JOIN clients c ON c.id = sp.client_id
    JOIN users u ON u.id = sp.editor_id
"#;

#[derive(Debug, Clone, Default)]
pub struct PlanFilter {
    pub skip: i64,
    pub limit: i64,
    pub status: Option<PlanStatus>,
    pub editor_id: Option<UserId>,
    pub client_id: Option<ClientId>,
}

impl PlanFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    fn push_conditions(&self, query: &mut QueryBuilder<'_, Postgres>) {
        if let Some(status) = self.status {
            query.push(" AND sp.status = ");
            query.push_bind(status);
        }
        if let Some(editor_id) = self.editor_id {
            query.push(" AND sp.editor_id = ");
            query.push_bind(editor_id);
        }
        if let Some(client_id) = self.client_id {
            query.push(" AND sp.client_id = ");
            query.push_bind(client_id);
        }
    }
}

pub struct ShortsPlans<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for ShortsPlans<'c> {
    type CreateRequest = PlanCreateDBRequest;
    type UpdateRequest = PlanUpdateDBRequest;
    type Response = PlanDBResponse;
    type Id = PlanId;
    type Filter = PlanFilter;

    #[instrument(skip(self, request), fields(client_id = %abbrev_uuid(&request.client_id), editor_id = %abbrev_uuid(&request.editor_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let plan = sqlx::query_as::<_, PlanDBResponse>(
            r#"
            WITH sp AS (
                INSERT INTO shorts_plans (id, client_id, editor_id, shorts_per_day, active_days,
                                          weekly_rate_client, weekly_rate_editor, payment_mode,
                                          start_date, currency, timezone)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING *
            )
            SELECT sp.*, c.name AS client_name, u.full_name AS editor_name
            FROM sp
            JOIN clients c ON c.id = sp.client_id
            JOIN users u ON u.id = sp.editor_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.client_id)
        .bind(request.editor_id)
        .bind(request.shorts_per_day)
        .bind(&request.active_days)
        .bind(request.weekly_rate_client)
        .bind(request.weekly_rate_editor)
        .bind(request.payment_mode)
        .bind(request.start_date)
        .bind(&request.currency)
        .bind(&request.timezone)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(plan)
    }

    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let mut query = QueryBuilder::new(PLAN_SELECT);
        query.push(" WHERE sp.id = ");
        query.push_bind(id);
        let plan = query.build_query_as::<PlanDBResponse>().fetch_optional(&mut *self.db).await?;
        Ok(plan)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<PlanId>) -> Result<HashMap<Self::Id, PlanDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut query = QueryBuilder::new(PLAN_SELECT);
        query.push(" WHERE sp.id = ANY(");
        query.push_bind(ids);
        query.push(")");
        let plans = query.build_query_as::<PlanDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(plans.into_iter().map(|p| (p.id, p)).collect())
    }

    /// Newest first.
    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new(PLAN_SELECT);
        query.push(" WHERE 1=1");
        filter.push_conditions(&mut query);
        query.push(" ORDER BY sp.created_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let plans = query.build_query_as::<PlanDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(plans)
    }

    /// Removes the plan with its tasks and closures.
    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM shorts_plans WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(plan_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let plan = sqlx::query_as::<_, PlanDBResponse>(
            r#"
            WITH sp AS (
                UPDATE shorts_plans SET
                    status = COALESCE($2, status),
                    shorts_per_day = COALESCE($3, shorts_per_day),
                    active_days = COALESCE($4, active_days),
                    weekly_rate_client = COALESCE($5, weekly_rate_client),
                    weekly_rate_editor = COALESCE($6, weekly_rate_editor),
                    payment_mode = COALESCE($7, payment_mode),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT sp.*, c.name AS client_name, u.full_name AS editor_name
            FROM sp
            JOIN clients c ON c.id = sp.client_id
            JOIN users u ON u.id = sp.editor_id
            "#,
        )
        .bind(id)
        .bind(request.status)
        .bind(request.shorts_per_day)
        .bind(&request.active_days)
        .bind(request.weekly_rate_client)
        .bind(request.weekly_rate_editor)
        .bind(request.payment_mode)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(plan)
    }
}

impl<'c> ShortsPlans<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &PlanFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM shorts_plans sp WHERE 1=1");
        filter.push_conditions(&mut query);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// Active plans that have started by `date`, for the background generator.
    #[instrument(skip(self), err)]
    pub async fn list_active_started_by(&mut self, date: NaiveDate) -> Result<Vec<PlanDBResponse>> {
        let mut query = QueryBuilder::new(PLAN_SELECT);
        query.push(" WHERE sp.status = 'active' AND sp.start_date <= ");
        query.push_bind(date);
        query.push(" ORDER BY sp.created_at ASC");
        let plans = query.build_query_as::<PlanDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(plans)
    }

    /// The editor's oldest active plan.
    #[instrument(skip(self), fields(editor_id = %abbrev_uuid(&editor_id)), err)]
    pub async fn first_active_for_editor(&mut self, editor_id: UserId) -> Result<Option<PlanDBResponse>> {
        let mut query = QueryBuilder::new(PLAN_SELECT);
        query.push(" WHERE sp.status = 'active' AND sp.editor_id = ");
        query.push_bind(editor_id);
        query.push(" ORDER BY sp.created_at ASC LIMIT 1");
        let plan = query.build_query_as::<PlanDBResponse>().fetch_optional(&mut *self.db).await?;
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::shorts::PlanPaymentMode;
    use crate::test_utils::{create_test_client, create_test_editor};
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    fn plan_request(client_id: ClientId, editor_id: UserId, start_date: NaiveDate) -> PlanCreateDBRequest {
        PlanCreateDBRequest {
            client_id,
            editor_id,
            shorts_per_day: 2,
            active_days: vec![1, 3, 5],
            weekly_rate_client: Decimal::new(300, 0),
            weekly_rate_editor: Decimal::new(150, 0),
            payment_mode: PlanPaymentMode::Fixed,
            start_date,
            currency: "USD".to_string(),
            timezone: "America/Argentina/Buenos_Aires".to_string(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_joins_names(pool: PgPool) {
        let editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = ShortsPlans::new(&mut conn);

        let plan = repo.create(&plan_request(client.id, editor.id, date(2025, 6, 2))).await.unwrap();
        assert_eq!(plan.client_name, "Acme Media");
        assert_eq!(plan.editor_name, editor.full_name);
        assert_eq!(plan.status, PlanStatus::Active);
        assert_eq!(plan.active_days, vec![1, 3, 5]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_and_active_lookups(pool: PgPool) {
        let editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = ShortsPlans::new(&mut conn);

        let plan = repo.create(&plan_request(client.id, editor.id, date(2025, 6, 2))).await.unwrap();
        assert_eq!(repo.list_active_started_by(date(2025, 6, 1)).await.unwrap().len(), 0);
        assert_eq!(repo.list_active_started_by(date(2025, 6, 8)).await.unwrap().len(), 1);

        let paused = repo
            .update(
                plan.id,
                &PlanUpdateDBRequest {
                    status: Some(PlanStatus::Paused),
                    shorts_per_day: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(paused.shorts_per_day, 3);
        assert_eq!(paused.active_days, vec![1, 3, 5]);
        assert!(repo.first_active_for_editor(editor.id).await.unwrap().is_none());
        assert!(repo.list_active_started_by(date(2025, 6, 8)).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_invalid_active_days_rejected_by_database(pool: PgPool) {
        let editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let mut conn = pool.acquire().await.unwrap();

        let mut request = plan_request(client.id, editor.id, date(2025, 6, 2));
        request.active_days = vec![];
        let err = ShortsPlans::new(&mut conn).create(&request).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }
}
