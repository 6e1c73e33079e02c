//! Database repository for weekly closures.

use crate::api::models::shorts::ClosureStatus;
use crate::db::{
    errors::Result,
    models::shorts::{ClosureDBResponse, ClosureTotals},
};
use crate::types::{ClosureId, PlanId, UserId, abbrev_uuid};
use chrono::NaiveDate;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

const CLOSURE_SELECT: &str = r#"
    SELECT wc.*, u.full_name AS editor_name, c.name AS client_name, sp.currency
    FROM weekly_closures wc
    JOIN shorts_plans sp ON sp.id = wc.plan_id
    JOIN clients c ON c.id = sp.client_id
    JOIN users u ON u.id = wc.editor_id
"#;

#[derive(Debug, Clone, Default)]
pub struct ClosureFilter {
    pub skip: i64,
    pub limit: i64,
    pub plan_id: Option<PlanId>,
    pub editor_id: Option<UserId>,
    pub status: Option<ClosureStatus>,
}

impl ClosureFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    fn push_conditions(&self, query: &mut QueryBuilder<'_, Postgres>) {
        if let Some(plan_id) = self.plan_id {
            query.push(" AND wc.plan_id = ");
            query.push_bind(plan_id);
        }
        if let Some(editor_id) = self.editor_id {
            query.push(" AND wc.editor_id = ");
            query.push_bind(editor_id);
        }
        if let Some(status) = self.status {
            query.push(" AND wc.status = ");
            query.push_bind(status);
        }
    }
}

pub struct WeeklyClosures<'c> {
    db: &'c mut PgConnection,
}

impl<'c> WeeklyClosures<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Open the closure for a plan's week unless one already exists. Returns whether a row was created.
    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&plan_id)), err)]
    pub async fn insert_open(
        &mut self,
        plan_id: PlanId,
        editor_id: UserId,
        week_start: NaiveDate,
        week_end: NaiveDate,
        total_required: i32,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO weekly_closures (id, plan_id, editor_id, week_start_date, week_end_date, total_shorts_required)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (plan_id, week_start_date) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(plan_id)
        .bind(editor_id)
        .bind(week_start)
        .bind(week_end)
        .bind(total_required)
        .execute(&mut *self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(closure_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: ClosureId) -> Result<Option<ClosureDBResponse>> {
        let mut query = QueryBuilder::new(CLOSURE_SELECT);
        query.push(" WHERE wc.id = ");
        query.push_bind(id);
        let closure = query.build_query_as::<ClosureDBResponse>().fetch_optional(&mut *self.db).await?;
        Ok(closure)
    }

    /// Same as `get_by_id`, but takes a row lock for the rest of the transaction.
    #[instrument(skip(self), fields(closure_id = %abbrev_uuid(&id)), err)]
    pub async fn lock(&mut self, id: ClosureId) -> Result<Option<ClosureDBResponse>> {
        let mut query = QueryBuilder::new(CLOSURE_SELECT);
        query.push(" WHERE wc.id = ");
        query.push_bind(id);
        query.push(" FOR UPDATE OF wc");
        let closure = query.build_query_as::<ClosureDBResponse>().fetch_optional(&mut *self.db).await?;
        Ok(closure)
    }

    /// Newest week first.
    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    pub async fn list(&mut self, filter: &ClosureFilter) -> Result<Vec<ClosureDBResponse>> {
        let mut query = QueryBuilder::new(CLOSURE_SELECT);
        query.push(" WHERE 1=1");
        filter.push_conditions(&mut query);
        query.push(" ORDER BY wc.week_start_date DESC, wc.created_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let closures = query.build_query_as::<ClosureDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(closures)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &ClosureFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM weekly_closures wc WHERE 1=1");
        filter.push_conditions(&mut query);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// All closures of a plan, newest week first.
    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&plan_id)), err)]
    pub async fn list_for_plan(&mut self, plan_id: PlanId) -> Result<Vec<ClosureDBResponse>> {
        let mut query = QueryBuilder::new(CLOSURE_SELECT);
        query.push(" WHERE wc.plan_id = ");
        query.push_bind(plan_id);
        query.push(" ORDER BY wc.week_start_date DESC");
        let closures = query.build_query_as::<ClosureDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(closures)
    }

    /// The most recent open week of a plan.
    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&plan_id)), err)]
    pub async fn find_open_for_plan(&mut self, plan_id: PlanId) -> Result<Option<ClosureDBResponse>> {
        let mut query = QueryBuilder::new(CLOSURE_SELECT);
        query.push(" WHERE wc.status = 'open' AND wc.plan_id = ");
        query.push_bind(plan_id);
        query.push(" ORDER BY wc.week_start_date DESC LIMIT 1");
        let closure = query.build_query_as::<ClosureDBResponse>().fetch_optional(&mut *self.db).await?;
        Ok(closure)
    }

    /// The closure whose week contains `date`, if that week was generated.
    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&plan_id)), err)]
    pub async fn find_covering(&mut self, plan_id: PlanId, date: NaiveDate) -> Result<Option<ClosureDBResponse>> {
        let mut query = QueryBuilder::new(CLOSURE_SELECT);
        query.push(" WHERE wc.plan_id = ");
        query.push_bind(plan_id);
        query.push(" AND ");
        query.push_bind(date);
        query.push(" BETWEEN wc.week_start_date AND wc.week_end_date ORDER BY wc.week_start_date DESC LIMIT 1");
        let closure = query.build_query_as::<ClosureDBResponse>().fetch_optional(&mut *self.db).await?;
        Ok(closure)
    }

    /// Store the final totals and move an open closure to `confirmed`.
    /// Returns false when the closure was no longer open.
    #[instrument(skip(self, totals), fields(closure_id = %abbrev_uuid(&id)), err)]
    pub async fn confirm(&mut self, id: ClosureId, totals: &ClosureTotals) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE weekly_closures SET
                total_shorts_completed = $2,
                compliance_percentage = $3,
                editor_payment_amount = $4,
                client_charge_amount = $5,
                status = 'confirmed',
                confirmed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'open'
            "#,
        )
        .bind(id)
        .bind(totals.total_shorts_completed)
        .bind(totals.compliance_percentage)
        .bind(totals.editor_payment_amount)
        .bind(totals.client_charge_amount)
        .execute(&mut *self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move a closure from `from` to `to`. Returns false when its status was no longer `from`.
    #[instrument(skip(self), fields(closure_id = %abbrev_uuid(&id), %from, %to), err)]
    pub async fn transition(&mut self, id: ClosureId, from: ClosureStatus, to: ClosureStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE weekly_closures SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(from)
            .bind(to)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Put a confirmed closure back to `open`, clearing everything but the required total.
    #[instrument(skip(self), fields(closure_id = %abbrev_uuid(&id)), err)]
    pub async fn reopen(&mut self, id: ClosureId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE weekly_closures SET
                total_shorts_completed = 0,
                compliance_percentage = 0,
                editor_payment_amount = 0,
                client_charge_amount = 0,
                status = 'open',
                confirmed_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'confirmed'
            "#,
        )
        .bind(id)
        .execute(&mut *self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
