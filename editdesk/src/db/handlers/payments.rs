//! Database repository for payments and editor balances.

use crate::api::models::payments::PaymentType;
use crate::db::{
    errors::Result,
    models::payments::{EditorBalanceDBResponse, PaymentCreateDBRequest, PaymentDBResponse},
};
use crate::types::{ClosureId, PaymentId, ProjectId, UserId, abbrev_uuid};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

const PAYMENT_SELECT: &str = r#"
    SELECT pay.*, p.title AS project_title, u.full_name AS editor_name
    FROM payments pay
    LEFT JOIN projects p ON p.id = pay.project_id
    LEFT JOIN users u ON u.id = pay.editor_id
"#;

#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub skip: i64,
    pub limit: i64,
    pub payment_type: Option<PaymentType>,
    pub project_id: Option<ProjectId>,
    pub editor_id: Option<UserId>,
}

impl PaymentFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    fn push_conditions(&self, query: &mut QueryBuilder<'_, Postgres>) {
        if let Some(payment_type) = self.payment_type {
            query.push(" AND pay.payment_type = ");
            query.push_bind(payment_type);
        }
        if let Some(project_id) = self.project_id {
            query.push(" AND pay.project_id = ");
            query.push_bind(project_id);
        }
        if let Some(editor_id) = self.editor_id {
            query.push(" AND pay.editor_id = ");
            query.push_bind(editor_id);
        }
    }
}

pub struct Payments<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Payments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(payment_type = ?request.payment_type, amount = %request.amount), err)]
    pub async fn create(&mut self, request: &PaymentCreateDBRequest) -> Result<PaymentDBResponse> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>(
            r#"
            WITH pay AS (
                INSERT INTO payments (id, payment_type, amount, project_id, editor_id, closure_id,
                                      payment_method, reference, notes, paid_at, created_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, NOW()), $11)
                RETURNING *
            )
            SELECT pay.*, p.title AS project_title, u.full_name AS editor_name
            FROM pay
            LEFT JOIN projects p ON p.id = pay.project_id
            LEFT JOIN users u ON u.id = pay.editor_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.payment_type)
        .bind(request.amount)
        .bind(request.project_id)
        .bind(request.editor_id)
        .bind(request.closure_id)
        .bind(&request.payment_method)
        .bind(&request.reference)
        .bind(&request.notes)
        .bind(request.paid_at)
        .bind(request.created_by)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(payment)
    }

    #[instrument(skip(self), fields(payment_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: PaymentId) -> Result<Option<PaymentDBResponse>> {
        let mut query = QueryBuilder::new(PAYMENT_SELECT);
        query.push(" WHERE pay.id = ");
        query.push_bind(id);
        let payment = query.build_query_as::<PaymentDBResponse>().fetch_optional(&mut *self.db).await?;
        Ok(payment)
    }

    /// Most recent first.
    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    pub async fn list(&mut self, filter: &PaymentFilter) -> Result<Vec<PaymentDBResponse>> {
        let mut query = QueryBuilder::new(PAYMENT_SELECT);
        query.push(" WHERE 1=1");
        filter.push_conditions(&mut query);
        query.push(" ORDER BY pay.paid_at DESC, pay.created_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let payments = query.build_query_as::<PaymentDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(payments)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &PaymentFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM payments pay WHERE 1=1");
        filter.push_conditions(&mut query);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(payment_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, id: PaymentId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove the payments a closure confirmation created, returning how many went.
    #[instrument(skip(self), fields(closure_id = %abbrev_uuid(&closure_id)), err)]
    pub async fn delete_for_closure(&mut self, closure_id: ClosureId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM payments WHERE closure_id = $1")
            .bind(closure_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected())
    }

    /// Balance per active editor, or for a single editor when `editor_id` is given.
    ///
    /// Earnings are completed task amounts plus editor payouts of confirmed shorts closures.
    /// Paid is the sum of expense payments addressed to the editor.
    #[instrument(skip(self), err)]
    pub async fn editor_balances(&mut self, editor_id: Option<UserId>) -> Result<Vec<EditorBalanceDBResponse>> {
        let balances = sqlx::query_as::<_, EditorBalanceDBResponse>(
            r#"
            SELECT
                u.id AS editor_id,
                u.username,
                u.full_name,
                COALESCE(t.task_earnings, 0) + COALESCE(wc.closure_earnings, 0) AS earned,
                COALESCE(pay.paid, 0) AS paid,
                COALESCE(t.completed_tasks, 0) AS completed_tasks
            FROM users u
            LEFT JOIN (
                SELECT assigned_to, SUM(payment_amount) AS task_earnings, COUNT(*) AS completed_tasks
                FROM tasks WHERE status = 'completed'
                GROUP BY assigned_to
            ) t ON t.assigned_to = u.id
            LEFT JOIN (
                SELECT editor_id, SUM(editor_payment_amount) AS closure_earnings
                FROM weekly_closures WHERE status <> 'open'
                GROUP BY editor_id
            ) wc ON wc.editor_id = u.id
            LEFT JOIN (
                SELECT editor_id, SUM(amount) AS paid
                FROM payments WHERE payment_type = 'expense'
                GROUP BY editor_id
            ) pay ON pay.editor_id = u.id
            WHERE u.role = 'editor'
              AND ($1::UUID IS NULL OR u.id = $1)
              AND ($1::UUID IS NOT NULL OR u.is_active)
            ORDER BY u.full_name
            "#,
        )
        .bind(editor_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(balances)
    }
}
