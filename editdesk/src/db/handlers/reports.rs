//! Database repository for weekly editor reports.

use crate::api::models::reports::ReportStatus;
use crate::db::{
    errors::{DbError, Result},
    models::reports::WeeklyReportDBResponse,
};
use crate::types::{ReportId, UserId, abbrev_uuid};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

const REPORT_SELECT: &str = r#"
    SELECT wr.*, u.full_name AS editor_name
    FROM weekly_reports wr
    JOIN users u ON u.id = wr.editor_id
"#;

#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub skip: i64,
    pub limit: i64,
    pub editor_id: Option<UserId>,
    pub status: Option<ReportStatus>,
}

impl ReportFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    fn push_conditions(&self, query: &mut QueryBuilder<'_, Postgres>) {
        if let Some(editor_id) = self.editor_id {
            query.push(" AND wr.editor_id = ");
            query.push_bind(editor_id);
        }
        if let Some(status) = self.status {
            query.push(" AND wr.payment_status = ");
            query.push_bind(status);
        }
    }
}

pub struct WeeklyReports<'c> {
    db: &'c mut PgConnection,
}

impl<'c> WeeklyReports<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Aggregate the tasks completed in `[week_start, week_end]` into one report per editor.
    ///
    /// Existing reports for the week are refreshed in place and keep their payment status.
    /// Each distinct project counts its `content_quantity` as videos, at least one.
    #[instrument(skip(self), err)]
    pub async fn generate(&mut self, week_start: NaiveDate, week_end: NaiveDate) -> Result<u64> {
        let from: DateTime<Utc> = week_start.and_time(NaiveTime::MIN).and_utc();
        let until: DateTime<Utc> = (week_end + Days::new(1)).and_time(NaiveTime::MIN).and_utc();

        let result = sqlx::query(
            r#"
            WITH done AS (
                SELECT t.assigned_to AS editor_id, t.project_id, t.payment_amount
                FROM tasks t
                WHERE t.status = 'completed'
                  AND t.assigned_to IS NOT NULL
                  AND t.completed_at >= $3 AND t.completed_at < $4
            ),
            task_totals AS (
                SELECT editor_id, COUNT(*)::INTEGER AS total_tasks, SUM(payment_amount) AS total_payment
                FROM done
                GROUP BY editor_id
            ),
            video_totals AS (
                SELECT d.editor_id, SUM(GREATEST(COALESCE(p.content_quantity, 1), 1))::INTEGER AS total_videos
                FROM (SELECT DISTINCT editor_id, project_id FROM done) d
                JOIN projects p ON p.id = d.project_id
                GROUP BY d.editor_id
            )
            INSERT INTO weekly_reports (id, editor_id, week_start, week_end, total_videos, total_tasks, total_payment)
            SELECT gen_random_uuid(), tt.editor_id, $1, $2, COALESCE(vt.total_videos, 0), tt.total_tasks, tt.total_payment
            FROM task_totals tt
            LEFT JOIN video_totals vt ON vt.editor_id = tt.editor_id
            ON CONFLICT (editor_id, week_start) DO UPDATE SET
                week_end = EXCLUDED.week_end,
                total_videos = EXCLUDED.total_videos,
                total_tasks = EXCLUDED.total_tasks,
                total_payment = EXCLUDED.total_payment
            "#,
        )
        .bind(week_start)
        .bind(week_end)
        .bind(from)
        .bind(until)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), err)]
    pub async fn list_for_week(&mut self, week_start: NaiveDate) -> Result<Vec<WeeklyReportDBResponse>> {
        let mut query = QueryBuilder::new(REPORT_SELECT);
        query.push(" WHERE wr.week_start = ");
        query.push_bind(week_start);
        query.push(" ORDER BY u.full_name ASC");
        let reports = query.build_query_as::<WeeklyReportDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(reports)
    }

    #[instrument(skip(self), fields(report_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: ReportId) -> Result<Option<WeeklyReportDBResponse>> {
        let mut query = QueryBuilder::new(REPORT_SELECT);
        query.push(" WHERE wr.id = ");
        query.push_bind(id);
        let report = query.build_query_as::<WeeklyReportDBResponse>().fetch_optional(&mut *self.db).await?;
        Ok(report)
    }

    /// Newest week first.
    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    pub async fn list(&mut self, filter: &ReportFilter) -> Result<Vec<WeeklyReportDBResponse>> {
        let mut query = QueryBuilder::new(REPORT_SELECT);
        query.push(" WHERE 1=1");
        filter.push_conditions(&mut query);
        query.push(" ORDER BY wr.week_start DESC, u.full_name ASC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let reports = query.build_query_as::<WeeklyReportDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(reports)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &ReportFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM weekly_reports wr WHERE 1=1");
        filter.push_conditions(&mut query);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// Marking an already paid report keeps its original `paid_at`.
    #[instrument(skip(self), fields(report_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_paid(&mut self, id: ReportId) -> Result<WeeklyReportDBResponse> {
        let report = sqlx::query_as::<_, WeeklyReportDBResponse>(
            r#"
            WITH wr AS (
                UPDATE weekly_reports SET
                    payment_status = 'paid',
                    paid_at = COALESCE(paid_at, NOW())
                WHERE id = $1
                RETURNING *
            )
            SELECT wr.*, u.full_name AS editor_name
            FROM wr JOIN users u ON u.id = wr.editor_id
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(report)
    }
}
