//! Database repository for generated shorts tasks.

use crate::api::models::shorts::ShortsTaskStatus;
use crate::db::{
    errors::{DbError, Result},
    models::shorts::{PlanDBResponse, ShortsTaskDBResponse},
};
use crate::planning::ShortDraft;
use crate::types::{PlanId, ShortsTaskId, UserId, abbrev_uuid};
use chrono::NaiveDate;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

/// Postgres caps a statement at 65535 bind parameters; each draft row binds 6.
const INSERT_CHUNK_ROWS: usize = u16::MAX as usize / 6;

const SHORTS_TASK_SELECT: &str = r#"
    SELECT st.*, c.name AS client_name
    FROM shorts_tasks st
    JOIN clients c ON c.id = st.client_id
"#;

#[derive(Debug, Clone, Default)]
pub struct ShortsTaskFilter {
    pub skip: i64,
    pub limit: i64,
    pub plan_id: Option<PlanId>,
    pub editor_id: Option<UserId>,
    pub status: Option<ShortsTaskStatus>,
    /// Inclusive due date bounds
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ShortsTaskFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    fn push_conditions(&self, query: &mut QueryBuilder<'_, Postgres>) {
        if let Some(plan_id) = self.plan_id {
            query.push(" AND st.plan_id = ");
            query.push_bind(plan_id);
        }
        if let Some(editor_id) = self.editor_id {
            query.push(" AND st.editor_id = ");
            query.push_bind(editor_id);
        }
        if let Some(status) = self.status {
            query.push(" AND st.status = ");
            query.push_bind(status);
        }
        if let Some(from) = self.from {
            query.push(" AND st.due_date >= ");
            query.push_bind(from);
        }
        if let Some(to) = self.to {
            query.push(" AND st.due_date <= ");
            query.push_bind(to);
        }
    }
}

pub struct ShortsTasks<'c> {
    db: &'c mut PgConnection,
}

impl<'c> ShortsTasks<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert drafts for a plan, skipping any (due_date, title) the plan already has.
    /// Returns the number of rows actually inserted.
    #[instrument(skip(self, plan, drafts), fields(plan_id = %abbrev_uuid(&plan.id), count = drafts.len()), err)]
    pub async fn insert_drafts(&mut self, plan: &PlanDBResponse, drafts: &[ShortDraft]) -> Result<u64> {
        let mut inserted = 0;
        for chunk in drafts.chunks(INSERT_CHUNK_ROWS) {
            let mut query = QueryBuilder::new("INSERT INTO shorts_tasks (id, plan_id, editor_id, client_id, title, due_date) ");
            query.push_values(chunk, |mut row, draft| {
                row.push_bind(Uuid::new_v4())
                    .push_bind(plan.id)
                    .push_bind(plan.editor_id)
                    .push_bind(plan.client_id)
                    .push_bind(draft.title.clone())
                    .push_bind(draft.due_date);
            });
            query.push(" ON CONFLICT (plan_id, due_date, title) DO NOTHING");
            inserted += query.build().execute(&mut *self.db).await?.rows_affected();
        }
        Ok(inserted)
    }

    #[instrument(skip(self), fields(task_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: ShortsTaskId) -> Result<Option<ShortsTaskDBResponse>> {
        let mut query = QueryBuilder::new(SHORTS_TASK_SELECT);
        query.push(" WHERE st.id = ");
        query.push_bind(id);
        let task = query.build_query_as::<ShortsTaskDBResponse>().fetch_optional(&mut *self.db).await?;
        Ok(task)
    }

    /// Ordered by due date.
    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    pub async fn list(&mut self, filter: &ShortsTaskFilter) -> Result<Vec<ShortsTaskDBResponse>> {
        let mut query = QueryBuilder::new(SHORTS_TASK_SELECT);
        query.push(" WHERE 1=1");
        filter.push_conditions(&mut query);
        query.push(" ORDER BY st.due_date ASC, st.title ASC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let tasks = query.build_query_as::<ShortsTaskDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(tasks)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &ShortsTaskFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM shorts_tasks st WHERE 1=1");
        filter.push_conditions(&mut query);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// Change status and/or proof link. `None` leaves a field untouched.
    #[instrument(skip(self, proof_url), fields(task_id = %abbrev_uuid(&id), status = ?status), err)]
    pub async fn update(
        &mut self,
        id: ShortsTaskId,
        status: Option<ShortsTaskStatus>,
        proof_url: Option<&str>,
    ) -> Result<ShortsTaskDBResponse> {
        let task = sqlx::query_as::<_, ShortsTaskDBResponse>(
            r#"
            WITH st AS (
                UPDATE shorts_tasks SET
                    status = COALESCE($2, status),
                    proof_url = COALESCE($3, proof_url),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT st.*, c.name AS client_name
            FROM st JOIN clients c ON c.id = st.client_id
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(proof_url)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(task)
    }

    /// Record an admin review, setting the resulting status.
    #[instrument(skip(self), fields(task_id = %abbrev_uuid(&id), reviewer = %abbrev_uuid(&reviewer)), err)]
    pub async fn review(&mut self, id: ShortsTaskId, status: ShortsTaskStatus, reviewer: UserId) -> Result<ShortsTaskDBResponse> {
        let task = sqlx::query_as::<_, ShortsTaskDBResponse>(
            r#"
            WITH st AS (
                UPDATE shorts_tasks SET
                    status = $2,
                    reviewed_by = $3,
                    reviewed_at = NOW(),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT st.*, c.name AS client_name
            FROM st JOIN clients c ON c.id = st.client_id
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(reviewer)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(task)
    }

    /// Tasks of a plan marked `done` with a due date in `[start, end]`.
    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&plan_id)), err)]
    pub async fn count_done_between(&mut self, plan_id: PlanId, start: NaiveDate, end: NaiveDate) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shorts_tasks WHERE plan_id = $1 AND status = 'done' AND due_date BETWEEN $2 AND $3",
        )
        .bind(plan_id)
        .bind(start)
        .bind(end)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }

    /// Every task of a plan due in `[start, end]`, by due date.
    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&plan_id)), err)]
    pub async fn list_between(&mut self, plan_id: PlanId, start: NaiveDate, end: NaiveDate) -> Result<Vec<ShortsTaskDBResponse>> {
        let mut query = QueryBuilder::new(SHORTS_TASK_SELECT);
        query.push(" WHERE st.plan_id = ");
        query.push_bind(plan_id);
        query.push(" AND st.due_date BETWEEN ");
        query.push_bind(start);
        query.push(" AND ");
        query.push_bind(end);
        query.push(" ORDER BY st.due_date ASC, st.title ASC");
        let tasks = query.build_query_as::<ShortsTaskDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(tasks)
    }

    /// The latest `limit` tasks of a plan by due date.
    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&plan_id)), err)]
    pub async fn list_recent(&mut self, plan_id: PlanId, limit: i64) -> Result<Vec<ShortsTaskDBResponse>> {
        let mut query = QueryBuilder::new(SHORTS_TASK_SELECT);
        query.push(" WHERE st.plan_id = ");
        query.push_bind(plan_id);
        query.push(" ORDER BY st.due_date DESC, st.title ASC LIMIT ");
        query.push_bind(limit);
        let tasks = query.build_query_as::<ShortsTaskDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::{ActiveDays, plan_week};
    use crate::test_utils::{create_test_client, create_test_editor, create_test_plan};
    use sqlx::PgPool;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_insert_drafts_skips_existing(pool: PgPool) {
        let editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let plan = create_test_plan(&pool, client.id, editor.id, monday()).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = ShortsTasks::new(&mut conn);

        let days = ActiveDays::new(&plan.active_days).unwrap();
        let week = plan_week(monday(), &days, 2);
        assert_eq!(repo.insert_drafts(&plan, &week.drafts).await.unwrap(), 6);
        assert_eq!(repo.insert_drafts(&plan, &week.drafts).await.unwrap(), 0);

        // One more short per day adds only the new titles
        let bigger = plan_week(monday(), &days, 3);
        assert_eq!(repo.insert_drafts(&plan, &bigger.drafts).await.unwrap(), 3);

        let tasks = repo.list_between(plan.id, week.week_start, week.week_end).await.unwrap();
        assert_eq!(tasks.len(), 9);
        assert!(tasks.iter().all(|t| t.status == ShortsTaskStatus::Pending && t.client_name == "Acme Media"));
    }

    #[sqlx::test]
    async fn test_insert_drafts_past_bind_limit(pool: PgPool) {
        let editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let plan = create_test_plan(&pool, client.id, editor.id, monday()).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = ShortsTasks::new(&mut conn);

        // More rows than fit in a single statement
        let total = INSERT_CHUNK_ROWS * 2 + 7;
        let drafts: Vec<_> = (1..=total)
            .map(|n| ShortDraft {
                title: format!("Short #{n}"),
                due_date: monday(),
            })
            .collect();

        assert_eq!(repo.insert_drafts(&plan, &drafts).await.unwrap(), total as u64);
        assert_eq!(repo.insert_drafts(&plan, &drafts).await.unwrap(), 0);

        let filter = ShortsTaskFilter {
            plan_id: Some(plan.id),
            ..ShortsTaskFilter::new(0, 1)
        };
        assert_eq!(repo.count(&filter).await.unwrap(), total as i64);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_done_count_and_review(pool: PgPool) {
        let editor = create_test_editor(&pool).await;
        let admin = crate::test_utils::create_test_admin(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let plan = create_test_plan(&pool, client.id, editor.id, monday()).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = ShortsTasks::new(&mut conn);

        let week = plan_week(monday(), &ActiveDays::new(&plan.active_days).unwrap(), 1);
        repo.insert_drafts(&plan, &week.drafts).await.unwrap();
        let tasks = repo.list_between(plan.id, week.week_start, week.week_end).await.unwrap();

        let done = repo
            .update(tasks[0].id, Some(ShortsTaskStatus::Done), Some("https://example.com/short-1"))
            .await
            .unwrap();
        assert_eq!(done.proof_url.as_deref(), Some("https://example.com/short-1"));
        repo.update(tasks[1].id, Some(ShortsTaskStatus::InProgress), None).await.unwrap();
        assert_eq!(repo.count_done_between(plan.id, week.week_start, week.week_end).await.unwrap(), 1);

        let rejected = repo.review(tasks[0].id, ShortsTaskStatus::Rejected, admin.id).await.unwrap();
        assert_eq!(rejected.reviewed_by, Some(admin.id));
        assert!(rejected.reviewed_at.is_some());
        assert_eq!(rejected.proof_url, done.proof_url);
        assert_eq!(repo.count_done_between(plan.id, week.week_start, week.week_end).await.unwrap(), 0);

        let filter = ShortsTaskFilter {
            editor_id: Some(editor.id),
            status: Some(ShortsTaskStatus::InProgress),
            ..ShortsTaskFilter::new(0, 10)
        };
        assert_eq!(repo.count(&filter).await.unwrap(), 1);
    }
}
