//! Database repository for project tasks.

use crate::api::models::tasks::TaskStatus;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::tasks::{TaskCreateDBRequest, TaskDBResponse, TaskUpdateDBRequest},
};
use crate::types::{ProjectId, TaskId, UserId, abbrev_uuid};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

const TASK_SELECT: &str = r#"
    SELECT t.*, p.title AS project_title
    FROM tasks t
    JOIN projects p ON p.id = t.project_id
"#;

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub skip: i64,
    pub limit: i64,
    pub project_id: Option<ProjectId>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<UserId>,
}

impl TaskFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    fn push_conditions(&self, query: &mut QueryBuilder<'_, Postgres>) {
        if let Some(project_id) = self.project_id {
            query.push(" AND t.project_id = ");
            query.push_bind(project_id);
        }
        if let Some(status) = self.status {
            query.push(" AND t.status = ");
            query.push_bind(status);
        }
        if let Some(assigned_to) = self.assigned_to {
            query.push(" AND t.assigned_to = ");
            query.push_bind(assigned_to);
        }
    }
}

pub struct Tasks<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Tasks<'c> {
    type CreateRequest = TaskCreateDBRequest;
    type UpdateRequest = TaskUpdateDBRequest;
    type Response = TaskDBResponse;
    type Id = TaskId;
    type Filter = TaskFilter;

    #[instrument(skip(self, request), fields(project_id = %abbrev_uuid(&request.project_id), title = %request.title), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let task = sqlx::query_as::<_, TaskDBResponse>(
            r#"
            WITH t AS (
                INSERT INTO tasks (id, project_id, title, description, assigned_to, due_date, sort_order, payment_amount)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
            )
            SELECT t.*, p.title AS project_title
            FROM t JOIN projects p ON p.id = t.project_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.project_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.assigned_to)
        .bind(request.due_date)
        .bind(request.sort_order)
        .bind(request.payment_amount)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(task)
    }

    #[instrument(skip(self), fields(task_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let mut query = QueryBuilder::new(TASK_SELECT);
        query.push(" WHERE t.id = ");
        query.push_bind(id);
        let task = query.build_query_as::<TaskDBResponse>().fetch_optional(&mut *self.db).await?;
        Ok(task)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<TaskId>) -> Result<HashMap<Self::Id, TaskDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut query = QueryBuilder::new(TASK_SELECT);
        query.push(" WHERE t.id = ANY(");
        query.push_bind(ids);
        query.push(")");
        let tasks = query.build_query_as::<TaskDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(tasks.into_iter().map(|t| (t.id, t)).collect())
    }

    /// Ordered by due date (undated last), then sort order.
    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new(TASK_SELECT);
        query.push(" WHERE 1=1");
        filter.push_conditions(&mut query);
        query.push(" ORDER BY t.due_date ASC NULLS LAST, t.sort_order ASC, t.created_at ASC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let tasks = query.build_query_as::<TaskDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(tasks)
    }

    #[instrument(skip(self), fields(task_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Moving into `completed` stamps `completed_at`; moving out of it clears the stamp.
    #[instrument(skip(self, request), fields(task_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let task = sqlx::query_as::<_, TaskDBResponse>(
            r#"
            WITH t AS (
                UPDATE tasks SET
                    title = COALESCE($2, title),
                    description = COALESCE($3, description),
                    status = COALESCE($4, status),
                    assigned_to = COALESCE($5, assigned_to),
                    due_date = COALESCE($6, due_date),
                    sort_order = COALESCE($7, sort_order),
                    payment_amount = COALESCE($8, payment_amount),
                    notes = COALESCE($9, notes),
                    completed_at = CASE
                        WHEN $4 IS NULL THEN completed_at
                        WHEN $4 = 'completed'::task_status THEN COALESCE(completed_at, NOW())
                        ELSE NULL
                    END,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT t.*, p.title AS project_title
            FROM t JOIN projects p ON p.id = t.project_id
            "#,
        )
        .bind(id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.status)
        .bind(request.assigned_to)
        .bind(request.due_date)
        .bind(request.sort_order)
        .bind(request.payment_amount)
        .bind(&request.notes)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(task)
    }
}

impl<'c> Tasks<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &TaskFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM tasks t WHERE 1=1");
        filter.push_conditions(&mut query);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// Insert one task per title, with `sort_order` following the slice order.
    #[instrument(skip(self, titles), fields(project_id = %abbrev_uuid(&project_id), count = titles.len()), err)]
    pub async fn create_from_titles(&mut self, project_id: ProjectId, assigned_to: Option<UserId>, titles: &[String]) -> Result<u64> {
        if titles.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::new("INSERT INTO tasks (id, project_id, title, assigned_to, sort_order) ");
        query.push_values(titles.iter().enumerate(), |mut row, (index, title)| {
            row.push_bind(Uuid::new_v4())
                .push_bind(project_id)
                .push_bind(title.clone())
                .push_bind(assigned_to)
                .push_bind(index as i32);
        });
        let result = query.build().execute(&mut *self.db).await?;
        Ok(result.rows_affected())
    }

    /// Tasks of a project in `sort_order`, for the project detail view.
    #[instrument(skip(self), fields(project_id = %abbrev_uuid(&project_id)), err)]
    pub async fn list_for_project(&mut self, project_id: ProjectId) -> Result<Vec<TaskDBResponse>> {
        let mut query = QueryBuilder::new(TASK_SELECT);
        query.push(" WHERE t.project_id = ");
        query.push_bind(project_id);
        query.push(" ORDER BY t.sort_order ASC, t.created_at ASC");
        let tasks = query.build_query_as::<TaskDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(tasks)
    }

    /// All tasks assigned to a user, unpaginated.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn list_for_assignee(&mut self, user_id: UserId) -> Result<Vec<TaskDBResponse>> {
        let mut query = QueryBuilder::new(TASK_SELECT);
        query.push(" WHERE t.assigned_to = ");
        query.push_bind(user_id);
        query.push(" ORDER BY t.due_date ASC NULLS LAST, t.sort_order ASC");
        let tasks = query.build_query_as::<TaskDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(tasks)
    }

    /// Tasks not yet completed, optionally limited to one assignee.
    #[instrument(skip(self), err)]
    pub async fn count_open(&mut self, assigned_to: Option<UserId>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tasks WHERE status <> 'completed' AND ($1::UUID IS NULL OR assigned_to = $1)",
        )
        .bind(assigned_to)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::projects::ProjectStatus;
    use crate::db::handlers::Projects;
    use crate::db::models::projects::ProjectCreateDBRequest;
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    async fn create_project(conn: &mut PgConnection) -> ProjectId {
        Projects::new(conn)
            .create(&ProjectCreateDBRequest {
                title: "Podcast clips".to_string(),
                description: None,
                client_id: None,
                editor_id: None,
                template_id: None,
                status: ProjectStatus::Pending,
                content_type: None,
                content_quantity: None,
                due_date: None,
                billed_amount: Decimal::ZERO,
                editor_payment: Decimal::ZERO,
            })
            .await
            .unwrap()
            .id
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_from_titles_keeps_order(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let project_id = create_project(&mut conn).await;
        let mut repo = Tasks::new(&mut conn);

        let titles = vec!["Script".to_string(), "Edit".to_string(), "Deliver".to_string()];
        assert_eq!(repo.create_from_titles(project_id, None, &titles).await.unwrap(), 3);

        let tasks = repo.list_for_project(project_id).await.unwrap();
        let ordered: Vec<_> = tasks.iter().map(|t| (t.sort_order, t.title.as_str())).collect();
        assert_eq!(ordered, vec![(0, "Script"), (1, "Edit"), (2, "Deliver")]);
        assert!(tasks.iter().all(|t| t.project_title == "Podcast clips"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_completed_at_follows_status(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let project_id = create_project(&mut conn).await;
        let mut repo = Tasks::new(&mut conn);

        let task = repo
            .create(&TaskCreateDBRequest {
                project_id,
                title: "Cut".to_string(),
                description: None,
                assigned_to: None,
                due_date: None,
                sort_order: 0,
                payment_amount: Decimal::new(1500, 2),
            })
            .await
            .unwrap();

        let done = repo
            .update(
                task.id,
                &TaskUpdateDBRequest {
                    status: Some(TaskStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(done.completed_at.is_some());

        let noted = repo
            .update(
                task.id,
                &TaskUpdateDBRequest {
                    notes: Some("final export uploaded".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(noted.completed_at, done.completed_at);

        let reopened = repo
            .update(
                task.id,
                &TaskUpdateDBRequest {
                    status: Some(TaskStatus::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(reopened.completed_at.is_none());
        assert_eq!(repo.count_open(None).await.unwrap(), 1);
    }
}
