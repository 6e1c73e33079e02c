//! API request/response models for project tasks.

use super::pagination::Pagination;
use crate::db::models::tasks::TaskDBResponse;
use crate::types::{ProjectId, TaskId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskCreate {
    #[schema(value_type = String, format = "uuid")]
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub assigned_to: Option<UserId>,
    pub due_date: Option<NaiveDate>,
    pub sort_order: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub payment_amount: Option<Decimal>,
}

/// Editors may only send `status` and `notes`; anything else is rejected for them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub assigned_to: Option<UserId>,
    pub due_date: Option<NaiveDate>,
    pub sort_order: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub payment_amount: Option<Decimal>,
    pub notes: Option<String>,
}

impl TaskUpdate {
    /// True when the update touches something besides `status` and `notes`.
    pub fn touches_admin_fields(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.assigned_to.is_some()
            || self.due_date.is_some()
            || self.sort_order.is_some()
            || self.payment_amount.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: TaskId,
    #[schema(value_type = String, format = "uuid")]
    pub project_id: ProjectId,
    pub project_title: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub assigned_to: Option<UserId>,
    pub due_date: Option<NaiveDate>,
    pub sort_order: i32,
    #[schema(value_type = String)]
    pub payment_amount: Decimal,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The caller's tasks bucketed by status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct GroupedTasksResponse {
    pub pending: Vec<TaskResponse>,
    pub in_progress: Vec<TaskResponse>,
    pub completed: Vec<TaskResponse>,
}

impl FromIterator<TaskResponse> for GroupedTasksResponse {
    fn from_iter<I: IntoIterator<Item = TaskResponse>>(iter: I) -> Self {
        let mut grouped = GroupedTasksResponse::default();
        for task in iter {
            match task.status {
                TaskStatus::Pending => grouped.pending.push(task),
                TaskStatus::InProgress => grouped.in_progress.push(task),
                TaskStatus::Completed => grouped.completed.push(task),
            }
        }
        grouped
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListTasksQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    #[param(value_type = Option<String>, format = "uuid")]
    pub project_id: Option<ProjectId>,

    pub status: Option<TaskStatus>,

    /// Ignored for editors, who only ever see their own tasks
    #[param(value_type = Option<String>, format = "uuid")]
    pub assigned_to: Option<UserId>,
}

impl From<TaskDBResponse> for TaskResponse {
    fn from(db: TaskDBResponse) -> Self {
        Self {
            id: db.id,
            project_id: db.project_id,
            project_title: db.project_title,
            title: db.title,
            description: db.description,
            status: db.status,
            assigned_to: db.assigned_to,
            due_date: db.due_date,
            sort_order: db.sort_order,
            payment_amount: db.payment_amount,
            notes: db.notes,
            completed_at: db.completed_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
