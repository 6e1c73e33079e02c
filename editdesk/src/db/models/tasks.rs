//! Database models for project tasks.

use crate::api::models::tasks::TaskStatus;
use crate::types::{ProjectId, TaskId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct TaskCreateDBRequest {
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<NaiveDate>,
    pub sort_order: i32,
    pub payment_amount: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct TaskUpdateDBRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<NaiveDate>,
    pub sort_order: Option<i32>,
    pub payment_amount: Option<Decimal>,
    pub notes: Option<String>,
}

/// A task row joined with its project's title.
#[derive(Debug, Clone, FromRow)]
pub struct TaskDBResponse {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<NaiveDate>,
    pub sort_order: i32,
    pub payment_amount: Decimal,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub project_title: String,
}
