//! API request/response models for projects and project comments.

use super::pagination::Pagination;
use super::tasks::TaskResponse;
use crate::db::models::projects::{CommentDBResponse, ProjectDBResponse};
use crate::types::{ClientId, CommentId, ProjectId, TemplateId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Pending,
    InProgress,
    Review,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    /// Still being worked on: neither completed nor cancelled.
    pub fn is_active(self) -> bool {
        !matches!(self, ProjectStatus::Completed | ProjectStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Review => "review",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectCreate {
    pub title: String,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub client_id: Option<ClientId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub editor_id: Option<UserId>,
    /// When set and active, the template's default tasks are created with the project
    #[schema(value_type = Option<String>, format = "uuid")]
    pub template_id: Option<TemplateId>,
    pub status: Option<ProjectStatus>,
    pub content_type: Option<String>,
    pub content_quantity: Option<i32>,
    pub due_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub billed_amount: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub editor_payment: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProjectUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub client_id: Option<ClientId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub editor_id: Option<UserId>,
    pub status: Option<ProjectStatus>,
    pub content_type: Option<String>,
    pub content_quantity: Option<i32>,
    pub due_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub billed_amount: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub editor_payment: Option<Decimal>,
    pub payment_received: Option<bool>,
    pub payment_made: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub client_id: Option<ClientId>,
    pub client_name: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub editor_id: Option<UserId>,
    pub editor_name: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub template_id: Option<TemplateId>,
    pub status: ProjectStatus,
    pub content_type: Option<String>,
    pub content_quantity: Option<i32>,
    pub due_date: Option<NaiveDate>,
    #[schema(value_type = String)]
    pub billed_amount: Decimal,
    #[schema(value_type = String)]
    pub editor_payment: Decimal,
    #[schema(value_type = String)]
    pub net_profit: Decimal,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub billed_by: Option<UserId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub paid_by: Option<UserId>,
    pub payment_received: bool,
    pub payment_made: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A project with its tasks, ordered by `sort_order`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectDetailResponse {
    #[serde(flatten)]
    pub project: ProjectResponse,
    pub tasks: Vec<TaskResponse>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListProjectsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub status: Option<ProjectStatus>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub client_id: Option<ClientId>,

    /// Ignored for editors, who only ever see their own projects
    #[param(value_type = Option<String>, format = "uuid")]
    pub editor_id: Option<UserId>,

    /// Case-insensitive substring match on title or client name
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentCreate {
    pub content: String,
    pub attachment_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CommentId,
    #[schema(value_type = String, format = "uuid")]
    pub project_id: ProjectId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    pub author_name: Option<String>,
    pub content: String,
    pub attachment_url: Option<String>,
    /// Comments written by the system, e.g. status change notes
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ProjectDBResponse> for ProjectResponse {
    fn from(db: ProjectDBResponse) -> Self {
        Self {
            id: db.id,
            title: db.title,
            description: db.description,
            client_id: db.client_id,
            client_name: db.client_name,
            editor_id: db.editor_id,
            editor_name: db.editor_name,
            template_id: db.template_id,
            status: db.status,
            content_type: db.content_type,
            content_quantity: db.content_quantity,
            due_date: db.due_date,
            billed_amount: db.billed_amount,
            editor_payment: db.editor_payment,
            net_profit: db.net_profit,
            billed_by: db.billed_by,
            paid_by: db.paid_by,
            payment_received: db.payment_received,
            payment_made: db.payment_made,
            delivered_at: db.delivered_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl From<CommentDBResponse> for CommentResponse {
    fn from(db: CommentDBResponse) -> Self {
        Self {
            id: db.id,
            project_id: db.project_id,
            user_id: db.user_id,
            author_name: db.author_name,
            content: db.content,
            attachment_url: db.attachment_url,
            is_system: db.is_system,
            created_at: db.created_at,
        }
    }
}
