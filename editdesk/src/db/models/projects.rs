//! Database models for projects and their comments.

use crate::api::models::projects::ProjectStatus;
use crate::types::{ClientId, CommentId, ProjectId, TemplateId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct ProjectCreateDBRequest {
    pub title: String,
    pub description: Option<String>,
    pub client_id: Option<ClientId>,
    pub editor_id: Option<UserId>,
    pub template_id: Option<TemplateId>,
    pub status: ProjectStatus,
    pub content_type: Option<String>,
    pub content_quantity: Option<i32>,
    pub due_date: Option<NaiveDate>,
    pub billed_amount: Decimal,
    pub editor_payment: Decimal,
}

/// `None` leaves a column untouched. `billed_by`/`paid_by` are filled in by the handler from the
/// caller when the matching payment flag flips to true.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdateDBRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub client_id: Option<ClientId>,
    pub editor_id: Option<UserId>,
    pub status: Option<ProjectStatus>,
    pub content_type: Option<String>,
    pub content_quantity: Option<i32>,
    pub due_date: Option<NaiveDate>,
    pub billed_amount: Option<Decimal>,
    pub editor_payment: Option<Decimal>,
    pub payment_received: Option<bool>,
    pub payment_made: Option<bool>,
    pub billed_by: Option<UserId>,
    pub paid_by: Option<UserId>,
}

/// A project row joined with its client's name and its editor's full name.
#[derive(Debug, Clone, FromRow)]
pub struct ProjectDBResponse {
    pub id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub client_id: Option<ClientId>,
    pub editor_id: Option<UserId>,
    pub template_id: Option<TemplateId>,
    pub status: ProjectStatus,
    pub content_type: Option<String>,
    pub content_quantity: Option<i32>,
    pub due_date: Option<NaiveDate>,
    pub billed_amount: Decimal,
    pub editor_payment: Decimal,
    pub net_profit: Decimal,
    pub billed_by: Option<UserId>,
    pub paid_by: Option<UserId>,
    pub payment_received: bool,
    pub payment_made: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub client_name: Option<String>,
    pub editor_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommentCreateDBRequest {
    pub project_id: ProjectId,
    pub user_id: Option<UserId>,
    pub content: String,
    pub attachment_url: Option<String>,
    pub is_system: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentDBResponse {
    pub id: CommentId,
    pub project_id: ProjectId,
    pub user_id: Option<UserId>,
    pub content: String,
    pub attachment_url: Option<String>,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub author_name: Option<String>,
}
