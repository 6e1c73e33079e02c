//! Database models for payments and editor balances.

use crate::api::models::payments::PaymentType;
use crate::types::{ClosureId, PaymentId, ProjectId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct PaymentCreateDBRequest {
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub project_id: Option<ProjectId>,
    pub editor_id: Option<UserId>,
    pub closure_id: Option<ClosureId>,
    pub payment_method: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    /// Defaults to now when absent
    pub paid_at: Option<DateTime<Utc>>,
    pub created_by: Option<UserId>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PaymentDBResponse {
    pub id: PaymentId,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub project_id: Option<ProjectId>,
    pub editor_id: Option<UserId>,
    pub closure_id: Option<ClosureId>,
    pub payment_method: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub project_title: Option<String>,
    pub editor_name: Option<String>,
}

/// Aggregated earnings for one editor.
#[derive(Debug, Clone, FromRow)]
pub struct EditorBalanceDBResponse {
    pub editor_id: UserId,
    pub username: String,
    pub full_name: String,
    pub earned: Decimal,
    pub paid: Decimal,
    pub completed_tasks: i64,
}
