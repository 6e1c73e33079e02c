//! API request/response models for payments and editor accounting.

use super::pagination::Pagination;
use crate::db::models::payments::{EditorBalanceDBResponse, PaymentDBResponse};
use crate::types::{ClosureId, PaymentId, ProjectId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// `income` is money from a client, `expense` is money paid to an editor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "payment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Income,
    Expense,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentCreate {
    pub payment_type: PaymentType,
    /// Must be greater than zero
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub project_id: Option<ProjectId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub editor_id: Option<UserId>,
    pub payment_method: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PaymentId,
    pub payment_type: PaymentType,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub project_id: Option<ProjectId>,
    pub project_title: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub editor_id: Option<UserId>,
    pub editor_name: Option<String>,
    /// Set for payments created by confirming a weekly shorts closure
    #[schema(value_type = Option<String>, format = "uuid")]
    pub closure_id: Option<ClosureId>,
    pub payment_method: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListPaymentsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub payment_type: Option<PaymentType>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub project_id: Option<ProjectId>,

    /// Ignored for editors, who only ever see payments made to them
    #[param(value_type = Option<String>, format = "uuid")]
    pub editor_id: Option<UserId>,
}

/// What an editor has earned, what they were paid, and the difference.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EditorBalanceResponse {
    #[schema(value_type = String, format = "uuid")]
    pub editor_id: UserId,
    pub username: String,
    pub full_name: String,
    #[schema(value_type = String)]
    pub earned: Decimal,
    #[schema(value_type = String)]
    pub paid: Decimal,
    #[schema(value_type = String)]
    pub pending: Decimal,
    pub completed_tasks: i64,
}

impl From<PaymentDBResponse> for PaymentResponse {
    fn from(db: PaymentDBResponse) -> Self {
        Self {
            id: db.id,
            payment_type: db.payment_type,
            amount: db.amount,
            project_id: db.project_id,
            project_title: db.project_title,
            editor_id: db.editor_id,
            editor_name: db.editor_name,
            closure_id: db.closure_id,
            payment_method: db.payment_method,
            reference: db.reference,
            notes: db.notes,
            paid_at: db.paid_at,
            created_by: db.created_by,
            created_at: db.created_at,
        }
    }
}

impl From<EditorBalanceDBResponse> for EditorBalanceResponse {
    fn from(db: EditorBalanceDBResponse) -> Self {
        Self {
            editor_id: db.editor_id,
            username: db.username,
            full_name: db.full_name,
            pending: db.earned - db.paid,
            earned: db.earned,
            paid: db.paid,
            completed_tasks: db.completed_tasks,
        }
    }
}
