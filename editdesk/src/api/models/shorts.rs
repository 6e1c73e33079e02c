//! API request/response models for shorts plans, their generated tasks and weekly closures.

use super::pagination::Pagination;
use crate::db::models::shorts::{ClosureDBResponse, PlanDBResponse, ShortsTaskDBResponse};
use crate::types::{ClientId, ClosureId, PlanId, ShortsTaskId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "plan_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Active,
    Paused,
    Inactive,
}

/// `fixed` pays the editor the full weekly rate, `proportional` scales it by compliance.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "plan_payment_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanPaymentMode {
    #[default]
    Fixed,
    Proportional,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "shorts_task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ShortsTaskStatus {
    Pending,
    InProgress,
    Done,
    Rejected,
}

impl ShortsTaskStatus {
    /// Statuses an editor may set on their own task.
    pub fn editor_settable(self) -> bool {
        !matches!(self, ShortsTaskStatus::Rejected)
    }
}

/// Lifecycle of a weekly closure.
///
/// ```text
/// open ──confirm──▶ confirmed ──▶ paid_editor ◀──▶ charged_client
///   ▲                   │  └─────────────────────────────▲
///   └──────reopen───────┘
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "closure_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClosureStatus {
    Open,
    Confirmed,
    PaidEditor,
    ChargedClient,
}

impl ClosureStatus {
    pub fn can_transition_to(self, next: ClosureStatus) -> bool {
        use ClosureStatus::*;
        matches!(
            (self, next),
            (Open, Confirmed)
                | (Confirmed, Open)
                | (Confirmed, PaidEditor)
                | (Confirmed, ChargedClient)
                | (ChargedClient, PaidEditor)
                | (PaidEditor, ChargedClient)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClosureStatus::Open => "open",
            ClosureStatus::Confirmed => "confirmed",
            ClosureStatus::PaidEditor => "paid_editor",
            ClosureStatus::ChargedClient => "charged_client",
        }
    }
}

impl fmt::Display for ClosureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanCreate {
    #[schema(value_type = String, format = "uuid")]
    pub client_id: ClientId,
    #[schema(value_type = String, format = "uuid")]
    pub editor_id: UserId,
    pub shorts_per_day: i32,
    /// Weekdays 0 (Sunday) to 6 (Saturday)
    pub active_days: Vec<i16>,
    #[schema(value_type = String)]
    pub weekly_rate_client: Decimal,
    #[schema(value_type = String)]
    pub weekly_rate_editor: Decimal,
    pub payment_mode: Option<PlanPaymentMode>,
    /// First week to generate; also the start of that week's window
    pub start_date: NaiveDate,
    pub currency: Option<String>,
    pub timezone: Option<String>,
}

/// Changes only affect weeks generated afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PlanUpdate {
    pub status: Option<PlanStatus>,
    pub shorts_per_day: Option<i32>,
    pub active_days: Option<Vec<i16>>,
    #[schema(value_type = Option<String>)]
    pub weekly_rate_client: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub weekly_rate_editor: Option<Decimal>,
    pub payment_mode: Option<PlanPaymentMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PlanId,
    #[schema(value_type = String, format = "uuid")]
    pub client_id: ClientId,
    pub client_name: String,
    #[schema(value_type = String, format = "uuid")]
    pub editor_id: UserId,
    pub editor_name: String,
    pub shorts_per_day: i32,
    pub active_days: Vec<i16>,
    #[schema(value_type = String)]
    pub weekly_rate_client: Decimal,
    #[schema(value_type = String)]
    pub weekly_rate_editor: Decimal,
    pub payment_mode: PlanPaymentMode,
    pub start_date: NaiveDate,
    pub currency: String,
    pub timezone: String,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of generating one week of a plan. Re-running for the same week creates nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GenerationResult {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub tasks_planned: i64,
    pub tasks_created: i64,
    pub closure_created: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanCreatedResponse {
    pub plan: PlanResponse,
    pub generation: GenerationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanDetailResponse {
    pub plan: PlanResponse,
    /// Newest week first
    pub closures: Vec<ClosureResponse>,
    /// The open week's tasks, or the most recent ones when no week is open
    pub tasks: Vec<ShortsTaskResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateWeekRequest {
    pub week_start: NaiveDate,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListPlansQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub status: Option<PlanStatus>,

    /// Ignored for editors, who only ever see their own plans
    #[param(value_type = Option<String>, format = "uuid")]
    pub editor_id: Option<UserId>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub client_id: Option<ClientId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShortsTaskResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ShortsTaskId,
    #[schema(value_type = String, format = "uuid")]
    pub plan_id: PlanId,
    #[schema(value_type = String, format = "uuid")]
    pub editor_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub client_id: ClientId,
    pub client_name: String,
    pub title: String,
    pub status: ShortsTaskStatus,
    pub due_date: NaiveDate,
    pub proof_url: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ShortsTaskUpdate {
    pub status: Option<ShortsTaskStatus>,
    /// Link to the delivered short
    pub proof_url: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListShortsTasksQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    #[param(value_type = Option<String>, format = "uuid")]
    pub plan_id: Option<PlanId>,

    pub status: Option<ShortsTaskStatus>,

    /// Earliest due date, inclusive
    pub from: Option<NaiveDate>,

    /// Latest due date, inclusive
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClosureResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ClosureId,
    #[schema(value_type = String, format = "uuid")]
    pub plan_id: PlanId,
    #[schema(value_type = String, format = "uuid")]
    pub editor_id: UserId,
    pub editor_name: String,
    pub client_name: String,
    pub currency: String,
    pub week_start_date: NaiveDate,
    pub week_end_date: NaiveDate,
    pub total_shorts_required: i32,
    pub total_shorts_completed: i32,
    #[schema(value_type = String)]
    pub compliance_percentage: Decimal,
    #[schema(value_type = String)]
    pub editor_payment_amount: Decimal,
    #[schema(value_type = String)]
    pub client_charge_amount: Decimal,
    pub status: ClosureStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Figures recomputed from the week's tasks at request time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClosureSummary {
    pub completed: i64,
    pub required: i64,
    #[schema(value_type = String)]
    pub compliance_percentage: Decimal,
    #[schema(value_type = String)]
    pub estimated_editor_payment: Decimal,
    #[schema(value_type = String)]
    pub client_charge: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClosureDetailResponse {
    pub closure: ClosureResponse,
    pub summary: ClosureSummary,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListClosuresQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    #[param(value_type = Option<String>, format = "uuid")]
    pub plan_id: Option<PlanId>,

    pub status: Option<ClosureStatus>,
}

/// An editor's current shorts week at a glance.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MyShortsResponse {
    pub plan: Option<PlanResponse>,
    pub closure: Option<ClosureResponse>,
    pub tasks: Vec<ShortsTaskResponse>,
}

impl From<PlanDBResponse> for PlanResponse {
    fn from(db: PlanDBResponse) -> Self {
        Self {
            id: db.id,
            client_id: db.client_id,
            client_name: db.client_name,
            editor_id: db.editor_id,
            editor_name: db.editor_name,
            shorts_per_day: db.shorts_per_day,
            active_days: db.active_days,
            weekly_rate_client: db.weekly_rate_client,
            weekly_rate_editor: db.weekly_rate_editor,
            payment_mode: db.payment_mode,
            start_date: db.start_date,
            currency: db.currency,
            timezone: db.timezone,
            status: db.status,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl From<ShortsTaskDBResponse> for ShortsTaskResponse {
    fn from(db: ShortsTaskDBResponse) -> Self {
        Self {
            id: db.id,
            plan_id: db.plan_id,
            editor_id: db.editor_id,
            client_id: db.client_id,
            client_name: db.client_name,
            title: db.title,
            status: db.status,
            due_date: db.due_date,
            proof_url: db.proof_url,
            reviewed_by: db.reviewed_by,
            reviewed_at: db.reviewed_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl From<ClosureDBResponse> for ClosureResponse {
    fn from(db: ClosureDBResponse) -> Self {
        Self {
            id: db.id,
            plan_id: db.plan_id,
            editor_id: db.editor_id,
            editor_name: db.editor_name,
            client_name: db.client_name,
            currency: db.currency,
            week_start_date: db.week_start_date,
            week_end_date: db.week_end_date,
            total_shorts_required: db.total_shorts_required,
            total_shorts_completed: db.total_shorts_completed,
            compliance_percentage: db.compliance_percentage,
            editor_payment_amount: db.editor_payment_amount,
            client_charge_amount: db.client_charge_amount,
            status: db.status,
            confirmed_at: db.confirmed_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
