//! Database models for shorts plans, shorts tasks and weekly closures.

use crate::api::models::shorts::{ClosureStatus, PlanCreate, PlanPaymentMode, PlanStatus, PlanUpdate, ShortsTaskStatus};
use crate::types::{ClientId, ClosureId, PlanId, ShortsTaskId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct PlanCreateDBRequest {
    pub client_id: ClientId,
    pub editor_id: UserId,
    pub shorts_per_day: i32,
    pub active_days: Vec<i16>,
    pub weekly_rate_client: Decimal,
    pub weekly_rate_editor: Decimal,
    pub payment_mode: PlanPaymentMode,
    pub start_date: NaiveDate,
    pub currency: String,
    pub timezone: String,
}

impl PlanCreateDBRequest {
    /// Fill in the defaults a request may leave out. `active_days` should already be normalized.
    pub fn from_api(create: PlanCreate, active_days: Vec<i16>, default_currency: &str, default_timezone: &str) -> Self {
        Self {
            client_id: create.client_id,
            editor_id: create.editor_id,
            shorts_per_day: create.shorts_per_day,
            active_days,
            weekly_rate_client: create.weekly_rate_client,
            weekly_rate_editor: create.weekly_rate_editor,
            payment_mode: create.payment_mode.unwrap_or_default(),
            start_date: create.start_date,
            currency: create.currency.unwrap_or_else(|| default_currency.to_string()),
            timezone: create.timezone.unwrap_or_else(|| default_timezone.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanUpdateDBRequest {
    pub status: Option<PlanStatus>,
    pub shorts_per_day: Option<i32>,
    pub active_days: Option<Vec<i16>>,
    pub weekly_rate_client: Option<Decimal>,
    pub weekly_rate_editor: Option<Decimal>,
    pub payment_mode: Option<PlanPaymentMode>,
}

impl From<PlanUpdate> for PlanUpdateDBRequest {
    fn from(update: PlanUpdate) -> Self {
        Self {
            status: update.status,
            shorts_per_day: update.shorts_per_day,
            active_days: update.active_days,
            weekly_rate_client: update.weekly_rate_client,
            weekly_rate_editor: update.weekly_rate_editor,
            payment_mode: update.payment_mode,
        }
    }
}

/// A plan row joined with its client and editor names.
#[derive(Debug, Clone, FromRow)]
pub struct PlanDBResponse {
    pub id: PlanId,
    pub client_id: ClientId,
    pub editor_id: UserId,
    pub shorts_per_day: i32,
    pub active_days: Vec<i16>,
    pub weekly_rate_client: Decimal,
    pub weekly_rate_editor: Decimal,
    pub payment_mode: PlanPaymentMode,
    pub start_date: NaiveDate,
    pub currency: String,
    pub timezone: String,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub client_name: String,
    pub editor_name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ShortsTaskDBResponse {
    pub id: ShortsTaskId,
    pub plan_id: PlanId,
    pub editor_id: UserId,
    pub client_id: ClientId,
    pub title: String,
    pub status: ShortsTaskStatus,
    pub due_date: NaiveDate,
    pub proof_url: Option<String>,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub client_name: String,
}

/// A closure row joined with the editor, the client and the plan's currency.
#[derive(Debug, Clone, FromRow)]
pub struct ClosureDBResponse {
    pub id: ClosureId,
    pub plan_id: PlanId,
    pub editor_id: UserId,
    pub week_start_date: NaiveDate,
    pub week_end_date: NaiveDate,
    pub total_shorts_required: i32,
    pub total_shorts_completed: i32,
    pub compliance_percentage: Decimal,
    pub editor_payment_amount: Decimal,
    pub client_charge_amount: Decimal,
    pub status: ClosureStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub editor_name: String,
    pub client_name: String,
    pub currency: String,
}

/// Totals written when a closure is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureTotals {
    pub total_shorts_completed: i32,
    pub compliance_percentage: Decimal,
    pub editor_payment_amount: Decimal,
    pub client_charge_amount: Decimal,
}
