//! Database models for weekly editor reports.

use crate::api::models::reports::ReportStatus;
use crate::types::{ReportId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

/// A report row joined with the editor's name.
#[derive(Debug, Clone, FromRow)]
pub struct WeeklyReportDBResponse {
    pub id: ReportId,
    pub editor_id: UserId,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub total_videos: i32,
    pub total_tasks: i32,
    pub total_payment: Decimal,
    pub payment_status: ReportStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub editor_name: String,
}
