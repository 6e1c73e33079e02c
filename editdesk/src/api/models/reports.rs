//! API request/response models for weekly editor reports.

use super::pagination::Pagination;
use crate::db::models::reports::WeeklyReportDBResponse;
use crate::types::{ReportId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Paid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct GenerateReportsRequest {
    /// Any date in the target week; defaults to the current week. Weeks run Monday to Sunday.
    pub week_start: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WeeklyReportResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ReportId,
    #[schema(value_type = String, format = "uuid")]
    pub editor_id: UserId,
    pub editor_name: String,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub total_videos: i32,
    pub total_tasks: i32,
    #[schema(value_type = String)]
    pub total_payment: Decimal,
    pub payment_status: ReportStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateReportsResponse {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub reports: Vec<WeeklyReportResponse>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListReportsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Ignored for editors, who only ever see their own reports
    #[param(value_type = Option<String>, format = "uuid")]
    pub editor_id: Option<UserId>,

    pub status: Option<ReportStatus>,
}

impl From<WeeklyReportDBResponse> for WeeklyReportResponse {
    fn from(db: WeeklyReportDBResponse) -> Self {
        Self {
            id: db.id,
            editor_id: db.editor_id,
            editor_name: db.editor_name,
            week_start: db.week_start,
            week_end: db.week_end,
            total_videos: db.total_videos,
            total_tasks: db.total_tasks,
            total_payment: db.total_payment,
            payment_status: db.payment_status,
            paid_at: db.paid_at,
            created_at: db.created_at,
        }
    }
}
