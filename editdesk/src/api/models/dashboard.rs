//! API models for the admin and editor dashboards.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Which window of project creation dates the dashboard figures cover.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DateFilterKind {
    #[default]
    All,
    Today,
    Week,
    Month,
    Custom,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DashboardQuery {
    pub filter: Option<DateFilterKind>,
    /// First day of a `custom` window
    pub from: Option<NaiveDate>,
    /// Last day of a `custom` window, inclusive. Defaults to `from`.
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TopClient {
    pub name: String,
    #[schema(value_type = String)]
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TopEditor {
    pub name: String,
    #[schema(value_type = String)]
    pub payments: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyPoint {
    /// `YYYY-MM`
    pub month: String,
    #[schema(value_type = String)]
    pub revenue: Decimal,
    #[schema(value_type = String)]
    pub profit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DashboardResponse {
    #[schema(value_type = String)]
    pub total_revenue: Decimal,
    #[schema(value_type = String)]
    pub total_payments: Decimal,
    #[schema(value_type = String)]
    pub net_profit: Decimal,
    pub clients_count: i64,
    pub editors_count: i64,
    pub active_projects: i64,
    pub pending_tasks: i64,
    pub top_clients: Vec<TopClient>,
    pub top_editors: Vec<TopEditor>,
    /// Oldest month first
    pub monthly: Vec<MonthlyPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EditorDashboardResponse {
    pub pending_tasks: i64,
    pub active_projects: i64,
    /// Owed for completed projects not yet paid
    #[schema(value_type = String)]
    pub unpaid_amount: Decimal,
    #[schema(value_type = String)]
    pub paid_amount: Decimal,
}
