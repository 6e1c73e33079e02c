//! API models for the admin inbox of projects needing attention.

use crate::types::ProjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InboxKind {
    Overdue,
    PaymentClient,
    PaymentEditor,
    NoEditor,
    NoDueDate,
}

impl InboxKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InboxKind::Overdue => "overdue",
            InboxKind::PaymentClient => "payment_client",
            InboxKind::PaymentEditor => "payment_editor",
            InboxKind::NoEditor => "no_editor",
            InboxKind::NoDueDate => "no_due_date",
        }
    }

    fn from_key(s: &str) -> Option<Self> {
        [
            InboxKind::Overdue,
            InboxKind::PaymentClient,
            InboxKind::PaymentEditor,
            InboxKind::NoEditor,
            InboxKind::NoDueDate,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == s)
    }
}

impl fmt::Display for InboxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split an item id of the form `{kind}-{project_id}`.
pub fn parse_item_id(item_id: &str) -> Option<(InboxKind, ProjectId)> {
    // Kinds contain no '-', UUIDs do
    let (kind, project_id) = item_id.split_once('-')?;
    Some((InboxKind::from_key(kind)?, project_id.parse().ok()?))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InboxItem {
    /// `{kind}-{project_id}`
    pub id: String,
    pub kind: InboxKind,
    #[schema(value_type = String, format = "uuid")]
    pub project_id: ProjectId,
    pub project_title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_overdue: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InboxCounts {
    pub overdue: usize,
    /// Client and editor payments together
    pub payments: usize,
    pub other: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InboxResponse {
    pub items: Vec<InboxItem>,
    pub counts: InboxCounts,
}
