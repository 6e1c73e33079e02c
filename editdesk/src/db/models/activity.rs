//! Database models for the activity log.

use crate::types::{ActivityLogId, UserId};
use bon::Builder;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// One audit entry.
///
/// ```ignore
/// let entry = ActivityLogCreateDBRequest::builder()
///     .user_id(user.id)
///     .action("create")
///     .entity_type("client")
///     .entity_id(client.id)
///     .entity_name(client.name.clone())
///     .build();
/// ```
#[derive(Debug, Clone, Builder)]
pub struct ActivityLogCreateDBRequest {
    pub user_id: Option<UserId>,
    #[builder(into)]
    pub action: String,
    #[builder(into)]
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    #[builder(into)]
    pub entity_name: Option<String>,
    pub details: Option<serde_json::Value>,
    #[builder(into)]
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ActivityLogDBResponse {
    pub id: ActivityLogId,
    pub user_id: Option<UserId>,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub entity_name: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user_name: Option<String>,
}
