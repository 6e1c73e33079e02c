//! API response models for the activity log.

use super::pagination::Pagination;
use crate::db::models::activity::ActivityLogDBResponse;
use crate::types::{ActivityLogId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivityLogResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ActivityLogId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    pub user_name: Option<String>,
    pub action: String,
    pub entity_type: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub entity_id: Option<Uuid>,
    pub entity_name: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListActivityQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    #[param(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,

    /// e.g. `project`, `client`, `closure`
    pub entity_type: Option<String>,

    /// e.g. `create`, `update`, `login`
    pub action: Option<String>,
}

impl From<ActivityLogDBResponse> for ActivityLogResponse {
    fn from(db: ActivityLogDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            user_name: db.user_name,
            action: db.action,
            entity_type: db.entity_type,
            entity_id: db.entity_id,
            entity_name: db.entity_name,
            details: db.details,
            ip_address: db.ip_address,
            created_at: db.created_at,
        }
    }
}
