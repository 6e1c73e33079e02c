//! API request/response models for project templates.

use super::pagination::Pagination;
use crate::db::models::templates::TemplateDBResponse;
use crate::types::TemplateId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TemplateCreate {
    pub name: String,
    pub description: Option<String>,
    /// Task titles created, in order, for every project built from this template
    #[serde(default)]
    pub default_tasks: Vec<String>,
    pub default_content_type: Option<String>,
    pub default_content_quantity: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub default_tasks: Option<Vec<String>>,
    pub default_content_type: Option<String>,
    pub default_content_quantity: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TemplateResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: TemplateId,
    pub name: String,
    pub description: Option<String>,
    pub default_tasks: Vec<String>,
    pub default_content_type: Option<String>,
    pub default_content_quantity: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[serde_as]
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListTemplatesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Include deactivated templates (default false)
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub include_inactive: Option<bool>,
}

impl From<TemplateDBResponse> for TemplateResponse {
    fn from(db: TemplateDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            description: db.description,
            default_tasks: db.default_tasks,
            default_content_type: db.default_content_type,
            default_content_quantity: db.default_content_quantity,
            is_active: db.is_active,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
