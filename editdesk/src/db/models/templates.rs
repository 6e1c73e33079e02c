//! Database models for project templates.

use crate::api::models::templates::{TemplateCreate, TemplateUpdate};
use crate::types::TemplateId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct TemplateCreateDBRequest {
    pub name: String,
    pub description: Option<String>,
    pub default_tasks: Vec<String>,
    pub default_content_type: Option<String>,
    pub default_content_quantity: Option<i32>,
}

impl From<TemplateCreate> for TemplateCreateDBRequest {
    fn from(api: TemplateCreate) -> Self {
        Self {
            name: api.name,
            description: api.description,
            default_tasks: api.default_tasks,
            default_content_type: api.default_content_type,
            default_content_quantity: api.default_content_quantity,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub default_tasks: Option<Vec<String>>,
    pub default_content_type: Option<String>,
    pub default_content_quantity: Option<i32>,
    pub is_active: Option<bool>,
}

impl From<TemplateUpdate> for TemplateUpdateDBRequest {
    fn from(api: TemplateUpdate) -> Self {
        Self {
            name: api.name,
            description: api.description,
            default_tasks: api.default_tasks,
            default_content_type: api.default_content_type,
            default_content_quantity: api.default_content_quantity,
            is_active: api.is_active,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TemplateDBResponse {
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
