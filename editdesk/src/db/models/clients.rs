//! Database models for clients.

use crate::api::models::clients::{ClientCreate, ClientUpdate};
use crate::types::ClientId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct ClientCreateDBRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
}

impl From<ClientCreate> for ClientCreateDBRequest {
    fn from(api: ClientCreate) -> Self {
        Self {
            name: api.name,
            email: api.email,
            phone: api.phone,
            company: api.company,
            notes: api.notes,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientUpdateDBRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

impl From<ClientUpdate> for ClientUpdateDBRequest {
    fn from(api: ClientUpdate) -> Self {
        Self {
            name: api.name,
            email: api.email,
            phone: api.phone,
            company: api.company,
            notes: api.notes,
            is_active: api.is_active,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ClientDBResponse {
    pub id: ClientId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
