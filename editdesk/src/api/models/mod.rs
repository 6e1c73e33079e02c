//! API request and response data models.
//!
//! API models are kept apart from the database rows in [`crate::db::models`]; conversions go
//! through `From` impls. Every model is annotated with `utoipa` for the OpenAPI document.
//! Money amounts are `Decimal` and serialize as strings.

pub mod activity;
pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod inbox;
pub mod pagination;
pub mod payments;
pub mod projects;
pub mod reports;
pub mod sections;
pub mod shorts;
pub mod tasks;
pub mod templates;
pub mod users;
