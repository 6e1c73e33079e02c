//! Database record models matching table schemas.
//!
//! Response rows derive `sqlx::FromRow` and usually carry a few joined display columns
//! (client and editor names). `*CreateDBRequest`/`*UpdateDBRequest` structs hold validated
//! input; in update requests `None` leaves a column untouched.

pub mod activity;
pub mod clients;
pub mod payments;
pub mod projects;
pub mod reports;
pub mod shorts;
pub mod tasks;
pub mod templates;
pub mod users;
