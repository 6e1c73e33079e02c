//! HTTP request handlers for all API endpoints.
//!
//! Each handler validates its input, checks permissions through the
//! [`crate::auth::permissions::RequiresPermission`] extractor, runs its queries through the
//! repositories in [`crate::db::handlers`] and records mutations in the activity log.
//!
//! Handlers return [`crate::errors::Error`], which converts to the matching status code.

pub mod activity;
pub mod auth;
pub mod clients;
pub mod closures;
pub mod dashboard;
pub mod inbox;
pub mod payments;
pub mod projects;
pub mod reports;
pub mod sections;
pub mod shorts;
pub mod tasks;
pub mod templates;
pub mod users;
