//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Authentication** (`/authentication/*`): Login, logout, password change
//! - **People** (`/admin/api/v1/users/*`, `/admin/api/v1/clients/*`): Admins, editors and clients
//! - **Work** (`/admin/api/v1/projects/*`, `/admin/api/v1/tasks/*`, `/admin/api/v1/templates/*`)
//! - **Money** (`/admin/api/v1/payments/*`, `/admin/api/v1/accounting/*`, `/admin/api/v1/reports/*`)
//! - **Shorts** (`/admin/api/v1/shorts/*`): Weekly plans, generated tasks and closures
//! - **Overview** (`/admin/api/v1/dashboard*`, `/admin/api/v1/inbox*`, `/admin/api/v1/activity`)
//!
//! All endpoints are documented with `utoipa`; the rendered docs live at `/admin/docs`.

pub mod handlers;
pub mod models;
