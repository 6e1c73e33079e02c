//! OpenAPI documentation for the management API at `/admin/api/v1/*`.

pub mod admin;

pub use admin::AdminApiDoc;
