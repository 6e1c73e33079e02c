//! Repository implementations for database access.
//!
//! Each repository wraps a `&mut PgConnection`, builds its queries with SQLx and returns rows
//! from [`crate::db::models`]. The plain CRUD entities implement [`Repository`]; the rest expose
//! inherent methods shaped after their workflows.
//!
//! ```ignore
//! use editdesk::db::handlers::{Clients, Repository};
//!
//! let mut tx = pool.begin().await?;
//! let client = Clients::new(&mut tx).create(&request).await?;
//! tx.commit().await?;
//! ```

pub mod activity;
pub mod clients;
pub mod closures;
pub mod comments;
pub mod payments;
pub mod projects;
pub mod reports;
pub mod repository;
pub mod sections;
pub mod shorts_plans;
pub mod shorts_tasks;
pub mod tasks;
pub mod templates;
pub mod users;

pub use activity::ActivityLogs;
pub use clients::Clients;
pub use closures::WeeklyClosures;
pub use comments::Comments;
pub use payments::Payments;
pub use projects::Projects;
pub use reports::WeeklyReports;
pub use repository::Repository;
pub use sections::UserSections;
pub use shorts_plans::ShortsPlans;
pub use shorts_tasks::ShortsTasks;
pub use tasks::Tasks;
pub use templates::Templates;
pub use users::Users;
