//! Figures derived from project rows: date windows, dashboard totals and the admin inbox.
//!
//! Everything here is pure so the handlers only fetch rows and hand them over.

pub mod dashboard;
pub mod date_filter;
pub mod inbox;

pub use dashboard::{DashboardCounts, compute_dashboard, compute_editor_dashboard};
pub use date_filter::DateFilter;
pub use inbox::derive_inbox;
