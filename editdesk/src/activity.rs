//! Best-effort audit logging for mutations.
//!
//! A failed insert is logged and swallowed: the request that triggered it has already
//! succeeded and must not be failed by the audit trail.

use crate::db::{errors::Result, handlers::ActivityLogs, models::activity::ActivityLogCreateDBRequest};
use axum::http::HeaderMap;
use sqlx::{PgConnection, PgPool};
use tracing::{instrument, warn};

/// Insert one entry, propagating failures.
pub async fn log_activity(conn: &mut PgConnection, entry: &ActivityLogCreateDBRequest) -> Result<()> {
    ActivityLogs::new(conn).create(entry).await
}

/// Writes activity entries on their own pooled connection, never failing the caller.
#[derive(Clone)]
pub struct ActivityLogger {
    db: PgPool,
}

impl ActivityLogger {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    #[instrument(skip_all, fields(action = %entry.action))]
    pub async fn record(&self, entry: ActivityLogCreateDBRequest) {
        let mut conn = match self.db.acquire().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Could not acquire connection for activity log: {e}");
                return;
            }
        };
        if let Err(e) = log_activity(&mut conn, &entry).await {
            warn!("Failed to record activity '{}': {e}", entry.action);
        }
    }
}

/// Client address as reported by the first reverse proxy hop.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()).map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::activity::ActivityFilter;
    use crate::test_utils::create_test_admin;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), None);

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.9"));

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.7"));
    }

    #[sqlx::test]
    async fn test_record_writes_entry(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let logger = ActivityLogger::new(pool.clone());

        logger
            .record(
                ActivityLogCreateDBRequest::builder()
                    .user_id(admin.id)
                    .action("login")
                    .entity_type("user")
                    .entity_id(admin.id)
                    .build(),
            )
            .await;

        let mut conn = pool.acquire().await.unwrap();
        let entries = ActivityLogs::new(&mut conn).list(&ActivityFilter::new(0, 10)).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "login");
        assert_eq!(entries[0].user_name.as_deref(), Some(admin.full_name.as_str()));
    }

    #[sqlx::test]
    async fn test_record_swallows_failures(pool: PgPool) {
        let logger = ActivityLogger::new(pool.clone());

        // Unknown user violates the foreign key; the call still returns normally
        logger
            .record(
                ActivityLogCreateDBRequest::builder()
                    .user_id(uuid::Uuid::new_v4())
                    .action("update")
                    .build(),
            )
            .await;

        let mut conn = pool.acquire().await.unwrap();
        let count = ActivityLogs::new(&mut conn).count(&ActivityFilter::new(0, 10)).await.unwrap();
        assert_eq!(count, 0);
    }
}
