//! Database repository for per-user section overrides.

use crate::db::errors::Result;
use crate::types::{UserId, abbrev_uuid};
use sqlx::{PgConnection, QueryBuilder};
use tracing::instrument;

pub struct UserSections<'c> {
    db: &'c mut PgConnection,
}

impl<'c> UserSections<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Stored `(section_key, can_view)` overrides for a user.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn list_for_user(&mut self, user_id: UserId) -> Result<Vec<(String, bool)>> {
        let rows = sqlx::query_as::<_, (String, bool)>(
            "SELECT section_key, can_view FROM user_sections WHERE user_id = $1 ORDER BY section_key",
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }

    #[instrument(skip(self, entries), fields(user_id = %abbrev_uuid(&user_id), count = entries.len()), err)]
    pub async fn upsert_many(&mut self, user_id: UserId, entries: &[(String, bool)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::new("INSERT INTO user_sections (user_id, section_key, can_view) ");
        query.push_values(entries, |mut row, (key, can_view)| {
            row.push_bind(user_id).push_bind(key.clone()).push_bind(*can_view);
        });
        query.push(" ON CONFLICT (user_id, section_key) DO UPDATE SET can_view = EXCLUDED.can_view, updated_at = NOW()");
        query.build().execute(&mut *self.db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::test_utils::create_test_user;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_upsert_overwrites_existing_rows(pool: PgPool) {
        let user = create_test_user(&pool, Role::Editor).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = UserSections::new(&mut conn);

        repo.upsert_many(user.id, &[("my_tasks".to_string(), false)]).await.unwrap();
        repo.upsert_many(user.id, &[("my_tasks".to_string(), true), ("my_shorts".to_string(), false)])
            .await
            .unwrap();

        let stored = repo.list_for_user(user.id).await.unwrap();
        assert_eq!(stored, vec![("my_shorts".to_string(), false), ("my_tasks".to_string(), true)]);
    }
}
