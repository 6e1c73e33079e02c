//! Database repository for project comments.

use crate::db::{
    errors::Result,
    models::projects::{CommentCreateDBRequest, CommentDBResponse},
};
use crate::types::{ProjectId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

pub struct Comments<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Comments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(project_id = %abbrev_uuid(&request.project_id), system = request.is_system), err)]
    pub async fn create(&mut self, request: &CommentCreateDBRequest) -> Result<CommentDBResponse> {
        let comment = sqlx::query_as::<_, CommentDBResponse>(
            r#"
            WITH c AS (
                INSERT INTO project_comments (id, project_id, user_id, content, attachment_url, is_system)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            )
            SELECT c.*, u.full_name AS author_name
            FROM c LEFT JOIN users u ON u.id = c.user_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.project_id)
        .bind(request.user_id)
        .bind(&request.content)
        .bind(&request.attachment_url)
        .bind(request.is_system)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(comment)
    }

    /// Oldest first, the order a conversation is read in.
    #[instrument(skip(self), fields(project_id = %abbrev_uuid(&project_id)), err)]
    pub async fn list_for_project(&mut self, project_id: ProjectId) -> Result<Vec<CommentDBResponse>> {
        let comments = sqlx::query_as::<_, CommentDBResponse>(
            r#"
            SELECT c.*, u.full_name AS author_name
            FROM project_comments c
            LEFT JOIN users u ON u.id = c.user_id
            WHERE c.project_id = $1
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(comments)
    }
}
