//! The CRUD contract shared by table repositories.

use crate::db::errors::Result;
use std::collections::HashMap;

/// Data access for one table.
///
/// Implementors wrap a `&mut PgConnection` so callers decide whether the calls run inside a
/// transaction. Repositories for soft-deletable entities implement `delete` as deactivation.
#[async_trait::async_trait]
pub trait Repository {
    type CreateRequest;

    type UpdateRequest;

    /// Row type returned by every operation
    type Response;

    type Id: Send + Sync;

    /// Filter and pagination for `list`
    type Filter: Send + Sync;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    /// Fetch several rows at once, keyed by ID. Missing IDs are absent from the map.
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>>;

    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;

    /// Returns false when nothing matched the ID.
    async fn delete(&mut self, id: Self::Id) -> Result<bool>;

    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response>;
}
