//! Remote collection access for one entity type.

pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::error::SyncError;
use crate::models::{Entity, EntityDraft, EntityPatch};

pub use http::HttpGateway;
pub use memory::MemoryGateway;

/// Server-side filter for a fetch. Empty filter means "everything visible to
/// this client".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchFilter {
    /// Restrict to entities owned by (or shared with) this user.
    pub owner_id: Option<String>,
    /// Restrict to a single list.
    pub list_id: Option<String>,
}

/// Translate {list, create, update, delete} intents into remote store calls.
///
/// Implementations hold no local entity state; the reconciler owns that.
#[async_trait]
pub trait CollectionGateway: Send + Sync {
    /// Fetch the current snapshot. An empty collection is a success with an
    /// empty vec, never an error.
    async fn fetch_all(&self, filter: &FetchFilter) -> Result<Vec<Entity>, SyncError>;

    /// Create an entity; returns the durable entity with its assigned id.
    async fn create(&self, draft: &EntityDraft) -> Result<Entity, SyncError>;

    /// Partially update an entity by durable id.
    async fn update(&self, id: &str, patch: &EntityPatch) -> Result<Entity, SyncError>;

    /// Delete by durable id. Idempotent: deleting an already-deleted id
    /// succeeds.
    async fn delete(&self, id: &str) -> Result<(), SyncError>;
}
