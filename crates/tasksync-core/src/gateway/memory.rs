//! In-process gateway used by tests and the CLI demo.
//!
//! Behaves like the real store (assigns durable ids, applies patches,
//! idempotent delete) and adds two hooks the real store can't offer:
//! scripted per-operation failures, and a one-shot stale snapshot served by
//! the next `fetch_all` to simulate backend propagation lag.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::SyncError;
use crate::gateway::{CollectionGateway, FetchFilter};
use crate::models::{now_millis, Entity, EntityDraft, EntityId, EntityPatch};

#[derive(Default)]
struct Inner {
    records: BTreeMap<String, Entity>,
    next_id: u64,
    latency: Option<Duration>,
    stale_snapshot: Option<Vec<Entity>>,
    fail_fetch: VecDeque<SyncError>,
    fail_create: VecDeque<SyncError>,
    fail_update: VecDeque<SyncError>,
    fail_delete: VecDeque<SyncError>,
}

#[derive(Default)]
pub struct MemoryGateway {
    inner: Mutex<Inner>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert entities directly, bypassing the gateway surface. Ids must be
    /// durable.
    pub fn seed(&self, entities: impl IntoIterator<Item = Entity>) {
        let mut inner = self.inner.lock();
        for entity in entities {
            if let EntityId::Durable(id) = &entity.id {
                inner.records.insert(id.clone(), entity);
            }
        }
    }

    /// Current store contents, sorted by id.
    pub fn records(&self) -> Vec<Entity> {
        self.inner.lock().records.values().cloned().collect()
    }

    /// Simulated network latency applied at the start of every call.
    pub fn set_latency(&self, latency: Duration) {
        self.inner.lock().latency = Some(latency);
    }

    /// Serve this snapshot from the next `fetch_all` instead of the live
    /// records (one shot).
    pub fn serve_stale_once(&self, snapshot: Vec<Entity>) {
        self.inner.lock().stale_snapshot = Some(snapshot);
    }

    pub fn fail_next_fetch(&self, err: SyncError) {
        self.inner.lock().fail_fetch.push_back(err);
    }

    pub fn fail_next_create(&self, err: SyncError) {
        self.inner.lock().fail_create.push_back(err);
    }

    pub fn fail_next_update(&self, err: SyncError) {
        self.inner.lock().fail_update.push_back(err);
    }

    pub fn fail_next_delete(&self, err: SyncError) {
        self.inner.lock().fail_delete.push_back(err);
    }

    async fn simulate_latency(&self) {
        let latency = self.inner.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn matches_filter(entity: &Entity, filter: &FetchFilter) -> bool {
    match &filter.list_id {
        Some(list) => entity.list_id.as_deref() == Some(list.as_str()),
        None => true,
    }
}

#[async_trait]
impl CollectionGateway for MemoryGateway {
    async fn fetch_all(&self, filter: &FetchFilter) -> Result<Vec<Entity>, SyncError> {
        self.simulate_latency().await;
        let mut inner = self.inner.lock();
        if let Some(err) = inner.fail_fetch.pop_front() {
            return Err(err);
        }
        if let Some(stale) = inner.stale_snapshot.take() {
            return Ok(stale);
        }
        Ok(inner
            .records
            .values()
            .filter(|e| matches_filter(e, filter))
            .cloned()
            .collect())
    }

    async fn create(&self, draft: &EntityDraft) -> Result<Entity, SyncError> {
        self.simulate_latency().await;
        let mut inner = self.inner.lock();
        if let Some(err) = inner.fail_create.pop_front() {
            return Err(err);
        }
        inner.next_id += 1;
        let id = format!("srv-{}", inner.next_id);
        let entity = Entity {
            id: EntityId::Durable(id.clone()),
            title: draft.title.clone(),
            done: false,
            list_id: draft.list_id.clone(),
            position: draft.position,
            modified_at: now_millis(),
        };
        inner.records.insert(id, entity.clone());
        Ok(entity)
    }

    async fn update(&self, id: &str, patch: &EntityPatch) -> Result<Entity, SyncError> {
        self.simulate_latency().await;
        let mut inner = self.inner.lock();
        if let Some(err) = inner.fail_update.pop_front() {
            return Err(err);
        }
        let Some(entity) = inner.records.get_mut(id) else {
            return Err(SyncError::not_found(id));
        };
        patch.apply(entity);
        entity.modified_at = now_millis();
        Ok(entity.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), SyncError> {
        self.simulate_latency().await;
        let mut inner = self.inner.lock();
        if let Some(err) = inner.fail_delete.pop_front() {
            return Err(err);
        }
        inner.records.remove(id);
        Ok(())
    }
}
