//! Optimistic state reconciliation.
//!
//! The reconciler is the single source of truth for the client's view of one
//! collection. It holds the last known-good snapshot with any in-flight
//! optimistic edits superimposed, and merges freshly fetched snapshots
//! without clobbering entries the server hasn't confirmed yet.
//!
//! All methods take `&mut self`; callers wrap the reconciler in a mutex so
//! no two operations interleave at the data-structure level.

use std::collections::{HashMap, HashSet, VecDeque};

use tokio::sync::watch;

use crate::constants::DEFAULT_TOMBSTONE_CAP;
use crate::error::SyncError;
use crate::fingerprint::snapshot_fingerprint;
use crate::models::{now_millis, Entity, EntityId, EntityPatch};

/// An optimistic mutation intent.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// `entity.id` must be `EntityId::Local`.
    Create(Entity),
    Update { id: EntityId, patch: EntityPatch },
    Delete { id: EntityId },
}

/// Identifies one applied mutation. A later mutation on the same entity
/// supersedes the handle; `confirm`/`rollback` with a superseded handle is a
/// discarded no-op, which is what rejects late-arriving gateway responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationHandle {
    id: EntityId,
    seq: u64,
}

impl MutationHandle {
    pub fn entity_id(&self) -> &EntityId {
        &self.id
    }
}

#[derive(Debug, Clone)]
enum PendingKind {
    Create,
    Update { prior: Entity },
    Delete { prior: Entity },
}

#[derive(Debug, Clone)]
struct PendingMutation {
    seq: u64,
    kind: PendingKind,
}

pub struct Reconciler {
    entities: HashMap<EntityId, Entity>,
    /// At most one pending mutation per entity.
    pending: HashMap<EntityId, PendingMutation>,
    /// Durable ids of confirmed deletions; suppresses resurrection by stale
    /// fetches. Bounded, oldest evicted first.
    tombstones: HashSet<String>,
    tombstone_order: VecDeque<String>,
    tombstone_cap: usize,
    /// Entities confirmed recently, keyed to the op counter at confirmation.
    /// A merge keeps these over remote content older than the fetch baseline.
    recently_confirmed: HashMap<EntityId, u64>,
    last_fingerprint: Option<String>,
    op_counter: u64,
    generation: u64,
    notify_tx: watch::Sender<u64>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_TOMBSTONE_CAP)
    }
}

impl Reconciler {
    pub fn new(tombstone_cap: usize) -> Self {
        let (notify_tx, _) = watch::channel(0);
        Self {
            entities: HashMap::new(),
            pending: HashMap::new(),
            tombstones: HashSet::new(),
            tombstone_order: VecDeque::new(),
            tombstone_cap: tombstone_cap.max(1),
            recently_confirmed: HashMap::new(),
            last_fingerprint: None,
            op_counter: 0,
            generation: 0,
            notify_tx,
        }
    }

    /// Current snapshot, sorted by position then id for a stable render order.
    pub fn snapshot(&self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self.entities.values().cloned().collect();
        entities.sort_by_key(|e| (e.position.unwrap_or(i64::MAX), e.id.to_string()));
        entities
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn has_pending(&self, id: &EntityId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn is_tombstoned(&self, id: &str) -> bool {
        self.tombstones.contains(id)
    }

    /// Change counter; bumps once per observable state change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Receiver observing `generation`. No value is sent when a merge turns
    /// out to be a no-op.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify_tx.subscribe()
    }

    /// Marker to capture before issuing a fetch; passed back to
    /// `merge_snapshot` so entities confirmed while the fetch was in flight
    /// are not clobbered by its (older) content.
    pub fn fetch_marker(&self) -> u64 {
        self.op_counter
    }

    /// Apply a mutation to the local snapshot immediately, ahead of remote
    /// confirmation. A new mutation on an entity supersedes its prior pending
    /// mutation.
    pub fn apply_optimistic(&mut self, mutation: Mutation) -> Result<MutationHandle, SyncError> {
        match mutation {
            Mutation::Create(entity) => {
                if !entity.id.is_local() {
                    return Err(SyncError::validation(
                        "optimistic create requires a local id",
                    ));
                }
                let id = entity.id.clone();
                self.entities.insert(id.clone(), entity);
                let seq = self.next_seq();
                self.pending.insert(
                    id.clone(),
                    PendingMutation {
                        seq,
                        kind: PendingKind::Create,
                    },
                );
                self.notify_change();
                Ok(MutationHandle { id, seq })
            }
            Mutation::Update { id, patch } => {
                if id.is_local() {
                    return Err(SyncError::validation(
                        "entity is not confirmed yet and cannot be updated",
                    ));
                }
                let Some(current) = self.entities.get(&id) else {
                    return Err(SyncError::not_found(id.to_string()));
                };
                // When superseding a pending update, the rollback point stays
                // the last confirmed value, not the superseded optimistic one.
                let prior = match self.pending.get(&id) {
                    Some(PendingMutation {
                        kind: PendingKind::Update { prior },
                        ..
                    }) => prior.clone(),
                    _ => current.clone(),
                };
                let mut updated = current.clone();
                patch.apply(&mut updated);
                updated.modified_at = now_millis();
                self.entities.insert(id.clone(), updated);
                let seq = self.next_seq();
                self.pending.insert(
                    id.clone(),
                    PendingMutation {
                        seq,
                        kind: PendingKind::Update { prior },
                    },
                );
                self.notify_change();
                Ok(MutationHandle { id, seq })
            }
            Mutation::Delete { id } => {
                if id.is_local() {
                    return Err(SyncError::validation(
                        "entity is not confirmed yet and cannot be deleted",
                    ));
                }
                let Some(prior) = self.entities.remove(&id) else {
                    return Err(SyncError::not_found(id.to_string()));
                };
                let seq = self.next_seq();
                self.pending.insert(
                    id.clone(),
                    PendingMutation {
                        seq,
                        kind: PendingKind::Delete { prior },
                    },
                );
                self.notify_change();
                Ok(MutationHandle { id, seq })
            }
        }
    }

    /// Transition the mutation to confirmed. For creates, `authoritative`
    /// replaces the temporary entry with the durable entity. Returns false if
    /// the handle was superseded and the response was discarded.
    pub fn confirm(&mut self, handle: &MutationHandle, authoritative: Option<Entity>) -> bool {
        let Some(kind) = self.take_pending(handle) else {
            return false;
        };
        // The entity set changed outside a merge; the next snapshot must be
        // reconciled even if its fingerprint matches the last merged one.
        self.last_fingerprint = None;
        match kind {
            PendingKind::Create => {
                self.entities.remove(&handle.id);
                match authoritative {
                    Some(entity) => {
                        let confirm_seq = self.next_seq();
                        if let Some(durable) = entity.id.as_durable() {
                            if self.tombstones.contains(durable) {
                                // Deleted elsewhere while the create was in
                                // flight; do not resurrect.
                                self.notify_change();
                                return true;
                            }
                        }
                        self.recently_confirmed.insert(entity.id.clone(), confirm_seq);
                        self.entities.insert(entity.id.clone(), entity);
                    }
                    None => {
                        tracing::warn!(id = %handle.id, "create confirmed without an authoritative entity");
                    }
                }
                self.notify_change();
                true
            }
            PendingKind::Update { .. } => {
                let confirm_seq = self.next_seq();
                if let Some(entity) = authoritative {
                    self.recently_confirmed.insert(entity.id.clone(), confirm_seq);
                    let changed = self.entities.get(&entity.id) != Some(&entity);
                    self.entities.insert(entity.id.clone(), entity);
                    if changed {
                        self.notify_change();
                    }
                } else {
                    self.recently_confirmed.insert(handle.id.clone(), confirm_seq);
                }
                true
            }
            PendingKind::Delete { .. } => {
                self.next_seq();
                if let Some(durable) = handle.id.as_durable() {
                    self.add_tombstone(durable.to_string());
                }
                self.recently_confirmed.remove(&handle.id);
                true
            }
        }
    }

    /// Revert the entity to its pre-mutation value. Returns false if the
    /// handle was superseded and the rollback was discarded.
    pub fn rollback(&mut self, handle: &MutationHandle) -> bool {
        let Some(kind) = self.take_pending(handle) else {
            return false;
        };
        // A restored entry may no longer exist remotely; force the next
        // merge to run even if the remote snapshot is unchanged.
        self.last_fingerprint = None;
        match kind {
            PendingKind::Create => {
                self.entities.remove(&handle.id);
            }
            PendingKind::Update { prior } | PendingKind::Delete { prior } => {
                self.entities.insert(handle.id.clone(), prior);
            }
        }
        self.notify_change();
        true
    }

    /// Merge a freshly fetched snapshot.
    ///
    /// `baseline` is the `fetch_marker()` captured before the fetch was
    /// issued. Returns whether observable state changed; an unchanged
    /// fingerprint short-circuits without touching state or notifying.
    ///
    /// Remote content never removes or overwrites: pending optimistic
    /// entries, local-id (unconfirmed create) entries, tombstoned ids, or
    /// entities confirmed after `baseline`.
    pub fn merge_snapshot(&mut self, remote: Vec<Entity>, baseline: u64) -> bool {
        let fingerprint = snapshot_fingerprint(&remote);
        if self.last_fingerprint.as_deref() == Some(fingerprint.as_str()) {
            return false;
        }
        self.last_fingerprint = Some(fingerprint);
        self.recently_confirmed.retain(|_, seq| *seq > baseline);

        let mut next: HashMap<EntityId, Entity> = HashMap::new();
        for (id, entity) in &self.entities {
            let keep = id.is_local()
                || self.pending.contains_key(id)
                || self.recently_confirmed.contains_key(id);
            if keep {
                next.insert(id.clone(), entity.clone());
            }
        }

        for entity in remote {
            let EntityId::Durable(durable) = &entity.id else {
                continue;
            };
            if self.tombstones.contains(durable) {
                continue;
            }
            // Pending deletes hold their id out of the merged set even though
            // no local entry exists for them.
            if self.pending.contains_key(&entity.id) {
                continue;
            }
            if next.contains_key(&entity.id) {
                continue;
            }
            next.insert(entity.id.clone(), entity);
        }

        let changed = next != self.entities;
        self.entities = next;
        if changed {
            self.notify_change();
        }
        changed
    }

    fn take_pending(&mut self, handle: &MutationHandle) -> Option<PendingKind> {
        match self.pending.get(&handle.id) {
            Some(pending) if pending.seq == handle.seq => {
                self.pending.remove(&handle.id).map(|p| p.kind)
            }
            Some(pending) => {
                tracing::debug!(
                    id = %handle.id,
                    stale_seq = handle.seq,
                    current_seq = pending.seq,
                    "discarding response for superseded mutation"
                );
                None
            }
            None => {
                tracing::debug!(id = %handle.id, seq = handle.seq, "discarding response for settled mutation");
                None
            }
        }
    }

    fn add_tombstone(&mut self, id: String) {
        if self.tombstones.insert(id.clone()) {
            self.tombstone_order.push_back(id);
            while self.tombstone_order.len() > self.tombstone_cap {
                if let Some(oldest) = self.tombstone_order.pop_front() {
                    self.tombstones.remove(&oldest);
                }
            }
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.op_counter += 1;
        self.op_counter
    }

    fn notify_change(&mut self) {
        self.generation += 1;
        let _ = self.notify_tx.send(self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, title: &str, done: bool) -> Entity {
        Entity {
            id: EntityId::durable(id),
            title: title.to_string(),
            done,
            list_id: None,
            position: None,
            modified_at: 1_000,
        }
    }

    fn local_entity(title: &str) -> Entity {
        Entity {
            id: EntityId::Local(crate::models::LocalToken::new()),
            title: title.to_string(),
            done: false,
            list_id: None,
            position: None,
            modified_at: 1_000,
        }
    }

    fn done_patch(done: bool) -> EntityPatch {
        EntityPatch {
            done: Some(done),
            ..Default::default()
        }
    }

    fn merge(reconciler: &mut Reconciler, remote: Vec<Entity>) -> bool {
        let baseline = reconciler.fetch_marker();
        reconciler.merge_snapshot(remote, baseline)
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut reconciler = Reconciler::default();
        let snapshot = vec![entity("1", "a", false), entity("2", "b", true)];

        assert!(merge(&mut reconciler, snapshot.clone()));
        let generation = reconciler.generation();

        assert!(!merge(&mut reconciler, snapshot));
        assert_eq!(reconciler.generation(), generation);
        assert_eq!(reconciler.snapshot().len(), 2);
    }

    #[test]
    fn test_tombstone_suppresses_resurrection() {
        let mut reconciler = Reconciler::default();
        merge(&mut reconciler, vec![entity("1", "a", false)]);

        let handle = reconciler
            .apply_optimistic(Mutation::Delete {
                id: EntityId::durable("1"),
            })
            .unwrap();
        assert!(reconciler.confirm(&handle, None));
        assert!(reconciler.is_tombstoned("1"));

        // Stale fetch still contains the deleted entity.
        merge(&mut reconciler, vec![entity("1", "a", false)]);
        assert!(reconciler.snapshot().is_empty());
    }

    #[test]
    fn test_optimistic_create_round_trip() {
        let mut reconciler = Reconciler::default();
        let temp = local_entity("new task");
        let handle = reconciler
            .apply_optimistic(Mutation::Create(temp.clone()))
            .unwrap();
        assert_eq!(reconciler.snapshot().len(), 1);
        assert!(reconciler.snapshot()[0].id.is_local());

        assert!(reconciler.confirm(&handle, Some(entity("srv-9", "new task", false))));
        let snapshot = reconciler.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, EntityId::durable("srv-9"));
        assert!(reconciler.get(&temp.id).is_none());
    }

    #[test]
    fn test_rollback_restores_prior_value() {
        let mut reconciler = Reconciler::default();
        merge(&mut reconciler, vec![entity("1", "a", false)]);

        let handle = reconciler
            .apply_optimistic(Mutation::Update {
                id: EntityId::durable("1"),
                patch: done_patch(true),
            })
            .unwrap();
        assert!(reconciler.snapshot()[0].done);

        assert!(reconciler.rollback(&handle));
        let snapshot = reconciler.snapshot();
        assert!(!snapshot[0].done);
        assert_eq!(snapshot[0].modified_at, 1_000);
    }

    #[test]
    fn test_rollback_of_failed_create_removes_entry() {
        let mut reconciler = Reconciler::default();
        let handle = reconciler
            .apply_optimistic(Mutation::Create(local_entity("x")))
            .unwrap();
        assert!(reconciler.rollback(&handle));
        assert!(reconciler.snapshot().is_empty());
    }

    #[test]
    fn test_rollback_of_failed_delete_restores_entity() {
        let mut reconciler = Reconciler::default();
        merge(&mut reconciler, vec![entity("1", "a", false)]);
        let handle = reconciler
            .apply_optimistic(Mutation::Delete {
                id: EntityId::durable("1"),
            })
            .unwrap();
        assert!(reconciler.snapshot().is_empty());

        assert!(reconciler.rollback(&handle));
        assert_eq!(reconciler.snapshot(), vec![entity("1", "a", false)]);
        assert!(!reconciler.is_tombstoned("1"));
    }

    #[test]
    fn test_stale_response_is_rejected() {
        let mut reconciler = Reconciler::default();
        merge(&mut reconciler, vec![entity("1", "a", false)]);

        let first = reconciler
            .apply_optimistic(Mutation::Update {
                id: EntityId::durable("1"),
                patch: done_patch(true),
            })
            .unwrap();
        let second = reconciler
            .apply_optimistic(Mutation::Update {
                id: EntityId::durable("1"),
                patch: done_patch(false),
            })
            .unwrap();

        // First mutation's gateway response arrives after it was superseded.
        assert!(!reconciler.confirm(&first, Some(entity("1", "a", true))));
        assert!(!reconciler.snapshot()[0].done);

        assert!(reconciler.confirm(&second, Some(entity("1", "a", false))));
        assert!(!reconciler.snapshot()[0].done);
    }

    #[test]
    fn test_superseded_rollback_is_discarded() {
        let mut reconciler = Reconciler::default();
        merge(&mut reconciler, vec![entity("1", "a", false)]);

        let first = reconciler
            .apply_optimistic(Mutation::Update {
                id: EntityId::durable("1"),
                patch: done_patch(true),
            })
            .unwrap();
        reconciler
            .apply_optimistic(Mutation::Update {
                id: EntityId::durable("1"),
                patch: done_patch(false),
            })
            .unwrap();

        assert!(!reconciler.rollback(&first));
        assert!(reconciler.has_pending(&EntityId::durable("1")));
    }

    #[test]
    fn test_superseding_update_keeps_original_rollback_point() {
        let mut reconciler = Reconciler::default();
        merge(&mut reconciler, vec![entity("1", "a", false)]);

        reconciler
            .apply_optimistic(Mutation::Update {
                id: EntityId::durable("1"),
                patch: done_patch(true),
            })
            .unwrap();
        let second = reconciler
            .apply_optimistic(Mutation::Update {
                id: EntityId::durable("1"),
                patch: EntityPatch {
                    title: Some("b".to_string()),
                    ..Default::default()
                },
            })
            .unwrap();

        assert!(reconciler.rollback(&second));
        // Restored to the last confirmed value, not the first optimistic one.
        let snapshot = reconciler.snapshot();
        assert_eq!(snapshot[0].title, "a");
        assert!(!snapshot[0].done);
    }

    #[test]
    fn test_merge_preserves_pending_create() {
        let mut reconciler = Reconciler::default();
        let temp = local_entity("offline add");
        reconciler
            .apply_optimistic(Mutation::Create(temp.clone()))
            .unwrap();

        merge(&mut reconciler, vec![entity("1", "a", false)]);
        let snapshot = reconciler.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().any(|e| e.id == temp.id));
    }

    #[test]
    fn test_merge_keeps_optimistic_value_over_stale_remote() {
        let mut reconciler = Reconciler::default();
        merge(&mut reconciler, vec![entity("1", "a", false)]);

        reconciler
            .apply_optimistic(Mutation::Update {
                id: EntityId::durable("1"),
                patch: done_patch(true),
            })
            .unwrap();

        // Remote still carries the pre-mutation value.
        merge(&mut reconciler, vec![entity("1", "a", false), entity("2", "b", false)]);
        let snapshot = reconciler.snapshot();
        assert_eq!(snapshot.len(), 2);
        let one = snapshot.iter().find(|e| e.id == EntityId::durable("1")).unwrap();
        assert!(one.done);
    }

    #[test]
    fn test_merge_excludes_pending_delete() {
        let mut reconciler = Reconciler::default();
        merge(&mut reconciler, vec![entity("1", "a", false)]);
        reconciler
            .apply_optimistic(Mutation::Delete {
                id: EntityId::durable("1"),
            })
            .unwrap();

        merge(&mut reconciler, vec![entity("1", "a", false), entity("2", "b", false)]);
        let snapshot = reconciler.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, EntityId::durable("2"));
    }

    #[test]
    fn test_merge_while_create_pending_then_confirm() {
        // Poll snapshot fetched before the create completed arrives first.
        let mut reconciler = Reconciler::default();
        let temp = local_entity("new");
        let handle = reconciler
            .apply_optimistic(Mutation::Create(temp.clone()))
            .unwrap();

        merge(&mut reconciler, Vec::new());
        assert_eq!(reconciler.snapshot().len(), 1);

        assert!(reconciler.confirm(&handle, Some(entity("srv-9", "new", false))));
        let snapshot = reconciler.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, EntityId::durable("srv-9"));
    }

    #[test]
    fn test_stale_fetch_does_not_clobber_fresh_confirm() {
        // Fetch was issued before the create, its response lands after the
        // confirm. The baseline marker protects the confirmed entity.
        let mut reconciler = Reconciler::default();
        let baseline = reconciler.fetch_marker();

        let handle = reconciler
            .apply_optimistic(Mutation::Create(local_entity("new")))
            .unwrap();
        assert!(reconciler.confirm(&handle, Some(entity("srv-9", "new", false))));

        reconciler.merge_snapshot(Vec::new(), baseline);
        let snapshot = reconciler.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, EntityId::durable("srv-9"));

        // A fetch issued after the confirm that still lacks the entity is
        // authoritative: the store genuinely no longer returns it.
        let later = reconciler.fetch_marker();
        reconciler.merge_snapshot(vec![entity("srv-9", "new", false)], later);
        let final_marker = reconciler.fetch_marker();
        reconciler.merge_snapshot(Vec::new(), final_marker);
        assert!(reconciler.snapshot().is_empty());
    }

    #[test]
    fn test_rollback_forces_next_merge_to_reconcile() {
        let mut reconciler = Reconciler::default();
        merge(&mut reconciler, vec![entity("1", "a", false)]);

        let handle = reconciler
            .apply_optimistic(Mutation::Update {
                id: EntityId::durable("1"),
                patch: done_patch(true),
            })
            .unwrap();

        // Another client deleted the entity remotely; the pending update
        // rightly keeps the optimistic local copy through this merge.
        merge(&mut reconciler, Vec::new());
        assert_eq!(reconciler.snapshot().len(), 1);

        // The gateway call fails and the optimistic value is reverted.
        assert!(reconciler.rollback(&handle));

        // The remote snapshot is byte-identical to the last merged one, but
        // the restored entity must still be reconciled away.
        merge(&mut reconciler, Vec::new());
        assert!(reconciler.snapshot().is_empty());
    }

    #[test]
    fn test_no_notification_for_noop_merge() {
        let mut reconciler = Reconciler::default();
        let mut rx = reconciler.subscribe();
        merge(&mut reconciler, vec![entity("1", "a", false)]);
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        merge(&mut reconciler, vec![entity("1", "a", false)]);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_mutating_unconfirmed_entity_is_rejected() {
        let mut reconciler = Reconciler::default();
        let temp = local_entity("pending");
        reconciler
            .apply_optimistic(Mutation::Create(temp.clone()))
            .unwrap();

        let update = reconciler.apply_optimistic(Mutation::Update {
            id: temp.id.clone(),
            patch: done_patch(true),
        });
        assert!(matches!(update, Err(SyncError::Validation { .. })));

        let delete = reconciler.apply_optimistic(Mutation::Delete { id: temp.id });
        assert!(matches!(delete, Err(SyncError::Validation { .. })));
    }

    #[test]
    fn test_update_on_missing_entity_is_not_found() {
        let mut reconciler = Reconciler::default();
        let result = reconciler.apply_optimistic(Mutation::Update {
            id: EntityId::durable("ghost"),
            patch: done_patch(true),
        });
        assert_eq!(result.unwrap_err(), SyncError::not_found("ghost"));
    }

    #[test]
    fn test_tombstone_cap_evicts_oldest() {
        let mut reconciler = Reconciler::new(2);
        for id in ["1", "2", "3"] {
            merge(&mut reconciler, vec![entity(id, "x", false)]);
            let handle = reconciler
                .apply_optimistic(Mutation::Delete {
                    id: EntityId::durable(id),
                })
                .unwrap();
            reconciler.confirm(&handle, None);
        }
        assert!(!reconciler.is_tombstoned("1"));
        assert!(reconciler.is_tombstoned("2"));
        assert!(reconciler.is_tombstoned("3"));
    }

    #[test]
    fn test_create_confirm_respects_tombstone() {
        let mut reconciler = Reconciler::default();
        merge(&mut reconciler, vec![entity("srv-9", "old", false)]);
        let delete = reconciler
            .apply_optimistic(Mutation::Delete {
                id: EntityId::durable("srv-9"),
            })
            .unwrap();
        reconciler.confirm(&delete, None);

        let create = reconciler
            .apply_optimistic(Mutation::Create(local_entity("new")))
            .unwrap();
        assert!(reconciler.confirm(&create, Some(entity("srv-9", "new", false))));
        assert!(reconciler.snapshot().is_empty());
    }
}
