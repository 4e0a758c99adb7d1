//! Client wiring: optimistic apply → retried gateway call → confirm or
//! rollback, plus the background poll loop.
//!
//! The reconciler sits behind one mutex and is the only place state lives;
//! mutation futures and the poll task both funnel through it. Locks are
//! never held across an await.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::gateway::{CollectionGateway, FetchFilter};
use crate::models::{Entity, EntityDraft, EntityId, EntityPatch};
use crate::poller::PollScheduler;
use crate::retry::with_retry;
use crate::session::SessionProvider;
use crate::store::{Mutation, Reconciler};

pub struct SyncClient {
    reconciler: Arc<Mutex<Reconciler>>,
    gateway: Arc<dyn CollectionGateway>,
    config: SyncConfig,
    session: Option<Arc<dyn SessionProvider>>,
    polling: Mutex<Option<Polling>>,
}

struct Polling {
    scheduler: PollScheduler,
    task: JoinHandle<()>,
}

impl SyncClient {
    pub fn new(gateway: Arc<dyn CollectionGateway>, config: SyncConfig) -> Self {
        let reconciler = Reconciler::new(config.tombstone_cap);
        Self {
            reconciler: Arc::new(Mutex::new(reconciler)),
            gateway,
            config,
            session: None,
            polling: Mutex::new(None),
        }
    }

    pub fn with_session(mut self, session: Arc<dyn SessionProvider>) -> Self {
        self.session = Some(session);
        self
    }

    /// Current local view: last known-good snapshot plus optimistic edits.
    pub fn snapshot(&self) -> Vec<Entity> {
        self.reconciler.lock().snapshot()
    }

    /// Observe state changes; the watched value is a change counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.reconciler.lock().subscribe()
    }

    pub fn generation(&self) -> u64 {
        self.reconciler.lock().generation()
    }

    fn fetch_filter(&self) -> FetchFilter {
        FetchFilter {
            owner_id: self
                .session
                .as_ref()
                .and_then(|s| s.current_session())
                .map(|s| s.user_id),
            list_id: self.config.list_filter.clone(),
        }
    }

    /// Create an entity. The local snapshot shows it (under a temporary id)
    /// before this future resolves; on failure the entry is removed again.
    pub async fn create(&self, draft: EntityDraft) -> Result<Entity, SyncError> {
        draft.validate()?;
        let optimistic = Entity::from_draft(&draft);
        let handle = self
            .reconciler
            .lock()
            .apply_optimistic(Mutation::Create(optimistic))?;

        let result = with_retry(&self.config.retry, || async {
            self.gateway.create(&draft).await
        })
        .await;

        match result {
            Ok(confirmed) => {
                self.reconciler.lock().confirm(&handle, Some(confirmed.clone()));
                Ok(confirmed)
            }
            Err(err) => {
                tracing::warn!(error = %err, title = %draft.title, "create failed, reverting");
                self.reconciler.lock().rollback(&handle);
                Err(err)
            }
        }
    }

    /// Patch an entity by durable id. Applied locally at once; reverted to
    /// the prior value if the gateway call ultimately fails.
    pub async fn update(&self, id: &str, patch: EntityPatch) -> Result<Entity, SyncError> {
        patch.validate()?;
        let handle = self.reconciler.lock().apply_optimistic(Mutation::Update {
            id: EntityId::durable(id),
            patch: patch.clone(),
        })?;

        let result = with_retry(&self.config.retry, || async {
            self.gateway.update(id, &patch).await
        })
        .await;

        match result {
            Ok(confirmed) => {
                self.reconciler.lock().confirm(&handle, Some(confirmed.clone()));
                Ok(confirmed)
            }
            Err(err) => {
                tracing::warn!(error = %err, id, "update failed, reverting");
                self.reconciler.lock().rollback(&handle);
                Err(err)
            }
        }
    }

    /// Flip an entity's done flag.
    pub async fn toggle_done(&self, id: &str) -> Result<Entity, SyncError> {
        let done = {
            let reconciler = self.reconciler.lock();
            match reconciler.get(&EntityId::durable(id)) {
                Some(entity) => entity.done,
                None => return Err(SyncError::not_found(id)),
            }
        };
        let patch = EntityPatch {
            done: Some(!done),
            ..Default::default()
        };
        self.update(id, patch).await
    }

    /// Delete by durable id. Removed locally at once; restored if the
    /// gateway call ultimately fails, tombstoned once it confirms.
    pub async fn delete(&self, id: &str) -> Result<(), SyncError> {
        let handle = self.reconciler.lock().apply_optimistic(Mutation::Delete {
            id: EntityId::durable(id),
        })?;

        let result = with_retry(&self.config.retry, || async {
            self.gateway.delete(id).await
        })
        .await;

        match result {
            Ok(()) => {
                self.reconciler.lock().confirm(&handle, None);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, id, "delete failed, reverting");
                self.reconciler.lock().rollback(&handle);
                Err(err)
            }
        }
    }

    /// One fetch + merge. Returns whether observable state changed.
    pub async fn refresh(&self) -> Result<bool, SyncError> {
        let filter = self.fetch_filter();
        let baseline = self.reconciler.lock().fetch_marker();
        let remote = with_retry(&self.config.retry, || async {
            self.gateway.fetch_all(&filter).await
        })
        .await?;
        Ok(self.reconciler.lock().merge_snapshot(remote, baseline))
    }

    /// Begin background polling at the configured interval. No-op when
    /// already polling.
    pub fn start_polling(&self) {
        let mut polling = self.polling.lock();
        if polling.is_some() {
            return;
        }

        let (scheduler, mut ticks) = PollScheduler::start(self.config.poll_interval);
        let gateway = self.gateway.clone();
        let reconciler = self.reconciler.clone();
        let retry = self.config.retry.clone();
        let session = self.session.clone();
        let list_filter = self.config.list_filter.clone();

        let task = tokio::spawn(async move {
            while ticks.recv().await.is_some() {
                // The session can change between ticks (login/logout);
                // rebuild the filter for every fetch.
                let filter = FetchFilter {
                    owner_id: session
                        .as_ref()
                        .and_then(|s| s.current_session())
                        .map(|s| s.user_id),
                    list_id: list_filter.clone(),
                };
                let baseline = reconciler.lock().fetch_marker();
                let fetched = with_retry(&retry, || async {
                    gateway.fetch_all(&filter).await
                })
                .await;
                match fetched {
                    Ok(remote) => {
                        reconciler.lock().merge_snapshot(remote, baseline);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "background refresh failed");
                    }
                }
            }
            tracing::debug!("poll loop exited");
        });

        *polling = Some(Polling { scheduler, task });
    }

    pub fn pause_polling(&self) {
        if let Some(polling) = self.polling.lock().as_ref() {
            polling.scheduler.pause();
        }
    }

    pub fn resume_polling(&self) {
        if let Some(polling) = self.polling.lock().as_ref() {
            polling.scheduler.resume();
        }
    }

    /// Host visibility signal; forwarded to the scheduler.
    pub fn set_visible(&self, visible: bool) {
        if let Some(polling) = self.polling.lock().as_ref() {
            polling.scheduler.set_visible(visible);
        }
    }

    /// Host focus signal; forwarded to the scheduler.
    pub fn set_focused(&self, focused: bool) {
        if let Some(polling) = self.polling.lock().as_ref() {
            polling.scheduler.set_focused(focused);
        }
    }

    /// Stop polling permanently. In-flight fetches may still complete; their
    /// merges are idempotent and safe.
    pub fn stop_polling(&self) {
        if let Some(polling) = self.polling.lock().take() {
            polling.scheduler.stop();
            polling.task.abort();
        }
    }
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        self.stop_polling();
    }
}
