//! Optimistic sync client for collection-backed task views.
//!
//! One `SyncClient` owns the local view of a remote collection: mutations
//! apply instantly (optimistic, temporary ids for creates), a background
//! poll merges server snapshots without clobbering in-flight edits, and
//! transient gateway failures are retried before the state is reverted.

pub mod config;
pub mod constants;
pub mod error;
pub mod fingerprint;
pub mod gateway;
pub mod models;
pub mod poller;
pub mod retry;
pub mod runtime;
pub mod session;
pub mod store;
pub mod tracing_setup;

pub use config::SyncConfig;
pub use error::SyncError;
pub use gateway::{CollectionGateway, FetchFilter, HttpGateway, MemoryGateway};
pub use models::{Entity, EntityDraft, EntityId, EntityPatch, LocalToken};
pub use poller::{PollScheduler, PollState};
pub use retry::RetryPolicy;
pub use runtime::SyncClient;
pub use session::{SessionInfo, SessionProvider, StaticSession};
pub use store::{Mutation, MutationHandle, Reconciler};
