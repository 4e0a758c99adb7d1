use std::time::Duration;

use crate::constants::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_TOMBSTONE_CAP};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Background refresh cadence while polling is running.
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
    /// Tombstone retention bound; see `Reconciler`.
    pub tombstone_cap: usize,
    /// Restrict fetches to a single list, if set.
    pub list_filter: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            retry: RetryPolicy::default(),
            tombstone_cap: DEFAULT_TOMBSTONE_CAP,
            list_filter: None,
        }
    }
}
