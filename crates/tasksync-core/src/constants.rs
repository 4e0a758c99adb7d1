//! Defaults shared across modules.

/// Default background poll interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Default retry budget for a single gateway call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// First retry delay; doubles per attempt.
pub const DEFAULT_RETRY_BASE_MS: u64 = 250;

/// Cap on the per-attempt retry delay.
pub const DEFAULT_RETRY_CAP_MS: u64 = 2_000;

/// Maximum number of tombstones retained; oldest are evicted first.
pub const DEFAULT_TOMBSTONE_CAP: usize = 1_024;

/// Maximum entity title length in bytes.
pub const MAX_TITLE_LEN: usize = 500;

/// Hex characters of the sha-256 digest kept as the snapshot fingerprint.
pub const FINGERPRINT_HEX_LEN: usize = 16;
