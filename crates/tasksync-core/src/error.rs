use thiserror::Error;

/// Failure taxonomy for gateway calls and local mutations.
///
/// Only `Transient` is ever retried; everything else propagates to the caller
/// immediately. `RetriesExhausted` is the terminal form a transient failure
/// takes once the retry budget is spent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    #[error("invalid payload: {message}")]
    Validation { message: String },

    #[error("entity not found: {id}")]
    NotFound { id: String },

    #[error("authentication failed: {message}")]
    Auth { message: String },

    #[error("transient failure: {message}")]
    Transient { message: String },

    #[error("remote state conflicts with pending change to {id}")]
    Conflict { id: String },

    #[error("gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

// Transport-level reqwest failures (connect, timeout, broken body) are all
// worth retrying; HTTP status classes are mapped separately by the gateway.
impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transient {
            message: err.to_string(),
        }
    }
}
