use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::MAX_TITLE_LEN;
use crate::error::SyncError;

/// Locally assigned creation token for an entity that has not yet been
/// confirmed by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalToken(String);

impl LocalToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LocalToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Entity identifier.
///
/// `Durable` ids are assigned by the remote store and stable for the
/// entity's life. `Local` ids exist only between an optimistic create and
/// its confirmation; they are never matched against server snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityId {
    Durable(String),
    Local(LocalToken),
}

impl EntityId {
    pub fn durable(id: impl Into<String>) -> Self {
        Self::Durable(id.into())
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    pub fn as_durable(&self) -> Option<&str> {
        match self {
            Self::Durable(id) => Some(id),
            Self::Local(_) => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Durable(id) => write!(f, "{}", id),
            Self::Local(token) => write!(f, "local:{}", token.as_str()),
        }
    }
}

/// A single synced item (a task or a list).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub title: String,
    pub done: bool,
    /// Parent list association, if any.
    pub list_id: Option<String>,
    /// Manual ordering position within a list.
    pub position: Option<i64>,
    /// Unix millis of the last modification known to this client.
    pub modified_at: i64,
}

impl Entity {
    /// Build the optimistic local entry for a creation, with a fresh local token.
    pub fn from_draft(draft: &EntityDraft) -> Self {
        Self {
            id: EntityId::Local(LocalToken::new()),
            title: draft.title.clone(),
            done: false,
            list_id: draft.list_id.clone(),
            position: draft.position,
            modified_at: now_millis(),
        }
    }
}

/// Creation payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityDraft {
    pub title: String,
    pub list_id: Option<String>,
    pub position: Option<i64>,
}

impl EntityDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        validate_title(&self.title)
    }
}

/// Partial update. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityPatch {
    pub title: Option<String>,
    pub done: Option<bool>,
    pub list_id: Option<String>,
    pub position: Option<i64>,
}

impl EntityPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.done.is_none()
            && self.list_id.is_none()
            && self.position.is_none()
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.is_empty() {
            return Err(SyncError::validation("patch contains no fields"));
        }
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        Ok(())
    }

    pub fn apply(&self, entity: &mut Entity) {
        if let Some(title) = &self.title {
            entity.title = title.clone();
        }
        if let Some(done) = self.done {
            entity.done = done;
        }
        if let Some(list_id) = &self.list_id {
            entity.list_id = Some(list_id.clone());
        }
        if let Some(position) = self.position {
            entity.position = Some(position);
        }
    }
}

fn validate_title(title: &str) -> Result<(), SyncError> {
    if title.trim().is_empty() {
        return Err(SyncError::validation("title must not be empty"));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(SyncError::validation(format!(
            "title exceeds {} bytes",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
