//! Authentication collaborator.
//!
//! The sync layer never implements auth; it only asks "who is this client"
//! to scope the collection filter it requests.

#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
}

pub trait SessionProvider: Send + Sync {
    /// Current session, or `None` when logged out.
    fn current_session(&self) -> Option<SessionInfo>;
}

/// Fixed session for tests and single-user tools.
pub struct StaticSession(pub SessionInfo);

impl SessionProvider for StaticSession {
    fn current_session(&self) -> Option<SessionInfo> {
        Some(self.0.clone())
    }
}
