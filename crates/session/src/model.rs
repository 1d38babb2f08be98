//! Session state types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of the single per-process session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Startup probe not resolved yet.
    Initializing,
    NoSession,
    Unlocked,
    /// Authenticated but hidden behind the lock screen.
    Locked,
}

impl SessionStatus {
    /// Whether an identity is bound (`Unlocked` or `Locked`).
    pub fn has_session(self) -> bool {
        matches!(self, SessionStatus::Unlocked | SessionStatus::Locked)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Initializing => "initializing",
            SessionStatus::NoSession => "no_session",
            SessionStatus::Unlocked => "unlocked",
            SessionStatus::Locked => "locked",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated user as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Stable login name.
    pub username: String,
    pub display_name: String,
    /// Role tag; also the scope notifications are fetched for.
    pub role: String,
}

/// What triggered a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    Probe,
    Login,
    /// Idle timer expiry.
    Idle,
    /// Explicit `lock()` call.
    Manual,
    /// Lock keyboard shortcut.
    Shortcut,
    Unlock,
    Logout,
}

impl TransitionCause {
    pub fn as_str(self) -> &'static str {
        match self {
            TransitionCause::Probe => "probe",
            TransitionCause::Login => "login",
            TransitionCause::Idle => "idle",
            TransitionCause::Manual => "manual",
            TransitionCause::Shortcut => "shortcut",
            TransitionCause::Unlock => "unlock",
            TransitionCause::Logout => "logout",
        }
    }
}

/// Read-only view of the session published to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub identity: Option<UserIdentity>,
}

impl SessionSnapshot {
    pub fn initializing() -> Self {
        Self {
            status: SessionStatus::Initializing,
            identity: None,
        }
    }

    pub fn role(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.role.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_session() {
        assert!(!SessionStatus::Initializing.has_session());
        assert!(!SessionStatus::NoSession.has_session());
        assert!(SessionStatus::Unlocked.has_session());
        assert!(SessionStatus::Locked.has_session());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&SessionStatus::NoSession).unwrap();
        assert_eq!(json, "\"no_session\"");
        assert_eq!(SessionStatus::NoSession.to_string(), "no_session");
    }
}
