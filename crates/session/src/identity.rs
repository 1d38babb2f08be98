//! Contract of the external identity service.

use crate::model::UserIdentity;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("no active session")]
    NoActiveSession,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("transport error: {0}")]
    Transport(String),
}

/// Remote identity operations used by the session guard.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Resolve the identity of an already-established remote session.
    async fn probe_session(&self) -> Result<UserIdentity, IdentityError>;

    async fn login(&self, username: &str, password: &str) -> Result<UserIdentity, IdentityError>;

    /// Invalidate the remote session.
    async fn logout(&self) -> Result<(), IdentityError>;
}
