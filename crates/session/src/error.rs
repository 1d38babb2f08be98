use crate::identity::IdentityError;
use crate::model::SessionStatus;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Login or unlock was rejected; the session status is unchanged.
    #[error("authentication failed: {0}")]
    Authentication(#[source] IdentityError),

    #[error("cannot {operation} while session is {status}")]
    InvalidTransition {
        operation: &'static str,
        status: SessionStatus,
    },

    /// The session changed while the remote call was in flight.
    #[error("session changed during {0}")]
    Superseded(&'static str),
}

pub type Result<T> = std::result::Result<T, SessionError>;
