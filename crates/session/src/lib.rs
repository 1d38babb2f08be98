//! Session lock state machine for the welfare client.
//!
//! [`SessionGuard`] owns the single authenticated session: its status, the
//! bound identity, the idle timer and the activity subscription that feeds
//! it. Remote authentication goes through an [`IdentityService`].

mod error;
mod guard;
mod identity;
mod idle;
mod model;

pub use error::{Result, SessionError};
pub use guard::{RemoteLogout, SessionGuard, SessionGuardConfig, DEFAULT_IDLE_TIMEOUT};
pub use identity::{IdentityError, IdentityService};
pub use idle::{IdleTimer, MAX_ARM_DELAY};
pub use model::{SessionSnapshot, SessionStatus, TransitionCause, UserIdentity};
