//! Session lock state machine.
//!
//! ```text
//! Initializing ──probe──▶ Unlocked | NoSession
//! NoSession ──login──▶ Unlocked
//! Unlocked ──idle / lock() / shortcut──▶ Locked
//! Locked ──unlock(password)──▶ Unlocked
//! Unlocked | Locked ──logout──▶ NoSession
//! ```
//!
//! The idle timer and the activity monitor exist only while `Unlocked`:
//! entering that status arms one and attaches the other, leaving it cancels
//! and detaches both in the same critical section.

use crate::error::{Result, SessionError};
use crate::idle::IdleTimer;
use crate::identity::{IdentityError, IdentityService};
use crate::model::{SessionSnapshot, SessionStatus, TransitionCause, UserIdentity};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use welfare_events::{emit_event, event_names, now_ms, EventBusRef, SessionStatusChangedEvent};
use welfare_input::{
    ActivityMonitor, ActivitySink, HostSignals, KeyChord, MonitorHandle, DEFAULT_LOCK_SHORTCUT,
};
use welfare_storage::{PreferenceStore, LAST_USERNAME_KEY, SESSION_MARKER_KEY};

/// Idle duration before an unlocked session locks itself.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct SessionGuardConfig {
    pub idle_timeout: Duration,
    /// `None` disables the lock shortcut.
    pub lock_shortcut: Option<KeyChord>,
    /// Activity within this window after a rearm does not rearm again.
    /// Zero rearms on every signal.
    pub activity_coalesce: Duration,
}

impl Default for SessionGuardConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            lock_shortcut: DEFAULT_LOCK_SHORTCUT.parse().ok(),
            activity_coalesce: Duration::ZERO,
        }
    }
}

/// Result of the remote half of [`SessionGuard::logout`]. The local half
/// always succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteLogout {
    Invalidated,
    Failed(IdentityError),
    /// There was no session to invalidate.
    Skipped,
}

struct GuardState {
    status: SessionStatus,
    identity: Option<UserIdentity>,
    last_activity_at: Option<Instant>,
    last_rearm_at: Option<Instant>,
    monitor: Option<MonitorHandle>,
    shut_down: bool,
}

struct Inner {
    identity: Arc<dyn IdentityService>,
    prefs: Arc<dyn PreferenceStore>,
    events: EventBusRef,
    signals: HostSignals,
    monitor: ActivityMonitor,
    coalesce: Duration,
    idle: IdleTimer,
    state: Mutex<GuardState>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

struct StatusChange {
    from: SessionStatus,
    to: SessionStatus,
    username: Option<String>,
    cause: TransitionCause,
}

/// Owner of the process's single session.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct SessionGuard {
    inner: Arc<Inner>,
}

/// Activity sink handed to the monitor. Holds the guard weakly so an
/// attached monitor never keeps the guard alive.
struct GuardSink(Weak<Inner>);

impl ActivitySink for GuardSink {
    fn activity(&self) {
        if let Some(inner) = self.0.upgrade() {
            SessionGuard { inner }.record_activity();
        }
    }

    fn lock_requested(&self) {
        if let Some(inner) = self.0.upgrade() {
            SessionGuard { inner }.lock_with(TransitionCause::Shortcut);
        }
    }
}

impl SessionGuard {
    pub fn new(
        identity: Arc<dyn IdentityService>,
        prefs: Arc<dyn PreferenceStore>,
        events: EventBusRef,
        signals: HostSignals,
        config: SessionGuardConfig,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::initializing());
        Self {
            inner: Arc::new(Inner {
                identity,
                prefs,
                events,
                signals,
                monitor: ActivityMonitor::new(config.lock_shortcut),
                coalesce: config.activity_coalesce,
                idle: IdleTimer::new(config.idle_timeout),
                state: Mutex::new(GuardState {
                    status: SessionStatus::Initializing,
                    identity: None,
                    last_activity_at: None,
                    last_rearm_at: None,
                    monitor: None,
                    shut_down: false,
                }),
                snapshot_tx,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, GuardState> {
        self.inner.state.lock().expect("session state mutex poisoned")
    }

    pub fn status(&self) -> SessionStatus {
        self.state().status
    }

    pub fn identity(&self) -> Option<UserIdentity> {
        self.state().identity.clone()
    }

    pub fn has_session(&self) -> bool {
        self.status().has_session()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let st = self.state();
        SessionSnapshot {
            status: st.status,
            identity: st.identity.clone(),
        }
    }

    /// Watch every status change. The receiver starts at the current value.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Last recorded activity; `None` unless `Unlocked`.
    pub fn last_activity_at(&self) -> Option<Instant> {
        self.state().last_activity_at
    }

    /// When the idle timer is due, if armed.
    pub fn idle_deadline(&self) -> Option<Instant> {
        self.inner.idle.deadline()
    }

    pub fn is_monitoring(&self) -> bool {
        self.state().monitor.is_some()
    }

    /// Username of the last successful login, for prefilling the login form.
    pub fn remembered_username(&self) -> Option<String> {
        match self.inner.prefs.get(LAST_USERNAME_KEY) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read remembered username");
                None
            }
        }
    }

    /// Resolve the startup status. Only acts while `Initializing`.
    pub async fn probe_session(&self) -> SessionStatus {
        {
            let st = self.state();
            if st.status != SessionStatus::Initializing {
                tracing::debug!(status = %st.status, "session already resolved, probe skipped");
                return st.status;
            }
        }

        let result = self.inner.identity.probe_session().await;

        let change = {
            let mut st = self.state();
            if st.status != SessionStatus::Initializing {
                return st.status;
            }
            match result {
                Ok(identity) => {
                    self.remember(SESSION_MARKER_KEY, &identity.username);
                    self.apply(&mut st, SessionStatus::Unlocked, Some(identity), TransitionCause::Probe)
                }
                Err(e) => {
                    tracing::debug!(error = %e, "no existing session");
                    self.apply(&mut st, SessionStatus::NoSession, None, TransitionCause::Probe)
                }
            }
        };
        let status = change.to;
        self.publish(change);
        status
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserIdentity> {
        self.require(SessionStatus::NoSession, "log in")?;

        let identity = self
            .inner
            .identity
            .login(username, password)
            .await
            .map_err(|e| {
                tracing::warn!(username, error = %e, "login failed");
                SessionError::Authentication(e)
            })?;

        let change = {
            let mut st = self.state();
            if st.status != SessionStatus::NoSession {
                return Err(SessionError::Superseded("login"));
            }
            self.apply(
                &mut st,
                SessionStatus::Unlocked,
                Some(identity.clone()),
                TransitionCause::Login,
            )
        };
        self.publish(change);

        self.remember(LAST_USERNAME_KEY, username);
        self.remember(SESSION_MARKER_KEY, &identity.username);
        Ok(identity)
    }

    /// Lock the session. Returns whether a transition happened.
    pub fn lock(&self) -> bool {
        self.lock_with(TransitionCause::Manual)
    }

    fn lock_with(&self, cause: TransitionCause) -> bool {
        let change = {
            let mut st = self.state();
            match st.status {
                SessionStatus::Unlocked => {
                    let identity = st.identity.take();
                    self.apply(&mut st, SessionStatus::Locked, identity, cause)
                }
                status => {
                    tracing::debug!(%status, cause = cause.as_str(), "lock ignored");
                    return false;
                }
            }
        };
        self.publish(change);
        true
    }

    /// Re-authenticate the locked identity.
    pub async fn unlock(&self, password: &str) -> Result<()> {
        let username = {
            let st = self.state();
            match (&st.status, &st.identity) {
                (SessionStatus::Locked, Some(identity)) => identity.username.clone(),
                (status, _) => {
                    return Err(SessionError::InvalidTransition {
                        operation: "unlock",
                        status: *status,
                    })
                }
            }
        };

        let result = self.inner.identity.login(&username, password).await;

        let change = {
            let mut st = self.state();
            let still_locked = st.status == SessionStatus::Locked
                && st.identity.as_ref().is_some_and(|i| i.username == username);
            if !still_locked {
                return Err(SessionError::Superseded("unlock"));
            }
            match result {
                Ok(identity) if identity.username == username => self.apply(
                    &mut st,
                    SessionStatus::Unlocked,
                    Some(identity),
                    TransitionCause::Unlock,
                ),
                Ok(other) => {
                    tracing::warn!(
                        expected = %username,
                        actual = %other.username,
                        "unlock authenticated a different user"
                    );
                    return Err(SessionError::Authentication(IdentityError::InvalidCredentials));
                }
                Err(e) => {
                    tracing::warn!(username = %username, error = %e, "unlock failed");
                    return Err(SessionError::Authentication(e));
                }
            }
        };
        self.publish(change);
        Ok(())
    }

    /// End the session. Local state is reset to `NoSession` before the
    /// remote invalidation is attempted, so the reset holds even if the
    /// remote call fails or this future is dropped mid-flight.
    pub async fn logout(&self) -> RemoteLogout {
        let change = {
            let mut st = self.state();
            if !st.status.has_session() {
                tracing::debug!(status = %st.status, "logout without a session");
                return RemoteLogout::Skipped;
            }
            self.apply(&mut st, SessionStatus::NoSession, None, TransitionCause::Logout)
        };
        self.publish(change);

        if let Err(e) = self.inner.prefs.remove(SESSION_MARKER_KEY) {
            tracing::warn!(error = %e, "failed to clear session marker");
        }

        match self.inner.identity.logout().await {
            Ok(()) => RemoteLogout::Invalidated,
            Err(e) => {
                tracing::warn!(error = %e, "remote logout failed, local session cleared anyway");
                RemoteLogout::Failed(e)
            }
        }
    }

    /// One activity tick. Returns whether it counted (session `Unlocked`).
    /// Safe to call from threads outside the runtime.
    pub fn record_activity(&self) -> bool {
        let mut st = self.state();
        if st.status != SessionStatus::Unlocked || st.shut_down {
            return false;
        }
        let now = self.inner.idle.now();
        st.last_activity_at = Some(now);

        let coalesced = !self.inner.coalesce.is_zero()
            && st
                .last_rearm_at
                .is_some_and(|t| now.saturating_duration_since(t) < self.inner.coalesce);
        if !coalesced {
            st.last_rearm_at = Some(now);
            self.arm_idle(self.inner.idle.duration());
        }
        true
    }

    /// Cancel the idle timer and detach the activity monitor for good.
    /// Later transitions still update the status but never re-arm either.
    pub fn shutdown(&self) {
        let mut st = self.state();
        if st.shut_down {
            return;
        }
        st.shut_down = true;
        self.inner.idle.cancel();
        if let Some(monitor) = st.monitor.take() {
            monitor.detach();
        }
        tracing::info!(status = %st.status, "session guard shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.state().shut_down
    }

    fn require(&self, expected: SessionStatus, operation: &'static str) -> Result<()> {
        let status = self.status();
        if status == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition { operation, status })
        }
    }

    fn remember(&self, key: &str, value: &str) {
        if let Err(e) = self.inner.prefs.set(key, value) {
            tracing::warn!(key, error = %e, "failed to store preference");
        }
    }

    fn arm_idle(&self, after: Duration) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.idle.arm_for(after, move || {
            if let Some(inner) = weak.upgrade() {
                SessionGuard { inner }.on_idle_expired();
            }
        });
    }

    fn on_idle_expired(&self) {
        let change = {
            let mut st = self.state();
            if st.status != SessionStatus::Unlocked || st.shut_down {
                return;
            }
            let timeout = self.inner.idle.duration();
            let now = self.inner.idle.now();
            let idle_for = st
                .last_activity_at
                .map_or(timeout, |t| now.saturating_duration_since(t));
            if idle_for < timeout {
                // Coalesced activity moved the real deadline.
                st.last_rearm_at = Some(now);
                self.arm_idle(timeout - idle_for);
                return;
            }
            let identity = st.identity.take();
            self.apply(&mut st, SessionStatus::Locked, identity, TransitionCause::Idle)
        };
        self.publish(change);
    }

    /// Mutate the status and the resources tied to `Unlocked`. Runs under
    /// the state lock; the returned change is published after release.
    fn apply(
        &self,
        st: &mut GuardState,
        to: SessionStatus,
        identity: Option<UserIdentity>,
        cause: TransitionCause,
    ) -> StatusChange {
        let from = st.status;
        st.status = to;
        st.identity = identity;

        if to == SessionStatus::Unlocked {
            let now = self.inner.idle.now();
            st.last_activity_at = Some(now);
            st.last_rearm_at = Some(now);
            if !st.shut_down {
                self.arm_idle(self.inner.idle.duration());
                if st.monitor.is_none() {
                    let sink = Arc::new(GuardSink(Arc::downgrade(&self.inner)));
                    st.monitor = Some(self.inner.monitor.attach(&self.inner.signals, sink));
                }
            }
        } else {
            self.inner.idle.cancel();
            st.last_activity_at = None;
            st.last_rearm_at = None;
            if let Some(monitor) = st.monitor.take() {
                monitor.detach();
            }
        }

        self.inner.snapshot_tx.send_replace(SessionSnapshot {
            status: to,
            identity: st.identity.clone(),
        });

        StatusChange {
            from,
            to,
            username: st.identity.as_ref().map(|i| i.username.clone()),
            cause,
        }
    }

    fn publish(&self, change: StatusChange) {
        tracing::info!(
            from = %change.from,
            to = %change.to,
            cause = change.cause.as_str(),
            username = change.username.as_deref().unwrap_or("-"),
            "session status changed"
        );
        emit_event(
            self.inner.events.as_ref(),
            event_names::SESSION_STATUS_CHANGED,
            &SessionStatusChangedEvent {
                from: change.from.to_string(),
                to: change.to.to_string(),
                username: change.username,
                cause: change.cause.as_str().to_string(),
                timestamp_ms: now_ms(),
            },
        );
    }
}
