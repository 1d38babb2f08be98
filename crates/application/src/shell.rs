//! Composition root.
//!
//! The shell owns the one [`SessionGuard`], the host signal registry and the
//! arrival alert, and mounts the notification feed while the session is
//! `Unlocked`. Hosts talk to the core only through a [`Shell`] handle.

use crate::config::{ClientConfig, ConfigError};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use welfare_audio::AudioAlert;
use welfare_events::EventBusRef;
use welfare_input::{new_callback, HostSignal, HostSignals, ListenerGuard, SignalKind};
use welfare_notifications::{
    FeedConfig, FeedError, FeedPoller, FeedSnapshot, NotificationFeed, NotificationService,
    OffloadedAlert, RefreshOptions, RefreshOutcome, RoleScope,
};
use welfare_session::{
    IdentityService, RemoteLogout, SessionError, SessionGuard, SessionSnapshot, SessionStatus,
    UserIdentity,
};
use welfare_storage::PreferenceStore;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("notifications are not available while the session is {0}")]
    FeedNotMounted(SessionStatus),
}

pub type Result<T> = std::result::Result<T, ShellError>;

/// External collaborators the shell is wired to.
pub struct Services {
    pub identity: Arc<dyn IdentityService>,
    pub notifications: Arc<dyn NotificationService>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub alert: Arc<AudioAlert>,
    pub events: EventBusRef,
}

struct FeedMount {
    feed: NotificationFeed,
    scope_tx: watch::Sender<RoleScope>,
    _poller: FeedPoller,
}

struct ShellInner {
    session: SessionGuard,
    signals: HostSignals,
    alert: Arc<AudioAlert>,
    notifications: Arc<dyn NotificationService>,
    events: EventBusRef,
    feed_config: FeedConfig,
    poll_interval: Duration,
    mount: Mutex<Option<FeedMount>>,
    gesture: Mutex<Option<ListenerGuard>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

#[derive(Clone)]
pub struct Shell {
    inner: Arc<ShellInner>,
}

impl Shell {
    pub fn new(config: &ClientConfig, services: Services) -> Result<Self> {
        config.validate()?;
        let signals = HostSignals::new();
        let session = SessionGuard::new(
            services.identity,
            services.preferences,
            services.events.clone(),
            signals.clone(),
            config.session_config()?,
        );

        Ok(Self {
            inner: Arc::new(ShellInner {
                session,
                signals,
                alert: services.alert,
                notifications: services.notifications,
                events: services.events,
                feed_config: config.feed_config(),
                poll_interval: config.poll_interval(),
                mount: Mutex::new(None),
                gesture: Mutex::new(None),
                supervisor: Mutex::new(None),
                cancel: CancellationToken::new(),
            }),
        })
    }

    /// Install the gesture unlock, start following session changes and run
    /// the startup probe. Must run inside a Tokio runtime.
    pub async fn start(&self) -> SessionStatus {
        self.install_gesture_unlock();
        self.spawn_supervisor();
        let status = self.inner.session.probe_session().await;
        self.inner.sync_feed(&self.inner.session.snapshot());
        status
    }

    fn install_gesture_unlock(&self) {
        let mut gesture = self.inner.gesture.lock().expect("gesture mutex poisoned");
        if gesture.is_some() {
            return;
        }
        let alert = Arc::clone(&self.inner.alert);
        *gesture = Some(self.inner.signals.subscribe_once(
            SignalKind::PointerDown,
            new_callback(move |_| {
                alert.unlock_with_gesture();
            }),
        ));
    }

    fn spawn_supervisor(&self) {
        let mut supervisor = self.inner.supervisor.lock().expect("supervisor mutex poisoned");
        if supervisor.is_some() {
            return;
        }
        let mut snapshots = self.inner.session.subscribe();
        let cancel = self.inner.cancel.clone();
        let weak: Weak<ShellInner> = Arc::downgrade(&self.inner);

        *supervisor = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = snapshots.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let snapshot = snapshots.borrow_and_update().clone();
                let Some(inner) = weak.upgrade() else { break };
                inner.sync_feed(&snapshot);
            }
            tracing::debug!("shell supervisor stopped");
        }));
    }

    pub fn session(&self) -> &SessionGuard {
        &self.inner.session
    }

    pub fn signals(&self) -> &HostSignals {
        &self.inner.signals
    }

    pub fn alert(&self) -> &AudioAlert {
        &self.inner.alert
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.session.snapshot()
    }

    /// The mounted feed, present only while `Unlocked`.
    pub fn feed(&self) -> Option<NotificationFeed> {
        self.inner.mount().as_ref().map(|m| m.feed.clone())
    }

    pub fn feed_snapshot(&self) -> Option<FeedSnapshot> {
        self.feed().map(|f| f.snapshot())
    }

    /// Forward one host input signal to every subscriber.
    pub fn dispatch(&self, signal: HostSignal) -> usize {
        self.inner.signals.dispatch(signal)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserIdentity> {
        let identity = self.inner.session.login(username, password).await?;
        self.inner.sync_feed(&self.inner.session.snapshot());
        Ok(identity)
    }

    pub fn lock(&self) -> bool {
        let locked = self.inner.session.lock();
        self.inner.sync_feed(&self.inner.session.snapshot());
        locked
    }

    pub async fn unlock(&self, password: &str) -> Result<()> {
        self.inner.session.unlock(password).await?;
        self.inner.sync_feed(&self.inner.session.snapshot());
        Ok(())
    }

    pub async fn logout(&self) -> RemoteLogout {
        let remote = self.inner.session.logout().await;
        self.inner.sync_feed(&self.inner.session.snapshot());
        remote
    }

    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let feed = self.mounted_feed()?;
        Ok(feed.refresh(RefreshOptions::SILENT).await?)
    }

    pub async fn mark_as_read(&self, id: &str) -> Result<RefreshOutcome> {
        let feed = self.mounted_feed()?;
        Ok(feed.mark_as_read(id).await?)
    }

    fn mounted_feed(&self) -> Result<NotificationFeed> {
        self.feed()
            .ok_or_else(|| ShellError::FeedNotMounted(self.inner.session.status()))
    }

    /// Tear everything down: supervisor, feed, gesture listener, idle timer
    /// and activity monitor. Idempotent.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self
            .inner
            .supervisor
            .lock()
            .expect("supervisor mutex poisoned")
            .take()
        {
            handle.abort();
        }
        self.inner.unmount_feed();
        self.inner
            .gesture
            .lock()
            .expect("gesture mutex poisoned")
            .take();
        self.inner.session.shutdown();
        tracing::info!("shell shut down");
    }
}

impl ShellInner {
    fn mount(&self) -> MutexGuard<'_, Option<FeedMount>> {
        self.mount.lock().expect("feed mount mutex poisoned")
    }

    /// Mount, rescope or unmount the feed to match `snapshot`.
    fn sync_feed(&self, snapshot: &SessionSnapshot) {
        if self.cancel.is_cancelled() {
            return;
        }
        let role = match (snapshot.status, snapshot.role()) {
            (SessionStatus::Unlocked, Some(role)) => RoleScope::new(role),
            _ => {
                self.unmount_feed();
                return;
            }
        };

        let mut mount = self.mount();
        match mount.as_ref() {
            Some(existing) => {
                existing.scope_tx.send_if_modified(|scope| {
                    if *scope == role {
                        return false;
                    }
                    *scope = role;
                    true
                });
            }
            None => {
                tracing::info!(scope = %role, "mounting notification feed");
                let feed = NotificationFeed::new(
                    Arc::clone(&self.notifications),
                    Arc::new(OffloadedAlert::new(Arc::clone(&self.alert))),
                    self.events.clone(),
                    role.clone(),
                    self.feed_config.clone(),
                );
                let (scope_tx, scope_rx) = watch::channel(role);
                let mut poller = FeedPoller::new();
                let started = poller.start_with_interval(feed.clone(), scope_rx, self.poll_interval);
                if let Err(e) = started {
                    tracing::error!(error = %e, "notification poller not started");
                    return;
                }
                *mount = Some(FeedMount {
                    feed,
                    scope_tx,
                    _poller: poller,
                });
            }
        }
    }

    fn unmount_feed(&self) {
        if let Some(mount) = self.mount().take() {
            drop(mount);
            tracing::info!("notification feed unmounted");
        }
    }
}

impl Drop for ShellInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
