//! End-to-end tests of the shell with in-process services.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use welfare_application::{ClientConfig, Services, Shell, ShellError};
use welfare_audio::{AudioAlert, GestureState, ToneBackend, ToneVoice};
use welfare_events::{event_names, EventBusRef, InMemoryEventBus};
use welfare_input::{HostSignal, KeyChord};
use welfare_notifications::{NotificationItem, NotificationService, NotificationSummary, RoleScope};
use welfare_session::{IdentityError, IdentityService, SessionStatus, UserIdentity};
use welfare_storage::MemoryPreferences;

const PASSWORD: &str = "hunter2";

struct FakeIdentity {
    existing: bool,
}

fn counsellor() -> UserIdentity {
    UserIdentity {
        username: "counsellor".into(),
        display_name: "School Counsellor".into(),
        role: "counsellor".into(),
    }
}

#[async_trait]
impl IdentityService for FakeIdentity {
    async fn probe_session(&self) -> Result<UserIdentity, IdentityError> {
        if self.existing {
            Ok(counsellor())
        } else {
            Err(IdentityError::NoActiveSession)
        }
    }

    async fn login(&self, username: &str, password: &str) -> Result<UserIdentity, IdentityError> {
        if username == "counsellor" && password == PASSWORD {
            Ok(counsellor())
        } else {
            Err(IdentityError::InvalidCredentials)
        }
    }

    async fn logout(&self) -> Result<(), IdentityError> {
        Err(IdentityError::Transport("offline".into()))
    }
}

#[derive(Default)]
struct FakeNotifications {
    ids: Mutex<Vec<String>>,
    fetches: AtomicUsize,
}

impl FakeNotifications {
    fn push(&self, id: &str) {
        self.ids.lock().unwrap().insert(0, id.to_string());
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationService for FakeNotifications {
    async fn fetch_summary(
        &self,
        _scope: &RoleScope,
        limit: u32,
    ) -> welfare_notifications::Result<NotificationSummary> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let ids = self.ids.lock().unwrap().clone();
        Ok(NotificationSummary {
            unread_count: ids.len() as u32,
            items: ids
                .into_iter()
                .take(limit as usize)
                .map(|id| NotificationItem {
                    title: format!("Notice {id}"),
                    id,
                    body: String::new(),
                    created_at: Utc::now(),
                    read: false,
                })
                .collect(),
        })
    }

    async fn mark_read(&self, _id: &str) -> welfare_notifications::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct CountingTones(Arc<AtomicUsize>);

struct SilentVoice(Arc<AtomicUsize>);

impl ToneBackend for CountingTones {
    fn open(&self) -> welfare_audio::Result<Box<dyn ToneVoice>> {
        Ok(Box::new(SilentVoice(Arc::clone(&self.0))))
    }
}

impl ToneVoice for SilentVoice {
    fn sample_rate(&self) -> u32 {
        8_000
    }

    fn play(&mut self, _samples: &[f32]) -> welfare_audio::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Harness {
    shell: Shell,
    notifications: Arc<FakeNotifications>,
    tones: Arc<AtomicUsize>,
    events: Arc<InMemoryEventBus>,
}

fn harness(existing: bool) -> Harness {
    let notifications = Arc::new(FakeNotifications::default());
    let tones = CountingTones::default();
    let played = Arc::clone(&tones.0);
    let events = Arc::new(InMemoryEventBus::new());
    let bus: EventBusRef = events.clone();

    let shell = Shell::new(
        &ClientConfig::default(),
        Services {
            identity: Arc::new(FakeIdentity { existing }),
            notifications: notifications.clone(),
            preferences: Arc::new(MemoryPreferences::new()),
            alert: Arc::new(AudioAlert::new(None, Arc::new(tones))),
            events: bus,
        },
    )
    .unwrap();

    Harness {
        shell,
        notifications,
        tones: played,
        events,
    }
}

async fn advance(d: Duration) {
    tokio::time::sleep(d).await;
    tokio::task::yield_now().await;
}

/// Alerts play on the blocking pool; wait for them in real time.
fn wait_for_tones(tones: &AtomicUsize, expected: usize) {
    for _ in 0..200 {
        if tones.load(Ordering::SeqCst) >= expected {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[tokio::test(start_paused = true)]
async fn test_feed_mounts_only_while_unlocked() {
    let h = harness(false);
    assert_eq!(h.shell.start().await, SessionStatus::NoSession);
    assert!(h.shell.feed().is_none());

    h.shell.login("counsellor", PASSWORD).await.unwrap();
    assert!(h.shell.feed().is_some());

    h.shell.lock();
    assert!(h.shell.feed().is_none());
    assert!(matches!(
        h.shell.refresh().await,
        Err(ShellError::FeedNotMounted(SessionStatus::Locked))
    ));

    h.shell.unlock(PASSWORD).await.unwrap();
    assert!(h.shell.feed().is_some());

    h.shell.logout().await;
    assert_eq!(h.shell.snapshot().status, SessionStatus::NoSession);
    assert!(h.shell.feed().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_poll_alerts_on_new_arrivals() {
    let h = harness(true);
    h.notifications.push("1");
    h.shell.start().await;

    advance(Duration::from_millis(1)).await;
    assert_eq!(h.notifications.fetches(), 1);
    assert_eq!(h.tones.load(Ordering::SeqCst), 0);

    h.notifications.push("2");
    h.shell.dispatch(HostSignal::PointerMove);
    advance(Duration::from_secs(30)).await;

    assert_eq!(h.notifications.fetches(), 2);
    wait_for_tones(&h.tones, 1);
    assert_eq!(h.tones.load(Ordering::SeqCst), 1);
    assert_eq!(h.shell.feed_snapshot().unwrap().unread_count, 2);
    assert_eq!(
        h.events
            .events_for(event_names::NOTIFICATIONS_NEW_ARRIVALS)
            .len(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_idle_lock_unmounts_feed() {
    let h = harness(true);
    h.shell.start().await;

    advance(Duration::from_secs(301)).await;

    assert_eq!(h.shell.snapshot().status, SessionStatus::Locked);
    assert!(h.shell.feed().is_none());

    let fetches = h.notifications.fetches();
    advance(Duration::from_secs(600)).await;
    assert_eq!(h.notifications.fetches(), fetches);
}

#[tokio::test(start_paused = true)]
async fn test_shortcut_lock_unmounts_feed() {
    let h = harness(true);
    h.shell.start().await;

    h.shell
        .dispatch(HostSignal::KeyDown(KeyChord::key("l").with_ctrl().with_shift()));
    advance(Duration::from_millis(1)).await;

    assert_eq!(h.shell.snapshot().status, SessionStatus::Locked);
    assert!(h.shell.feed().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_first_pointer_down_unlocks_audio_once() {
    let h = harness(false);
    h.shell.start().await;
    assert_eq!(h.shell.alert().gesture_state(), GestureState::AwaitingGesture);

    assert_eq!(h.shell.dispatch(HostSignal::PointerDown), 1);
    assert_eq!(h.shell.alert().gesture_state(), GestureState::Unlocked);
    assert_eq!(h.shell.dispatch(HostSignal::PointerDown), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_is_inert() {
    let h = harness(true);
    h.shell.start().await;
    advance(Duration::from_millis(1)).await;
    let fetches = h.notifications.fetches();

    h.shell.shutdown();

    assert!(h.shell.feed().is_none());
    assert_eq!(h.shell.signals().listener_count(), 0);
    advance(Duration::from_secs(3_600)).await;
    assert_eq!(h.notifications.fetches(), fetches);
    assert_eq!(h.shell.snapshot().status, SessionStatus::Unlocked);
}
