//! Activity monitor: turns ambient input into activity ticks.
//!
//! While attached, every pointer move, key press, click and scroll is
//! forwarded to an [`ActivitySink`] as one tick. Nothing is debounced; the
//! sink decides what a tick means. A key press matching the configured lock
//! shortcut is reported as a lock request instead.

use crate::shortcut::KeyChord;
use crate::signals::{new_callback, HostSignal, HostSignals, ListenerGuard, SignalKind};
use std::sync::Arc;

/// Signal kinds that count as user activity.
pub const ACTIVITY_SIGNALS: &[SignalKind] = &[
    SignalKind::PointerMove,
    SignalKind::KeyDown,
    SignalKind::Click,
    SignalKind::Scroll,
];

/// Receiver of activity ticks.
pub trait ActivitySink: Send + Sync {
    /// One qualifying input signal was observed.
    fn activity(&self);

    /// The lock shortcut was pressed.
    fn lock_requested(&self);
}

/// Stateless description of what to watch; [`ActivityMonitor::attach`]
/// produces the live subscription.
#[derive(Debug, Clone, Default)]
pub struct ActivityMonitor {
    lock_shortcut: Option<KeyChord>,
}

impl ActivityMonitor {
    pub fn new(lock_shortcut: Option<KeyChord>) -> Self {
        Self { lock_shortcut }
    }

    pub fn lock_shortcut(&self) -> Option<&KeyChord> {
        self.lock_shortcut.as_ref()
    }

    /// Start forwarding signals to `sink` until the handle is dropped.
    pub fn attach(&self, signals: &HostSignals, sink: Arc<dyn ActivitySink>) -> MonitorHandle {
        let shortcut = self.lock_shortcut.clone();
        let guard = signals.subscribe(
            ACTIVITY_SIGNALS,
            new_callback(move |signal| match signal {
                HostSignal::KeyDown(chord)
                    if shortcut.as_ref().is_some_and(|s| s.matches(chord)) =>
                {
                    tracing::debug!(shortcut = %chord, "lock shortcut pressed");
                    sink.lock_requested();
                }
                _ => sink.activity(),
            }),
        );
        tracing::debug!("activity monitor attached");
        MonitorHandle { _guard: guard }
    }
}

/// Live activity subscription. Dropping it detaches the monitor.
#[must_use = "dropping the handle immediately detaches the monitor"]
pub struct MonitorHandle {
    _guard: ListenerGuard,
}

impl MonitorHandle {
    /// Detach explicitly; equivalent to dropping the handle.
    pub fn detach(self) {
        tracing::debug!("activity monitor detached");
    }
}
