//! Registry of ambient host input signals.
//!
//! The host (window shell, console driver, test) dispatches raw input
//! signals here; subsystems subscribe for the kinds they care about.
//! Subscriptions are RAII: dropping the [`ListenerGuard`] unregisters the
//! callback before `drop` returns, so no listener outlives its owner.

use crate::shortcut::KeyChord;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// A single ambient input signal from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSignal {
    PointerMove,
    KeyDown(KeyChord),
    Click,
    Scroll,
    /// Pointer pressed anywhere; used as the user-gesture trigger for audio.
    PointerDown,
}

/// Discriminant of [`HostSignal`] used for subscription filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    PointerMove,
    KeyDown,
    Click,
    Scroll,
    PointerDown,
}

impl HostSignal {
    pub fn kind(&self) -> SignalKind {
        match self {
            HostSignal::PointerMove => SignalKind::PointerMove,
            HostSignal::KeyDown(_) => SignalKind::KeyDown,
            HostSignal::Click => SignalKind::Click,
            HostSignal::Scroll => SignalKind::Scroll,
            HostSignal::PointerDown => SignalKind::PointerDown,
        }
    }
}

/// Callback invoked for each matching signal.
pub type SignalCallback = Arc<dyn Fn(&HostSignal) + Send + Sync + 'static>;

pub fn new_callback<F>(f: F) -> SignalCallback
where
    F: Fn(&HostSignal) + Send + Sync + 'static,
{
    Arc::new(f)
}

struct Listener {
    id: u64,
    kinds: Vec<SignalKind>,
    once: bool,
    callback: SignalCallback,
}

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<Listener>>,
}

impl Registry {
    fn remove(&self, id: u64) -> bool {
        let mut listeners = self.listeners.lock().expect("signal registry mutex poisoned");
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }
}

/// Shared handle to the host signal registry. Cloning shares the registry.
#[derive(Clone, Default)]
pub struct HostSignals {
    registry: Arc<Registry>,
}

impl HostSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `callback` to every signal whose kind is in `kinds`.
    pub fn subscribe(&self, kinds: &[SignalKind], callback: SignalCallback) -> ListenerGuard {
        self.register(kinds.to_vec(), false, callback)
    }

    /// Subscribe `callback` to the first signal of `kind` only.
    ///
    /// The listener removes itself before the callback runs, so it fires at
    /// most once even if the callback dispatches further signals.
    pub fn subscribe_once(&self, kind: SignalKind, callback: SignalCallback) -> ListenerGuard {
        self.register(vec![kind], true, callback)
    }

    fn register(&self, kinds: Vec<SignalKind>, once: bool, callback: SignalCallback) -> ListenerGuard {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .listeners
            .lock()
            .expect("signal registry mutex poisoned")
            .push(Listener {
                id,
                kinds,
                once,
                callback,
            });
        tracing::trace!(listener_id = id, once, "signal listener registered");

        ListenerGuard {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `signal` to every matching listener. Returns how many ran.
    ///
    /// Callbacks run outside the registry lock, so they may subscribe,
    /// unsubscribe or dispatch without deadlocking.
    pub fn dispatch(&self, signal: HostSignal) -> usize {
        let kind = signal.kind();
        let callbacks: Vec<SignalCallback> = {
            let mut listeners = self
                .registry
                .listeners
                .lock()
                .expect("signal registry mutex poisoned");
            let matching: Vec<SignalCallback> = listeners
                .iter()
                .filter(|l| l.kinds.contains(&kind))
                .map(|l| Arc::clone(&l.callback))
                .collect();
            listeners.retain(|l| !(l.once && l.kinds.contains(&kind)));
            matching
        };

        for callback in &callbacks {
            callback(&signal);
        }
        callbacks.len()
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.registry
            .listeners
            .lock()
            .expect("signal registry mutex poisoned")
            .len()
    }
}

/// Keeps a listener registered; dropping it unregisters synchronously.
#[must_use = "dropping the guard immediately unsubscribes the listener"]
pub struct ListenerGuard {
    id: u64,
    registry: Weak<Registry>,
}

impl ListenerGuard {
    /// Whether the listener is still registered (single-fire listeners
    /// become inactive after their first delivery).
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|r| {
                r.listeners
                    .lock()
                    .expect("signal registry mutex poisoned")
                    .iter()
                    .any(|l| l.id == self.id)
            })
            .unwrap_or(false)
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.remove(self.id) {
                tracing::trace!(listener_id = self.id, "signal listener removed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, SignalCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let callback = new_callback(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    #[test]
    fn test_dispatch_filters_by_kind() {
        let signals = HostSignals::new();
        let (count, callback) = counter();
        let _guard = signals.subscribe(&[SignalKind::Click, SignalKind::Scroll], callback);

        assert_eq!(signals.dispatch(HostSignal::Click), 1);
        assert_eq!(signals.dispatch(HostSignal::Scroll), 1);
        assert_eq!(signals.dispatch(HostSignal::PointerMove), 0);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_guard_unsubscribes() {
        let signals = HostSignals::new();
        let (count, callback) = counter();
        let guard = signals.subscribe(&[SignalKind::Click], callback);
        assert_eq!(signals.listener_count(), 1);

        drop(guard);
        assert_eq!(signals.listener_count(), 0);

        signals.dispatch(HostSignal::Click);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscribe_once_fires_a_single_time() {
        let signals = HostSignals::new();
        let (count, callback) = counter();
        let guard = signals.subscribe_once(SignalKind::PointerDown, callback);
        assert!(guard.is_active());

        signals.dispatch(HostSignal::PointerDown);
        signals.dispatch(HostSignal::PointerDown);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!guard.is_active());
        assert_eq!(signals.listener_count(), 0);
    }

    #[test]
    fn test_callback_may_dispatch_reentrantly() {
        let signals = HostSignals::new();
        let (count, callback) = counter();
        let _counting = signals.subscribe(&[SignalKind::Scroll], callback);

        let inner = signals.clone();
        let _forwarding = signals.subscribe(
            &[SignalKind::Click],
            new_callback(move |_| {
                inner.dispatch(HostSignal::Scroll);
            }),
        );

        signals.dispatch(HostSignal::Click);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_outliving_registry_is_harmless() {
        let signals = HostSignals::new();
        let (_count, callback) = counter();
        let guard = signals.subscribe(&[SignalKind::Click], callback);
        drop(signals);
        assert!(!guard.is_active());
        drop(guard);
    }
}
