//! Single-shot, re-armable idle timer.
//!
//! Each arm spawns one sleeping task guarded by a [`CancellationToken`].
//! Re-arming cancels the previous task and bumps a generation counter, so a
//! task that wakes after being superseded never runs its callback.
//!
//! The runtime handle is captured at construction, so the timer can be
//! re-armed from threads that are not part of the runtime (a host's UI
//! thread dispatching input signals, for example).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Longest delay a single arm waits. Longer requests are clamped so the
/// deadline never overflows the clock.
pub const MAX_ARM_DELAY: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

struct Armed {
    generation: u64,
    deadline: Instant,
    cancel: CancellationToken,
}

pub struct IdleTimer {
    duration: Duration,
    runtime: Option<Handle>,
    slot: Arc<Mutex<Option<Armed>>>,
    generation: AtomicU64,
}

impl IdleTimer {
    /// Create a timer bound to the current Tokio runtime, if any.
    pub fn new(duration: Duration) -> Self {
        Self::with_runtime(duration, Handle::try_current().ok())
    }

    /// Create a timer that spawns its expiry tasks on `runtime`.
    pub fn with_runtime(duration: Duration, runtime: Option<Handle>) -> Self {
        Self {
            duration,
            runtime,
            slot: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    fn handle(&self) -> Option<Handle> {
        self.runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
    }

    /// Current time on the timer's runtime clock, callable from any thread.
    pub fn now(&self) -> Instant {
        match self.handle() {
            Some(handle) => {
                let _enter = handle.enter();
                Instant::now()
            }
            None => Instant::now(),
        }
    }

    /// Full idle duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Cancel any pending expiry and arm for the full duration.
    pub fn arm<F>(&self, on_expire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.arm_for(self.duration, on_expire);
    }

    /// Cancel any pending expiry and arm to fire `after` from now.
    ///
    /// Needs a runtime handle, captured at construction or current on the
    /// calling thread. Without one the request is logged and any pending
    /// expiry is left in place.
    pub fn arm_for<F>(&self, after: Duration, on_expire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(handle) = self.handle() else {
            tracing::error!("idle timer armed without a runtime, keeping previous deadline");
            return;
        };
        let _enter = handle.enter();

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let deadline = Instant::now() + after.min(MAX_ARM_DELAY);
        let cancel = CancellationToken::new();

        let previous = self
            .slot
            .lock()
            .expect("idle timer mutex poisoned")
            .replace(Armed {
                generation,
                deadline,
                cancel: cancel.clone(),
            });
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        let slot = Arc::clone(&self.slot);
        handle.spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep_until(deadline) => {}
            }

            let current = {
                let mut slot = slot.lock().expect("idle timer mutex poisoned");
                match slot.as_ref() {
                    Some(armed) if armed.generation == generation => {
                        slot.take();
                        true
                    }
                    _ => false,
                }
            };
            if current {
                tracing::trace!(generation, "idle timer expired");
                on_expire();
            }
        });
    }

    /// Disarm. Returns whether a pending expiry was canceled.
    pub fn cancel(&self) -> bool {
        let armed = self.slot.lock().expect("idle timer mutex poisoned").take();
        match armed {
            Some(armed) => {
                armed.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.slot
            .lock()
            .expect("idle timer mutex poisoned")
            .is_some()
    }

    /// When the pending expiry is due, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.slot
            .lock()
            .expect("idle timer mutex poisoned")
            .as_ref()
            .map(|a| a.deadline)
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
