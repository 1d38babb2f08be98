//! Host input handling for the welfare client.
//!
//! - [`HostSignals`]: registry the host dispatches raw input signals into
//! - [`ActivityMonitor`]: forwards qualifying signals as activity ticks
//! - [`KeyChord`]: key chords and the lock shortcut
//!
//! # Example
//!
//! ```ignore
//! use welfare_input::{ActivityMonitor, HostSignal, HostSignals};
//!
//! let signals = HostSignals::new();
//! let handle = ActivityMonitor::default().attach(&signals, sink);
//! signals.dispatch(HostSignal::PointerMove);
//! drop(handle); // listener removed
//! ```

mod error;
mod monitor;
mod shortcut;
mod signals;

pub use error::InputError;
pub use monitor::{ActivityMonitor, ActivitySink, MonitorHandle, ACTIVITY_SIGNALS};
pub use shortcut::{parse_lock_shortcut, KeyChord, DEFAULT_LOCK_SHORTCUT};
pub use signals::{
    new_callback, HostSignal, HostSignals, ListenerGuard, SignalCallback, SignalKind,
};
