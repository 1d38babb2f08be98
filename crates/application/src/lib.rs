//! Welfare client core, wired together.
//!
//! - [`ClientConfig`]: JSON configuration with defaults and validation
//! - [`Shell`]: owns the session guard and mounts the notification feed
//!   while the session is unlocked
//! - [`build_alert`]: the arrival alert for the compiled-in audio output

mod alert;
mod config;
mod shell;

pub use alert::build_alert;
pub use config::{
    ClientConfig, ConfigError, DEFAULT_API_BASE_URL, DEFAULT_IDLE_TIMEOUT_SECS,
    DEFAULT_POLL_INTERVAL_SECS, MAX_IDLE_TIMEOUT_SECS,
};
pub use shell::{Result, Services, Shell, ShellError};
