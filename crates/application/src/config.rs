//! Client configuration, loaded from a JSON file.
//!
//! Every field has a default, so a missing file or a partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use welfare_input::{parse_lock_shortcut, InputError, KeyChord, DEFAULT_LOCK_SHORTCUT};
use welfare_notifications::{FeedConfig, FetchOrdering, DEFAULT_PAGE_SIZE, MAX_POLL_INTERVAL};
use welfare_session::SessionGuardConfig;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
/// One day.
pub const MAX_IDLE_TIMEOUT_SECS: u64 = 86_400;

const CONFIG_FILE: &str = "client.json";
const DATABASE_FILE: &str = "preferences.db";
const APP_DIR: &str = "welfare";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("invalid lock_shortcut: {0}")]
    Shortcut(#[from] InputError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub idle_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub notification_page_size: u32,
    /// Empty disables the shortcut.
    pub lock_shortcut: String,
    /// WAV file for the primary alert tier. `None` uses the tone only.
    pub alert_asset_path: Option<PathBuf>,
    pub fetch_ordering: FetchOrdering,
    /// Zero rearms the idle timer on every activity signal.
    pub activity_coalesce_ms: u64,
    /// `None` uses the platform data directory.
    pub database_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            notification_page_size: DEFAULT_PAGE_SIZE,
            lock_shortcut: DEFAULT_LOCK_SHORTCUT.to_string(),
            alert_asset_path: None,
            fetch_ordering: FetchOrdering::default(),
            activity_coalesce_ms: 0,
            database_path: None,
        }
    }
}

impl ClientConfig {
    /// `<config dir>/welfare/client.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), "loaded client config");
        Ok(config)
    }

    /// Like [`ClientConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no client config, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(invalid("api_base_url", "must not be empty"));
        }
        if self.idle_timeout_secs == 0 {
            return Err(invalid("idle_timeout_secs", "must be greater than zero"));
        }
        if self.idle_timeout_secs > MAX_IDLE_TIMEOUT_SECS {
            return Err(invalid(
                "idle_timeout_secs",
                format!("must be at most {MAX_IDLE_TIMEOUT_SECS}"),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(invalid("poll_interval_secs", "must be greater than zero"));
        }
        if self.poll_interval_secs > MAX_POLL_INTERVAL.as_secs() {
            return Err(invalid(
                "poll_interval_secs",
                format!("must be at most {}", MAX_POLL_INTERVAL.as_secs()),
            ));
        }
        if self.notification_page_size == 0 {
            return Err(invalid("notification_page_size", "must be greater than zero"));
        }
        if self.activity_coalesce_ms >= self.idle_timeout_secs.saturating_mul(1_000) {
            return Err(invalid(
                "activity_coalesce_ms",
                "must be shorter than the idle timeout",
            ));
        }
        self.lock_chord()?;
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn activity_coalesce(&self) -> Duration {
        Duration::from_millis(self.activity_coalesce_ms)
    }

    pub fn lock_chord(&self) -> Result<Option<KeyChord>> {
        let shortcut = self.lock_shortcut.trim();
        if shortcut.is_empty() {
            return Ok(None);
        }
        Ok(Some(parse_lock_shortcut(shortcut)?))
    }

    pub fn session_config(&self) -> Result<SessionGuardConfig> {
        Ok(SessionGuardConfig {
            idle_timeout: self.idle_timeout(),
            lock_shortcut: self.lock_chord()?,
            activity_coalesce: self.activity_coalesce(),
        })
    }

    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            page_size: self.notification_page_size,
            ordering: self.fetch_ordering,
        }
    }

    /// Configured database path, else `<data dir>/welfare/preferences.db`.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join(APP_DIR).join(DATABASE_FILE)))
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
