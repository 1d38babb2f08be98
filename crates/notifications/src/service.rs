use crate::model::{NotificationSummary, RoleScope};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use welfare_audio::AudioAlert;

/// Remote notification operations used by the feed.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Fetch at most `limit` notifications visible to `scope`.
    async fn fetch_summary(&self, scope: &RoleScope, limit: u32) -> Result<NotificationSummary>;

    async fn mark_read(&self, id: &str) -> Result<()>;
}

/// Sink for the once-per-batch new-arrival cue.
pub trait ArrivalAlert: Send + Sync {
    fn alert(&self);
}

/// Plays an [`AudioAlert`] on the runtime's blocking pool.
///
/// Opening an output device can block, so the feed never plays the alert
/// on the task that applied the refresh. Outside a runtime it plays inline.
pub struct OffloadedAlert {
    alert: Arc<AudioAlert>,
}

impl OffloadedAlert {
    pub fn new(alert: Arc<AudioAlert>) -> Self {
        Self { alert }
    }
}

impl ArrivalAlert for OffloadedAlert {
    fn alert(&self) {
        let alert = Arc::clone(&self.alert);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || {
                    let outcome = alert.play();
                    tracing::debug!(?outcome, "arrival alert played");
                });
            }
            Err(_) => {
                alert.play();
            }
        }
    }
}
