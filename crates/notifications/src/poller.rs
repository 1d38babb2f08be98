//! Feed poller: background task that keeps a mounted feed fresh.
//!
//! On start it refreshes once silently, so pre-existing backlog never
//! sounds the alert, then refreshes on every interval tick with the alert
//! enabled. A scope change restarts the cycle. Stopping or dropping the
//! poller cancels the task, including a fetch that is still in flight.

use crate::feed::{NotificationFeed, RefreshOptions};
use crate::model::RoleScope;
use crate::{FeedError, Result};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Default polling interval for notification summaries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Longest accepted polling interval (one day).
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(86_400);

#[derive(Default)]
pub struct FeedPoller {
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl FeedPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start polling `feed` at the default interval.
    pub fn start(
        &mut self,
        feed: NotificationFeed,
        scopes: watch::Receiver<RoleScope>,
    ) -> Result<()> {
        self.start_with_interval(feed, scopes, DEFAULT_POLL_INTERVAL)
    }

    /// Start polling with a custom interval. Must run inside a Tokio runtime.
    ///
    /// The interval must be non-zero and at most [`MAX_POLL_INTERVAL`].
    pub fn start_with_interval(
        &mut self,
        feed: NotificationFeed,
        mut scopes: watch::Receiver<RoleScope>,
        interval: Duration,
    ) -> Result<()> {
        if interval.is_zero() || interval > MAX_POLL_INTERVAL {
            return Err(FeedError::InvalidInterval(interval));
        }
        if self.is_running() {
            tracing::warn!("FeedPoller already running");
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            tracing::info!(?interval, scope = %feed.scope(), "FeedPoller started");

            'cycle: loop {
                feed.set_scope(scopes.borrow_and_update().clone());
                tokio::select! {
                    _ = token.cancelled() => break 'cycle,
                    result = feed.refresh(RefreshOptions::SILENT) => {
                        if let Err(e) = result {
                            tracing::warn!(error = %e, "initial notification fetch failed");
                        }
                    }
                }

                let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = token.cancelled() => break 'cycle,
                        changed = scopes.changed() => {
                            if changed.is_err() {
                                tracing::debug!("scope source closed");
                                break 'cycle;
                            }
                            continue 'cycle;
                        }
                        _ = ticker.tick() => {}
                    }

                    tokio::select! {
                        _ = token.cancelled() => break 'cycle,
                        result = feed.refresh(RefreshOptions::WITH_SOUND) => {
                            if let Err(e) = result {
                                tracing::warn!(error = %e, "notification poll failed, retrying next tick");
                            }
                        }
                    }
                }
            }

            tracing::info!("FeedPoller stopped");
        });

        self.cancel = Some(cancel);
        self.handle = Some(handle);
        Ok(())
    }

    /// Stop the poller. No refresh starts or applies after this returns.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for FeedPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
