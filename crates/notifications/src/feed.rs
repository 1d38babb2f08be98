//! Notification feed state and the refresh operation.
//!
//! Each successful fetch replaces the whole state. The ids of the previous
//! fetch are kept only to compute the next fetch's new-arrival delta.

use crate::model::{NotificationItem, RoleScope};
use crate::service::{ArrivalAlert, NotificationService};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use welfare_events::{
    emit_event, event_names, now_ms, EventBusRef, NewArrivalsEvent, NotificationsUpdatedEvent,
};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// How concurrent refreshes that resolve out of order are reconciled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOrdering {
    /// Whichever response resolves last overwrites the state.
    #[default]
    LastResolvedWins,
    /// Responses older than the last applied one are dropped.
    DiscardStale,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub page_size: u32,
    pub ordering: FetchOrdering,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            ordering: FetchOrdering::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOptions {
    pub play_sound_on_new: bool,
}

impl RefreshOptions {
    pub const SILENT: Self = Self {
        play_sound_on_new: false,
    };
    pub const WITH_SOUND: Self = Self {
        play_sound_on_new: true,
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied {
        /// Ids absent from the previous fetch, in feed order.
        new_ids: Vec<String>,
        alerted: bool,
    },
    /// An earlier-started refresh resolved after a later one was applied.
    Discarded { seq: u64 },
}

/// Read-only copy of the feed state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub items: Vec<NotificationItem>,
    pub unread_count: u32,
    pub has_fetched: bool,
}

#[derive(Default)]
struct FeedState {
    items: Vec<NotificationItem>,
    unread_count: u32,
    known_ids: HashSet<String>,
    has_fetched: bool,
    applied_seq: u64,
}

struct FeedInner {
    service: Arc<dyn NotificationService>,
    alert: Arc<dyn ArrivalAlert>,
    events: EventBusRef,
    config: FeedConfig,
    scope: Mutex<RoleScope>,
    next_seq: AtomicU64,
    state: Mutex<FeedState>,
}

/// Handle to one mounted feed. Clones share state.
#[derive(Clone)]
pub struct NotificationFeed {
    inner: Arc<FeedInner>,
}

impl NotificationFeed {
    pub fn new(
        service: Arc<dyn NotificationService>,
        alert: Arc<dyn ArrivalAlert>,
        events: EventBusRef,
        scope: RoleScope,
        config: FeedConfig,
    ) -> Self {
        Self {
            inner: Arc::new(FeedInner {
                service,
                alert,
                events,
                config,
                scope: Mutex::new(scope),
                next_seq: AtomicU64::new(0),
                state: Mutex::new(FeedState::default()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.inner.state.lock().expect("feed state mutex poisoned")
    }

    pub fn scope(&self) -> RoleScope {
        self.inner.scope.lock().expect("feed scope mutex poisoned").clone()
    }

    /// Returns whether the scope changed. Takes effect on the next refresh.
    pub fn set_scope(&self, scope: RoleScope) -> bool {
        let mut current = self.inner.scope.lock().expect("feed scope mutex poisoned");
        if *current == scope {
            return false;
        }
        tracing::debug!(from = %current, to = %scope, "notification scope changed");
        *current = scope;
        true
    }

    pub fn ordering(&self) -> FetchOrdering {
        self.inner.config.ordering
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let st = self.state();
        FeedSnapshot {
            items: st.items.clone(),
            unread_count: st.unread_count,
            has_fetched: st.has_fetched,
        }
    }

    pub fn unread_count(&self) -> u32 {
        self.state().unread_count
    }

    pub fn item(&self, id: &str) -> Option<NotificationItem> {
        self.state().items.iter().find(|i| i.id == id).cloned()
    }

    /// Fetch one page and replace the state with it.
    ///
    /// On failure the state is left as it was and the error is returned.
    pub async fn refresh(&self, options: RefreshOptions) -> Result<RefreshOutcome> {
        let scope = self.scope();
        let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let summary = self
            .inner
            .service
            .fetch_summary(&scope, self.inner.config.page_size)
            .await?;

        let (new_ids, first_fetch, alerted, unread_count, item_count) = {
            let mut st = self.state();
            if self.inner.config.ordering == FetchOrdering::DiscardStale && seq < st.applied_seq {
                tracing::debug!(seq, applied = st.applied_seq, "discarding stale notification fetch");
                return Ok(RefreshOutcome::Discarded { seq });
            }

            let new_ids: Vec<String> = summary
                .items
                .iter()
                .filter(|item| !st.known_ids.contains(&item.id))
                .map(|item| item.id.clone())
                .collect();
            let first_fetch = !st.has_fetched;

            st.known_ids = summary.items.iter().map(|i| i.id.clone()).collect();
            st.items = summary.items;
            st.unread_count = summary.unread_count;
            st.has_fetched = true;
            st.applied_seq = st.applied_seq.max(seq);

            let alerted = options.play_sound_on_new && !first_fetch && !new_ids.is_empty();
            (new_ids, first_fetch, alerted, st.unread_count, st.items.len())
        };

        tracing::debug!(
            scope = %scope,
            seq,
            unread_count,
            item_count,
            new = new_ids.len(),
            "notifications refreshed"
        );

        if alerted {
            self.inner.alert.alert();
        }

        emit_event(
            self.inner.events.as_ref(),
            event_names::NOTIFICATIONS_UPDATED,
            &NotificationsUpdatedEvent {
                unread_count,
                item_count,
                timestamp_ms: now_ms(),
            },
        );
        if !first_fetch && !new_ids.is_empty() {
            emit_event(
                self.inner.events.as_ref(),
                event_names::NOTIFICATIONS_NEW_ARRIVALS,
                &NewArrivalsEvent {
                    ids: new_ids.clone(),
                    alerted,
                },
            );
        }

        Ok(RefreshOutcome::Applied { new_ids, alerted })
    }

    /// Mark `id` read remotely, then reconcile with a silent refresh.
    ///
    /// The local item is never flipped ahead of the reconciling fetch.
    pub async fn mark_as_read(&self, id: &str) -> Result<RefreshOutcome> {
        self.inner.service.mark_read(id).await?;
        tracing::debug!(id, "notification marked read");
        self.refresh(RefreshOptions::SILENT).await
    }
}
