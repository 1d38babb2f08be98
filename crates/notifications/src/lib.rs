//! Notification feed for the welfare client.
//!
//! - [`NotificationFeed`]: latest page of notifications and the new-arrival delta
//! - [`FeedPoller`]: interval polling while the feed is mounted
//! - [`NotificationService`]: contract of the remote notification service

mod feed;
mod model;
mod poller;
mod service;

pub use feed::{
    FeedConfig, FeedSnapshot, FetchOrdering, NotificationFeed, RefreshOptions, RefreshOutcome,
    DEFAULT_PAGE_SIZE,
};
pub use model::{NotificationItem, NotificationSummary, RoleScope};
pub use poller::{FeedPoller, DEFAULT_POLL_INTERVAL, MAX_POLL_INTERVAL};
pub use service::{ArrivalAlert, NotificationService, OffloadedAlert};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("notification service unavailable: {0}")]
    Transport(String),
    #[error("notification service rejected the request: {status} {message}")]
    Rejected { status: u16, message: String },
    #[error("unknown notification: {0}")]
    NotFound(String),
    #[error("invalid poll interval: {0:?}")]
    InvalidInterval(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, FeedError>;
