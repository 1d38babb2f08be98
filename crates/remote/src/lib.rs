//! HTTP implementations of the identity and notification service contracts.
//!
//! One [`WelfareApi`] serves both contracts so the session cookie set by
//! login is reused by every notification call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use std::time::Duration;
use welfare_notifications::{
    FeedError, NotificationItem, NotificationService, NotificationSummary, RoleScope,
};
use welfare_session::{IdentityError, IdentityService, UserIdentity};

const USER_AGENT: &str = concat!("welfare-client/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("invalid base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    Client(String),
}

pub type Result<T> = std::result::Result<T, RemoteError>;

#[derive(Debug, serde::Deserialize)]
struct UserDto {
    username: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    role: String,
}

impl From<UserDto> for UserIdentity {
    fn from(dto: UserDto) -> Self {
        let display_name = dto.display_name.unwrap_or_else(|| dto.username.clone());
        Self {
            username: dto.username,
            display_name,
            role: dto.role,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    items: Vec<ItemDto>,
    #[serde(default)]
    unread_count: u32,
}

#[derive(Debug, serde::Deserialize)]
struct ItemDto {
    id: WireId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    read: bool,
}

/// Notification ids arrive as either JSON strings or integers.
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(u64),
}

impl From<WireId> for String {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(s) => s,
            WireId::Number(n) => n.to_string(),
        }
    }
}

impl From<ItemDto> for NotificationItem {
    fn from(dto: ItemDto) -> Self {
        Self {
            id: dto.id.into(),
            title: dto.title,
            body: dto.body,
            created_at: dto.created_at,
            read: dto.read,
        }
    }
}

/// Client for the welfare application service.
#[derive(Clone)]
pub struct WelfareApi {
    client: reqwest::Client,
    base: Url,
}

impl WelfareApi {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = parse_base(base_url)?;
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Client(e.to_string()))?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Parse `base_url`, which must be an absolute http(s) url.
fn parse_base(base_url: &str) -> Result<Url> {
    let invalid = |reason: String| RemoteError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason,
    };
    let url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("not a base url".to_string()));
    }
    Ok(url)
}

fn transport(e: reqwest::Error) -> IdentityError {
    IdentityError::Transport(e.to_string())
}

/// Map a non-success status from login or unlock.
fn login_error(status: StatusCode) -> IdentityError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => IdentityError::InvalidCredentials,
        other => IdentityError::Transport(format!("login returned {other}")),
    }
}

/// Map a non-success status from the session probe.
fn probe_error(status: StatusCode) -> IdentityError {
    if status.is_server_error() {
        tracing::debug!(%status, "session probe hit a server error");
    }
    IdentityError::NoActiveSession
}

fn feed_error(status: StatusCode, message: String) -> FeedError {
    FeedError::Rejected {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl IdentityService for WelfareApi {
    async fn probe_session(&self) -> std::result::Result<UserIdentity, IdentityError> {
        let resp = self
            .client
            .get(self.endpoint(&["auth", "session"]))
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            return Err(probe_error(resp.status()));
        }
        let user = resp.json::<UserDto>().await.map_err(transport)?;
        Ok(user.into())
    }

    async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> std::result::Result<UserIdentity, IdentityError> {
        let resp = self
            .client
            .post(self.endpoint(&["auth", "login"]))
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            return Err(login_error(resp.status()));
        }
        let user = resp.json::<UserDto>().await.map_err(transport)?;
        Ok(user.into())
    }

    async fn logout(&self) -> std::result::Result<(), IdentityError> {
        let resp = self
            .client
            .post(self.endpoint(&["auth", "logout"]))
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            return Err(IdentityError::Transport(format!(
                "logout returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationService for WelfareApi {
    async fn fetch_summary(
        &self,
        scope: &RoleScope,
        limit: u32,
    ) -> welfare_notifications::Result<NotificationSummary> {
        let limit = limit.to_string();
        let resp = self
            .client
            .get(self.endpoint(&["notifications", "summary"]))
            .query(&[("role", scope.as_str()), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(feed_error(status, message));
        }

        let summary = resp
            .json::<SummaryResponse>()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;
        Ok(NotificationSummary {
            items: summary.items.into_iter().map(Into::into).collect(),
            unread_count: summary.unread_count,
        })
    }

    async fn mark_read(&self, id: &str) -> welfare_notifications::Result<()> {
        let resp = self
            .client
            .post(self.endpoint(&["notifications", id, "read"]))
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FeedError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(feed_error(status, message));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_segments() {
        let api = WelfareApi::new("https://welfare.example.org/api/").unwrap();
        assert_eq!(
            api.endpoint(&["auth", "login"]).as_str(),
            "https://welfare.example.org/api/auth/login"
        );

        let api = WelfareApi::new("https://welfare.example.org/api").unwrap();
        assert_eq!(
            api.endpoint(&["notifications", "summary"]).as_str(),
            "https://welfare.example.org/api/notifications/summary"
        );
    }

    #[test]
    fn test_endpoint_escapes_ids() {
        let api = WelfareApi::new("http://localhost:8080").unwrap();
        assert_eq!(
            api.endpoint(&["notifications", "a/b c", "read"]).as_str(),
            "http://localhost:8080/notifications/a%2Fb%20c/read"
        );
    }

    #[test]
    fn test_rejects_bad_base_urls() {
        assert!(matches!(
            WelfareApi::new("not a url"),
            Err(RemoteError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            WelfareApi::new("ftp://welfare.example.org"),
            Err(RemoteError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            login_error(StatusCode::UNAUTHORIZED),
            IdentityError::InvalidCredentials
        );
        assert_eq!(
            login_error(StatusCode::FORBIDDEN),
            IdentityError::InvalidCredentials
        );
        assert!(matches!(
            login_error(StatusCode::BAD_GATEWAY),
            IdentityError::Transport(_)
        ));
        assert_eq!(
            probe_error(StatusCode::UNAUTHORIZED),
            IdentityError::NoActiveSession
        );
        assert_eq!(
            feed_error(StatusCode::FORBIDDEN, "role mismatch".into()),
            FeedError::Rejected {
                status: 403,
                message: "role mismatch".into()
            }
        );
    }

    #[test]
    fn test_summary_response_parses() {
        let json = r#"{
            "items": [
                {"id": 42, "title": "Meeting", "created_at": "2026-03-01T09:00:00Z"},
                {"id": "n-7", "title": "Case", "body": "Follow up", "created_at": "2026-02-28T16:30:00Z", "read": true}
            ],
            "unread_count": 5
        }"#;
        let parsed: SummaryResponse = serde_json::from_str(json).unwrap();
        let items: Vec<NotificationItem> = parsed.items.into_iter().map(Into::into).collect();

        assert_eq!(parsed.unread_count, 5);
        assert_eq!(items[0].id, "42");
        assert!(!items[0].read);
        assert_eq!(items[1].id, "n-7");
        assert!(items[1].read);
    }

    #[test]
    fn test_user_without_display_name() {
        let dto: UserDto =
            serde_json::from_str(r#"{"username": "counsellor", "role": "counsellor"}"#).unwrap();
        let identity = UserIdentity::from(dto);
        assert_eq!(identity.display_name, "counsellor");
    }
}
