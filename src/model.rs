//! Data models for the link store
//!
//! This module defines the persisted records (resources and users) and the
//! request payloads the transport adapter sends for each chat event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The platform file types accepted for storage
///
/// They are handled interchangeably; only the common projection of
/// [`FileRef`] matters to the store.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Document,
    Video,
    Audio,
    Photo,
}

/// Reference to a file message held by the chat platform
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub kind: FileKind,

    /// Chat holding the original message
    pub chat_id: i64,

    /// Message carrying the file inside `chat_id`
    pub message_id: i64,

    /// Platform identifier that stays the same for identical content
    pub unique_id: String,

    /// Platform identifier used to re-send the file
    pub file_id: String,

    #[serde(default)]
    pub caption: Option<String>,
}

/// What a resource points at
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Origin {
    Link { url: String },
    File(FileRef),
}

/// Resource class, reflected in the token shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Link,
    File,
}

impl Origin {
    pub fn link(url: impl Into<String>) -> Self {
        Origin::Link { url: url.into() }
    }

    /// Content-derived key used for deduplication.
    ///
    /// Namespaced so a URL can never collide with a file identifier.
    pub fn uniqueness_key(&self) -> String {
        match self {
            Origin::Link { url } => format!("link:{}", url),
            Origin::File(file) => format!("file:{}", file.unique_id),
        }
    }

    pub fn token_kind(&self) -> TokenKind {
        match self {
            Origin::Link { .. } => TokenKind::Link,
            Origin::File(_) => TokenKind::File,
        }
    }
}

/// One stored link or file, addressed by its token
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Opaque identifier carried by deep links; never changes
    pub token: String,

    pub uniqueness_key: String,

    pub origin: Origin,

    /// User who submitted the content first
    pub created_by: i64,

    pub created_at: DateTime<Utc>,

    /// Number of successful resolutions
    #[serde(default)]
    pub access_count: u64,

    /// Cached shortener result, `None` until generated or after a refresh
    #[serde(default)]
    pub short_url: Option<String>,
}

impl Resource {
    pub fn new(token: String, origin: Origin, created_by: i64) -> Self {
        Self {
            token,
            uniqueness_key: origin.uniqueness_key(),
            origin,
            created_by,
            created_at: Utc::now(),
            access_count: 0,
            short_url: None,
        }
    }
}

/// A principal that has talked to the bot
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub joined_at: DateTime<Utc>,

    #[serde(default)]
    pub is_premium: bool,

    #[serde(default)]
    pub premium_expiry: Option<DateTime<Utc>>,

    /// Resources this user has submitted
    #[serde(default)]
    pub total_resources: u64,
}

impl User {
    pub fn new(user_id: i64, username: Option<String>, first_name: Option<String>) -> Self {
        Self {
            user_id,
            username,
            first_name,
            joined_at: Utc::now(),
            is_premium: false,
            premium_expiry: None,
            total_resources: 0,
        }
    }

    /// Premium counts only while the flag is set and the expiry is ahead of `now`
    pub fn premium_active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_premium && self.premium_expiry.is_some_and(|expiry| expiry > now)
    }

    /// Flag still set although the grant has run out
    pub fn premium_lapsed_at(&self, now: DateTime<Utc>) -> bool {
        self.is_premium && !self.premium_active_at(now)
    }
}

/// First contact / profile refresh sent by the transport
///
/// # Example
/// ```json
/// { "user_id": 42, "username": "alice", "first_name": "Alice" }
/// ```
#[derive(Deserialize, Debug, Clone)]
pub struct ContactRequest {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

/// Query of a deep-link click: `GET /api/start/{token}?user_id=42`
#[derive(Deserialize, Debug, Clone)]
pub struct StartParams {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

/// Message text submitted by a user, expected to contain a link
#[derive(Deserialize, Debug, Clone)]
pub struct SubmitLinkRequest {
    pub user_id: i64,
    pub text: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SubmitFileRequest {
    pub user_id: i64,
    pub file: FileRef,
}

/// Identifies who issues an admin query
#[derive(Deserialize, Debug, Clone)]
pub struct CallerParams {
    pub caller: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RecentParams {
    pub caller: i64,

    /// Defaults to 10, capped at 100
    pub limit: Option<usize>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AdminTargetRequest {
    pub caller: i64,
    pub user_id: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GrantPremiumRequest {
    pub caller: i64,
    pub user_id: i64,
    pub days: u32,
}

/// Shortener credentials in the paired `key|url` form
#[derive(Deserialize, Debug, Clone)]
pub struct ShortenerRequest {
    pub caller: i64,
    pub input: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TutorialRequest {
    pub caller: i64,
    pub url: String,
}
