pub mod mastodon;

use crate::error::FetchResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// Opaque status identifier, used as the `max_id` pagination cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// https://docs.joinmastodon.org/entities/Account/
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub display_name: String,
    pub acct: String,
    #[serde(default)]
    pub avatar_static: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// https://docs.joinmastodon.org/entities/Status/
///
/// Only the fields the timeline displays are decoded; everything else the
/// server sends is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub account: Account,
    pub created_at: DateTime<Utc>,
    /// Server-rendered HTML, displayed as-is
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Which page of the public timeline to ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// The newest page, requested once at startup
    Initial,
    /// Posts strictly older than the cursor
    OlderThan(PostId),
}

impl PageRequest {
    pub fn max_id(&self) -> Option<&PostId> {
        match self {
            PageRequest::Initial => None,
            PageRequest::OlderThan(id) => Some(id),
        }
    }
}

/// Result of a page request, delivered back to the event loop.
#[derive(Debug)]
pub struct PageMessage {
    pub request: PageRequest,
    pub result: FetchResult<Vec<Post>>,
}

#[async_trait]
pub trait TimelineSource: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> FetchResult<Vec<Post>>;
}
