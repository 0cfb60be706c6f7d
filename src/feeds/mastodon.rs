use super::{PageRequest, Post, TimelineSource};
use crate::error::{FetchError, FetchResult};
use async_trait::async_trait;
use std::time::Duration;

const PUBLIC_TIMELINE_PATH: &str = "/api/v1/timelines/public";

pub struct MastodonSource {
    instance_url: String,
    client: reqwest::Client,
}

impl MastodonSource {
    pub fn new(instance_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("timelinetui/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            instance_url: instance_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn page_url(&self, request: &PageRequest) -> String {
        match request.max_id() {
            None => format!("{}{}", self.instance_url, PUBLIC_TIMELINE_PATH),
            Some(max_id) => format!(
                "{}{}?max_id={}",
                self.instance_url,
                PUBLIC_TIMELINE_PATH,
                urlencoding::encode(max_id.as_str()),
            ),
        }
    }
}

#[async_trait]
impl TimelineSource for MastodonSource {
    async fn fetch_page(&self, request: &PageRequest) -> FetchResult<Vec<Post>> {
        let url = self.page_url(request);
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status(),
            });
        }

        let body = response.text().await?;
        let posts: Vec<Post> = serde_json::from_str(&body)?;
        log::debug!("{} returned {} posts", url, posts.len());

        Ok(posts)
    }
}
