//! Paginated public timeline with scroll-triggered continuation.
//!
//! [`Timeline`] owns the post sequence together with the "fetch in flight"
//! guard and the "more pages available" flag. It never performs I/O itself:
//! operations hand back a [`PageRequest`] for the caller to execute, and the
//! caller reports the result through the matching `finish_*` method. That
//! keeps every transition synchronous and testable without a network.
//!
//! ```text
//! Loading --initial result--> Ready <--> Fetching --empty page--> Exhausted
//! ```

use crate::error::FetchError;
use crate::feeds::{PageRequest, Post};

/// Distance from the end of the content, in rendered lines, at which a
/// continuation fetch is triggered.
pub const DEFAULT_LOAD_THRESHOLD: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the first page
    Loading,
    /// Posts are displayed and more may be requested
    Ready,
    /// A continuation request is outstanding
    Fetching,
    /// An empty page came back; no further requests are made
    Exhausted,
}

/// Scroll position reported by the view, in rendered lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollMetrics {
    /// First visible line
    pub offset: usize,
    /// Number of visible lines
    pub viewport: usize,
    /// Total number of lines the timeline renders to
    pub content: usize,
}

impl ScrollMetrics {
    pub fn is_near_bottom(&self, threshold: usize) -> bool {
        self.offset + self.viewport >= self.content.saturating_sub(threshold)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialOutcome {
    Loaded(usize),
    Failed,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinuationOutcome {
    Appended(usize),
    Exhausted,
    /// The request failed; the message is meant for the user
    Failed(String),
    /// Arrived after teardown or without an outstanding request
    Ignored,
}

#[derive(Debug)]
pub struct Timeline {
    posts: Vec<Post>,
    threshold: usize,
    initial_requested: bool,
    loading: bool,
    fetching: bool,
    has_more: bool,
    observing: bool,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(DEFAULT_LOAD_THRESHOLD)
    }
}

impl Timeline {
    pub fn new(threshold: usize) -> Self {
        Self {
            posts: Vec::new(),
            threshold,
            initial_requested: false,
            loading: true,
            fetching: false,
            has_more: true,
            observing: true,
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn phase(&self) -> Phase {
        if self.loading {
            Phase::Loading
        } else if !self.has_more {
            Phase::Exhausted
        } else if self.fetching {
            Phase::Fetching
        } else {
            Phase::Ready
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Whether scroll events are still being observed.
    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Request for the first page. Only ever returned once.
    pub fn start(&mut self) -> Option<PageRequest> {
        if self.initial_requested {
            return None;
        }
        self.initial_requested = true;
        Some(PageRequest::Initial)
    }

    pub fn finish_initial_load(
        &mut self,
        result: Result<Vec<Post>, FetchError>,
    ) -> InitialOutcome {
        if !self.loading || !self.observing {
            return InitialOutcome::Ignored;
        }
        self.loading = false;

        match result {
            Ok(posts) => {
                let count = posts.len();
                log::info!("initial page loaded with {} posts", count);
                self.posts = posts;
                InitialOutcome::Loaded(count)
            }
            Err(e) => {
                log::error!("initial timeline load failed: {}", e);
                InitialOutcome::Failed
            }
        }
    }

    /// Feed a scroll observation. Returns a continuation request when the
    /// viewport is close enough to the end and nothing else blocks it.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> Option<PageRequest> {
        if !self.observing || self.loading || self.fetching || !self.has_more {
            return None;
        }
        if !metrics.is_near_bottom(self.threshold) {
            return None;
        }
        // Without a loaded post there is no cursor to continue from.
        let cursor = self.posts.last()?.id.clone();

        self.fetching = true;
        log::debug!("requesting posts older than {}", cursor);
        Some(PageRequest::OlderThan(cursor))
    }

    pub fn finish_continuation(
        &mut self,
        result: Result<Vec<Post>, FetchError>,
    ) -> ContinuationOutcome {
        if !self.observing || !self.fetching {
            return ContinuationOutcome::Ignored;
        }
        self.fetching = false;

        match result {
            Ok(posts) if posts.is_empty() => {
                log::info!("timeline exhausted after {} posts", self.posts.len());
                self.has_more = false;
                self.observing = false;
                ContinuationOutcome::Exhausted
            }
            Ok(posts) => {
                let count = posts.len();
                self.posts.extend(posts);
                log::debug!("appended {} posts, {} total", count, self.posts.len());
                ContinuationOutcome::Appended(count)
            }
            Err(e) => {
                log::error!("loading more posts failed: {}", e);
                ContinuationOutcome::Failed(e.to_string())
            }
        }
    }

    /// Stop observing. Results that arrive afterwards have no effect.
    pub fn teardown(&mut self) {
        self.observing = false;
    }
}
