//! timelinetui - a terminal reader for the public timeline of a
//! Mastodon-compatible instance.
//!
//! Posts are fetched page by page from `/api/v1/timelines/public`; scrolling
//! close to the end of the loaded posts requests the next older page until
//! the server returns an empty one.

pub mod app;
pub mod config;
pub mod error;
pub mod feeds;
pub mod html;
pub mod post;
pub mod timeline;
pub mod ui;

pub use app::App;
pub use config::Config;
pub use timeline::{Phase, ScrollMetrics, Timeline};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
