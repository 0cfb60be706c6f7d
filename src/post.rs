//! Formatting of a single post into display fields.

use crate::feeds::Post;
use crate::html::extract_links;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Locale {
    #[default]
    En,
    ZhCn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostHeader<'a> {
    pub avatar_url: &'a str,
    pub display_name: &'a str,
    /// `@acct`
    pub handle: String,
    pub relative_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostView<'a> {
    pub header: PostHeader<'a>,
    /// Server-supplied markup, untouched
    pub body_html: &'a str,
    pub url: Option<&'a str>,
}

impl PostView<'_> {
    /// Link targets inside the body, in document order.
    pub fn links(&self) -> Vec<String> {
        extract_links(self.body_html)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedPost<'a> {
    Loading,
    Post(PostView<'a>),
}

pub fn render_post<'a>(
    post: Option<&'a Post>,
    now: DateTime<Utc>,
    locale: Locale,
) -> RenderedPost<'a> {
    let Some(post) = post else {
        return RenderedPost::Loading;
    };

    let display_name = if post.account.display_name.trim().is_empty() {
        post.account
            .acct
            .split('@')
            .next()
            .unwrap_or(&post.account.acct)
    } else {
        post.account.display_name.as_str()
    };

    RenderedPost::Post(PostView {
        header: PostHeader {
            avatar_url: &post.account.avatar_static,
            display_name,
            handle: format!("@{}", post.account.acct),
            relative_time: time_from_now(post.created_at, now, locale),
        },
        body_html: &post.content,
        url: post.url.as_deref().or(post.account.url.as_deref()),
    })
}

enum Span {
    Seconds,
    Minute,
    Minutes(i64),
    Hour,
    Hours(i64),
    Day,
    Days(i64),
    Month,
    Months(i64),
    Year,
    Years(i64),
}

fn round(value: f64) -> i64 {
    value.round() as i64
}

fn classify(millis: i64) -> Span {
    let secs = millis as f64 / 1_000.0;
    let seconds = round(secs);
    let minutes = round(secs / 60.0);
    let hours = round(secs / 3_600.0);
    let days = round(secs / 86_400.0);
    // 146097 days per 400 years, 4800 months per 400 years
    let months_f = secs / 86_400.0 * 4_800.0 / 146_097.0;
    let months = round(months_f);
    let years = round(months_f / 12.0);

    if seconds < 45 {
        Span::Seconds
    } else if minutes <= 1 {
        Span::Minute
    } else if minutes < 45 {
        Span::Minutes(minutes)
    } else if hours <= 1 {
        Span::Hour
    } else if hours < 22 {
        Span::Hours(hours)
    } else if days <= 1 {
        Span::Day
    } else if days < 26 {
        Span::Days(days)
    } else if months <= 1 {
        Span::Month
    } else if months < 11 {
        Span::Months(months)
    } else if years <= 1 {
        Span::Year
    } else {
        Span::Years(years)
    }
}

fn span_text(span: &Span, locale: Locale) -> String {
    match locale {
        Locale::En => match span {
            Span::Seconds => "a few seconds".to_string(),
            Span::Minute => "a minute".to_string(),
            Span::Minutes(n) => format!("{} minutes", n),
            Span::Hour => "an hour".to_string(),
            Span::Hours(n) => format!("{} hours", n),
            Span::Day => "a day".to_string(),
            Span::Days(n) => format!("{} days", n),
            Span::Month => "a month".to_string(),
            Span::Months(n) => format!("{} months", n),
            Span::Year => "a year".to_string(),
            Span::Years(n) => format!("{} years", n),
        },
        Locale::ZhCn => match span {
            Span::Seconds => "几秒".to_string(),
            Span::Minute => "1 分钟".to_string(),
            Span::Minutes(n) => format!("{} 分钟", n),
            Span::Hour => "1 小时".to_string(),
            Span::Hours(n) => format!("{} 小时", n),
            Span::Day => "1 天".to_string(),
            Span::Days(n) => format!("{} 天", n),
            Span::Month => "1 个月".to_string(),
            Span::Months(n) => format!("{} 个月", n),
            Span::Year => "1 年".to_string(),
            Span::Years(n) => format!("{} 年", n),
        },
    }
}

/// Human readable distance between `time` and `now`, e.g. "3 hours ago".
pub fn time_from_now(time: DateTime<Utc>, now: DateTime<Utc>, locale: Locale) -> String {
    let delta = now.signed_duration_since(time).num_milliseconds();
    let text = span_text(&classify(delta.abs()), locale);
    let past = delta >= 0;

    match (locale, past) {
        (Locale::En, true) => format!("{} ago", text),
        (Locale::En, false) => format!("in {}", text),
        (Locale::ZhCn, true) => format!("{}前", text),
        (Locale::ZhCn, false) => format!("{}后", text),
    }
}
