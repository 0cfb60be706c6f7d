use crate::feeds::Post;
use crate::html::{html_to_lines, TextLine};
use crate::post::{render_post, Locale, RenderedPost};
use crate::timeline::{Phase, ScrollMetrics, Timeline};
use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Scrollable view over the posts of a [`Timeline`].
///
/// Post bodies are parsed once and cached; wrapping happens on every layout
/// so the view follows terminal resizes.
pub struct TimelineView {
    locale: Locale,
    bodies: Vec<Vec<TextLine>>,
    offset: usize,
    viewport: usize,
    content: usize,
    /// First rendered line of each post
    post_starts: Vec<usize>,
    spinner: usize,
}

impl TimelineView {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            bodies: Vec::new(),
            offset: 0,
            viewport: 0,
            content: 0,
            post_starts: Vec::new(),
            spinner: 0,
        }
    }

    pub fn metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            offset: self.offset,
            viewport: self.viewport,
            content: self.content,
        }
    }

    pub fn advance_spinner(&mut self) {
        self.spinner = (self.spinner + 1) % SPINNER_FRAMES.len();
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.offset = (self.offset + lines).min(self.max_offset());
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.offset = self.offset.saturating_sub(lines);
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.viewport.saturating_sub(1).max(1));
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.viewport.saturating_sub(1).max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    fn max_offset(&self) -> usize {
        self.content.saturating_sub(self.viewport)
    }

    /// Index of the post whose block covers the first visible line.
    pub fn post_at_top(&self) -> Option<usize> {
        if self.post_starts.is_empty() {
            return None;
        }
        let index = self.post_starts.partition_point(|&start| start <= self.offset);
        Some(index.saturating_sub(1))
    }

    fn sync_bodies(&mut self, posts: &[Post], now: DateTime<Utc>) {
        // The timeline only ever appends, so the cache can only lag behind.
        for post in &posts[self.bodies.len().min(posts.len())..] {
            let body = match render_post(Some(post), now, self.locale) {
                RenderedPost::Post(view) => html_to_lines(view.body_html),
                RenderedPost::Loading => Vec::new(),
            };
            self.bodies.push(body);
        }
    }

    /// Lay out every post for the given width, recording where each starts.
    pub fn layout(
        &mut self,
        posts: &[Post],
        phase: Phase,
        width: usize,
        now: DateTime<Utc>,
    ) -> Vec<Line<'static>> {
        self.sync_bodies(posts, now);
        let width = width.max(8);
        let mut lines = Vec::new();
        self.post_starts.clear();

        for (post, body) in posts.iter().zip(&self.bodies) {
            self.post_starts.push(lines.len());
            match render_post(Some(post), now, self.locale) {
                RenderedPost::Loading => lines.push(Line::from("Loading...")),
                RenderedPost::Post(view) => {
                    let header = &view.header;
                    lines.push(Line::from(vec![
                        Span::styled(
                            format!("[{}] ", avatar_initial(header.display_name)),
                            Style::default().fg(Color::Magenta),
                        ),
                        Span::styled(
                            header.display_name.to_string(),
                            Style::default()
                                .fg(Color::White)
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(
                            format!(" {}", header.handle),
                            Style::default().fg(Color::DarkGray),
                        ),
                        Span::styled(" · ", Style::default().fg(Color::DarkGray)),
                        Span::styled(
                            header.relative_time.clone(),
                            Style::default().fg(Color::DarkGray),
                        ),
                    ]));
                    wrap_body(body, width, &mut lines);
                }
            }
            lines.push(Line::from(Span::styled(
                "─".repeat(width),
                Style::default().fg(Color::DarkGray),
            )));
        }

        match phase {
            Phase::Fetching => lines.push(
                Line::from(Span::styled(
                    format!("{} Loading more...", SPINNER_FRAMES[self.spinner]),
                    Style::default().fg(Color::Yellow),
                ))
                .alignment(Alignment::Center),
            ),
            Phase::Exhausted => lines.push(
                Line::from(Span::styled(
                    "No more posts",
                    Style::default().fg(Color::DarkGray),
                ))
                .alignment(Alignment::Center),
            ),
            Phase::Ready if posts.is_empty() => lines.push(
                Line::from(Span::styled(
                    "No posts",
                    Style::default().fg(Color::DarkGray),
                ))
                .alignment(Alignment::Center),
            ),
            _ => {}
        }

        lines
    }

    pub fn render(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        timeline: &Timeline,
        title: &str,
        now: DateTime<Utc>,
    ) {
        let block = Block::default()
            .title(format!(" {} ", title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if timeline.phase() == Phase::Loading {
            self.viewport = inner.height as usize;
            self.content = 0;
            let spinner = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    SPINNER_FRAMES[self.spinner],
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    "Loading...",
                    Style::default().fg(Color::DarkGray),
                )),
            ])
            .alignment(Alignment::Center);
            frame.render_widget(spinner, inner);
            return;
        }

        let mut lines = self.layout(
            timeline.posts(),
            timeline.phase(),
            inner.width.saturating_sub(1) as usize,
            now,
        );
        self.viewport = inner.height as usize;
        self.content = lines.len();
        self.offset = self.offset.min(self.max_offset());

        let end = (self.offset + self.viewport).min(lines.len());
        let visible: Vec<Line<'static>> = lines.drain(self.offset..end).collect();
        frame.render_widget(Paragraph::new(visible), inner);
    }
}

fn avatar_initial(name: &str) -> char {
    name.chars()
        .find(|c| c.is_alphanumeric())
        .map(|c| c.to_uppercase().next().unwrap_or(c))
        .unwrap_or('?')
}

fn wrap_body(body: &[TextLine], width: usize, lines: &mut Vec<Line<'static>>) {
    let link_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::UNDERLINED);

    for text_line in body {
        if text_line.text.is_empty() {
            lines.push(Line::from(""));
            continue;
        }
        for wrapped in textwrap::wrap(&text_line.text, width) {
            let mut spans = Vec::new();
            for (i, word) in wrapped.split(' ').enumerate() {
                if i > 0 {
                    spans.push(Span::raw(" "));
                }
                if text_line.is_link_word(word) {
                    spans.push(Span::styled(word.to_string(), link_style));
                } else {
                    spans.push(Span::raw(word.to_string()));
                }
            }
            lines.push(Line::from(spans));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::{Account, PostId};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap()
    }

    fn post(id: &str, content: &str) -> Post {
        Post {
            id: PostId::new(id),
            account: Account {
                display_name: "neko".to_string(),
                acct: "neko".to_string(),
                avatar_static: String::new(),
                url: None,
            },
            created_at: now(),
            content: content.to_string(),
            url: None,
        }
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_layout_header_body_separator() {
        let mut view = TimelineView::new(Locale::En);
        let posts = vec![post("1", "<p>hello</p>")];
        let lines = view.layout(&posts, Phase::Ready, 40, now());

        assert_eq!(lines.len(), 3);
        assert_eq!(line_text(&lines[0]), "[N] neko @neko · a few seconds ago");
        assert_eq!(line_text(&lines[1]), "hello");
        assert_eq!(line_text(&lines[2]), "─".repeat(40));
    }

    #[test]
    fn test_layout_wraps_long_bodies() {
        let mut view = TimelineView::new(Locale::En);
        let posts = vec![post("1", "<p>aaaa bbbb cccc dddd</p>")];
        let lines = view.layout(&posts, Phase::Ready, 10, now());
        assert_eq!(line_text(&lines[1]), "aaaa bbbb");
        assert_eq!(line_text(&lines[2]), "cccc dddd");
    }

    #[test]
    fn test_layout_footer_by_phase() {
        let mut view = TimelineView::new(Locale::En);
        let posts = vec![post("1", "x")];
        let lines = view.layout(&posts, Phase::Exhausted, 20, now());
        assert_eq!(line_text(lines.last().unwrap()), "No more posts");

        let lines = view.layout(&[], Phase::Ready, 20, now());
        assert_eq!(line_text(&lines[0]), "No posts");
    }

    #[test]
    fn test_post_at_top() {
        let mut view = TimelineView::new(Locale::En);
        let posts = vec![post("1", "a"), post("2", "b"), post("3", "c")];
        let lines = view.layout(&posts, Phase::Ready, 20, now());
        view.content = lines.len();
        view.viewport = 2;

        assert_eq!(view.post_at_top(), Some(0));
        view.scroll_down(3);
        assert_eq!(view.post_at_top(), Some(1));
        view.scroll_to_bottom();
        assert_eq!(view.post_at_top(), Some(2));
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut view = TimelineView::new(Locale::En);
        view.content = 50;
        view.viewport = 20;
        view.scroll_down(100);
        assert_eq!(view.metrics().offset, 30);
        assert!(view.metrics().is_near_bottom(0));
        view.scroll_up(100);
        assert_eq!(view.metrics().offset, 0);
    }

    #[test]
    fn test_body_cache_follows_appends() {
        let mut view = TimelineView::new(Locale::En);
        let mut posts = vec![post("2", "first")];
        view.layout(&posts, Phase::Ready, 20, now());
        posts.push(post("1", "second"));
        let lines = view.layout(&posts, Phase::Ready, 20, now());
        assert_eq!(line_text(&lines[4]), "second");
    }
}
