use crate::post::Locale;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use std::time::{Duration, Instant};

/// Dismissible error popup, shown when loading more posts fails.
#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub description: String,
    raised_at: Instant,
    ttl: Duration,
}

impl Notification {
    pub fn load_failed(locale: Locale, ttl: Duration) -> Self {
        let (title, description) = match locale {
            Locale::En => (
                "Failed to load",
                "Check your network connection or try again later",
            ),
            Locale::ZhCn => ("加载失败", "请检查网络连接或稍后再试"),
        };

        Self {
            title: title.to_string(),
            description: description.to_string(),
            raised_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.raised_at) >= self.ttl
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let width = area.width.min(48);
        let height = 5.min(area.height);
        let popup = Rect::new(
            area.x + area.width.saturating_sub(width + 1),
            area.y + 1,
            width,
            height,
        );

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(Span::styled(
                format!(" {} ", self.title),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ))
            .title_bottom(Line::from(" Esc to dismiss ").right_aligned());

        let paragraph = Paragraph::new(self.description.as_str())
            .block(block)
            .wrap(Wrap { trim: true });

        frame.render_widget(Clear, popup);
        frame.render_widget(paragraph, popup);
    }
}
