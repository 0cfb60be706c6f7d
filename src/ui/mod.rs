pub mod widgets;

use crate::timeline::{Phase, Timeline};
use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use widgets::{Notification, TimelineView};

pub struct Screen<'a> {
    pub timeline: &'a Timeline,
    pub notification: Option<&'a Notification>,
    pub instance: &'a str,
    pub now: DateTime<Utc>,
}

pub fn draw(frame: &mut Frame, view: &mut TimelineView, screen: Screen<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    view.render(
        frame,
        chunks[0],
        screen.timeline,
        screen.instance,
        screen.now,
    );
    render_status_bar(frame, chunks[1], screen.timeline);

    if let Some(notification) = screen.notification {
        notification.render(frame, chunks[0]);
    }
}

fn render_status_bar(frame: &mut Frame, area: Rect, timeline: &Timeline) {
    let state = match timeline.phase() {
        Phase::Loading => "loading",
        Phase::Ready => "ready",
        Phase::Fetching => "fetching",
        Phase::Exhausted => "end of timeline",
    };

    let status = Line::from(vec![
        Span::styled(
            format!(" {} posts | {} ", timeline.posts().len(), state),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        Span::styled(
            " j/k scroll | space/b page | g/G top/bottom | o open | l link | esc dismiss | q quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}
