use crate::config::Config;
use crate::feeds::mastodon::MastodonSource;
use crate::feeds::{PageMessage, PageRequest, PostId, TimelineSource};
use crate::post::{render_post, PostView, RenderedPost};
use crate::timeline::{ContinuationOutcome, InitialOutcome, Timeline};
use crate::ui::{self, widgets::Notification, widgets::TimelineView, Screen};
use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

type CrosstermTerminal = Terminal<CrosstermBackend<Stdout>>;

const TICK_RATE: Duration = Duration::from_millis(120);
const MOUSE_SCROLL_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ScrollDown(usize),
    ScrollUp(usize),
    PageDown,
    PageUp,
    Top,
    Bottom,
    OpenPost,
    OpenLink,
    Dismiss,
    Quit,
}

pub fn key_to_action(key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(Action::ScrollDown(1)),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(Action::ScrollUp(1)),
        (KeyCode::Char(' '), _) | (KeyCode::PageDown, _) | (KeyCode::Char('f'), _) => {
            Some(Action::PageDown)
        }
        (KeyCode::Char('b'), _) | (KeyCode::PageUp, _) => Some(Action::PageUp),
        (KeyCode::Char('g'), _) | (KeyCode::Home, _) => Some(Action::Top),
        (KeyCode::Char('G'), _) | (KeyCode::End, _) => Some(Action::Bottom),
        (KeyCode::Char('o'), _) | (KeyCode::Enter, _) => Some(Action::OpenPost),
        (KeyCode::Char('l'), _) => Some(Action::OpenLink),
        (KeyCode::Esc, _) | (KeyCode::Char('x'), _) => Some(Action::Dismiss),
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Action::Quit),
        (KeyCode::Char('q'), _) => Some(Action::Quit),
        _ => None,
    }
}

/// Run a page request in the background and report the result on `tx`.
pub fn spawn_fetch(
    source: Arc<dyn TimelineSource>,
    request: PageRequest,
    tx: mpsc::UnboundedSender<PageMessage>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let result = source.fetch_page(&request).await;
        if tx.send(PageMessage { request, result }).is_err() {
            log::debug!("timeline closed before page arrived");
        }
    })
}

pub struct App {
    config: Config,
    source: Arc<dyn TimelineSource>,
    timeline: Timeline,
    view: TimelineView,
    notification: Option<Notification>,
    /// Post and index of the body link opened last
    link_cursor: Option<(PostId, usize)>,
    tx: mpsc::UnboundedSender<PageMessage>,
    rx: mpsc::UnboundedReceiver<PageMessage>,
    scroll_observed: bool,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config) -> Self {
        let source = Arc::new(MastodonSource::new(
            &config.instance_url,
            config.request_timeout(),
        ));
        Self::with_source(config, source)
    }

    pub fn with_source(config: Config, source: Arc<dyn TimelineSource>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            timeline: Timeline::new(config.load_threshold),
            view: TimelineView::new(config.locale),
            config,
            source,
            notification: None,
            link_cursor: None,
            tx,
            rx,
            scroll_observed: false,
            should_quit: false,
        }
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal).await;
        restore_terminal(&mut terminal)?;
        result
    }

    async fn event_loop(&mut self, terminal: &mut CrosstermTerminal) -> Result<()> {
        log::info!("opening public timeline of {}", self.config.instance_url);
        self.start();

        let mut events = EventStream::new();
        let mut tick = tokio::time::interval(TICK_RATE);

        loop {
            self.draw(terminal)?;
            if self.scroll_observed {
                self.scroll_observed = false;
                self.check_scroll();
            }
            if self.should_quit {
                break;
            }

            tokio::select! {
                maybe_event = events.next() => match maybe_event {
                    Some(Ok(event)) => self.handle_event(event),
                    Some(Err(e)) => {
                        self.timeline.teardown();
                        return Err(e).context("Failed to read terminal events");
                    }
                    None => break,
                },
                Some(message) = self.rx.recv() => self.handle_page(message),
                _ = tick.tick() => self.on_tick(Instant::now()),
            }
        }

        self.timeline.teardown();
        Ok(())
    }

    fn draw(&mut self, terminal: &mut CrosstermTerminal) -> Result<()> {
        let screen = Screen {
            timeline: &self.timeline,
            notification: self.notification.as_ref(),
            instance: &self.config.instance_url,
            now: Utc::now(),
        };
        let view = &mut self.view;
        terminal
            .draw(|frame| ui::draw(frame, view, screen))
            .context("Failed to draw frame")?;
        Ok(())
    }

    pub fn start(&mut self) {
        if let Some(request) = self.timeline.start() {
            self.dispatch(request);
        }
    }

    fn dispatch(&self, request: PageRequest) {
        spawn_fetch(Arc::clone(&self.source), request, self.tx.clone());
    }

    /// Treat the current view position as a scroll observation.
    pub fn check_scroll(&mut self) {
        if let Some(request) = self.timeline.on_scroll(self.view.metrics()) {
            self.dispatch(request);
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => {
                if let Some(action) = key_to_action(key) {
                    self.apply(action);
                }
            }
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollDown => self.apply(Action::ScrollDown(MOUSE_SCROLL_LINES)),
                MouseEventKind::ScrollUp => self.apply(Action::ScrollUp(MOUSE_SCROLL_LINES)),
                _ => {}
            },
            Event::Resize(_, _) => self.scroll_observed = true,
            _ => {}
        }
    }

    pub fn apply(&mut self, action: Action) {
        match action {
            Action::ScrollDown(lines) => self.view.scroll_down(lines),
            Action::ScrollUp(lines) => self.view.scroll_up(lines),
            Action::PageDown => self.view.page_down(),
            Action::PageUp => self.view.page_up(),
            Action::Top => self.view.scroll_to_top(),
            Action::Bottom => self.view.scroll_to_bottom(),
            Action::OpenPost => {
                if let Some(url) = self.post_url_at_top() {
                    open_in_browser(&url);
                }
                return;
            }
            Action::OpenLink => {
                if let Some(url) = self.next_link_at_top() {
                    open_in_browser(&url);
                }
                return;
            }
            Action::Dismiss => {
                self.notification = None;
                return;
            }
            Action::Quit => {
                self.should_quit = true;
                return;
            }
        }
        self.scroll_observed = true;
    }

    fn view_at_top(&self) -> Option<PostView<'_>> {
        let post = self
            .view
            .post_at_top()
            .and_then(|index| self.timeline.posts().get(index));
        match render_post(post, Utc::now(), self.config.locale) {
            RenderedPost::Post(view) => Some(view),
            RenderedPost::Loading => None,
        }
    }

    /// Permalink of the post at the top of the view.
    pub fn post_url_at_top(&self) -> Option<String> {
        self.view_at_top()?.url.map(str::to_string)
    }

    /// Next link in the body of the post at the top of the view, cycling
    /// through them on repeated calls.
    pub fn next_link_at_top(&mut self) -> Option<String> {
        let index = self.view.post_at_top()?;
        let id = self.timeline.posts().get(index)?.id.clone();
        let links = self.view_at_top()?.links();
        if links.is_empty() {
            return None;
        }

        let next = match &self.link_cursor {
            Some((last_id, last)) if *last_id == id => (last + 1) % links.len(),
            _ => 0,
        };
        self.link_cursor = Some((id, next));
        links.into_iter().nth(next)
    }

    pub fn handle_page(&mut self, message: PageMessage) {
        match message.request {
            PageRequest::Initial => {
                if self.timeline.finish_initial_load(message.result) == InitialOutcome::Ignored {
                    log::debug!("ignoring late initial page");
                }
            }
            PageRequest::OlderThan(cursor) => {
                match self.timeline.finish_continuation(message.result) {
                    ContinuationOutcome::Failed(_) => {
                        self.notification = Some(Notification::load_failed(
                            self.config.locale,
                            self.config.notification_duration(),
                        ));
                    }
                    ContinuationOutcome::Ignored => {
                        log::debug!("ignoring late page older than {}", cursor);
                    }
                    ContinuationOutcome::Appended(_) | ContinuationOutcome::Exhausted => {}
                }
            }
        }
    }

    pub fn on_tick(&mut self, now: Instant) {
        self.view.advance_spinner();
        if self.notification.as_ref().is_some_and(|n| n.is_expired(now)) {
            self.notification = None;
        }
    }
}

fn open_in_browser(url: &str) {
    if let Err(e) = open::that_detached(url) {
        log::warn!("could not open {}: {}", url, e);
    }
}

fn setup_terminal() -> Result<CrosstermTerminal> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

fn restore_terminal(terminal: &mut CrosstermTerminal) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, FetchResult};
    use crate::feeds::{Account, Post, PostId};
    use crate::timeline::Phase;
    use async_trait::async_trait;
    use ratatui::backend::TestBackend;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct NeverSource;

    #[async_trait]
    impl TimelineSource for NeverSource {
        async fn fetch_page(&self, _request: &PageRequest) -> FetchResult<Vec<Post>> {
            Ok(Vec::new())
        }
    }

    /// Hands out canned pages in order, then empty ones.
    struct PagedSource {
        pages: Mutex<VecDeque<Vec<Post>>>,
    }

    #[async_trait]
    impl TimelineSource for PagedSource {
        async fn fetch_page(&self, _request: &PageRequest) -> FetchResult<Vec<Post>> {
            Ok(self.pages.lock().unwrap().pop_front().unwrap_or_default())
        }
    }

    fn app() -> App {
        App::with_source(Config::default(), Arc::new(NeverSource))
    }

    fn draw(app: &mut App, height: u16) {
        let mut terminal = Terminal::new(TestBackend::new(60, height)).unwrap();
        let screen = Screen {
            timeline: &app.timeline,
            notification: app.notification.as_ref(),
            instance: &app.config.instance_url,
            now: Utc::now(),
        };
        let view = &mut app.view;
        terminal.draw(|frame| ui::draw(frame, view, screen)).unwrap();
    }

    fn loaded_app(posts: Vec<Post>) -> App {
        let mut app = app();
        app.timeline.start();
        app.handle_page(PageMessage {
            request: PageRequest::Initial,
            result: Ok(posts),
        });
        // Three visible lines, one post block each
        draw(&mut app, 6);
        app
    }

    fn post(id: &str) -> Post {
        Post {
            id: PostId::new(id),
            account: Account {
                display_name: "Neko".to_string(),
                acct: "neko".to_string(),
                avatar_static: String::new(),
                url: None,
            },
            created_at: Utc::now(),
            content: "<p>meow</p>".to_string(),
            url: None,
        }
    }

    fn linked_post(id: &str, content: &str) -> Post {
        Post {
            content: content.to_string(),
            url: Some(format!("https://miao.social/@neko/{}", id)),
            ..post(id)
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(key_to_action(key(KeyCode::Char('j'))), Some(Action::ScrollDown(1)));
        assert_eq!(key_to_action(key(KeyCode::Up)), Some(Action::ScrollUp(1)));
        assert_eq!(key_to_action(key(KeyCode::Char(' '))), Some(Action::PageDown));
        assert_eq!(key_to_action(key(KeyCode::End)), Some(Action::Bottom));
        assert_eq!(key_to_action(key(KeyCode::Esc)), Some(Action::Dismiss));
        assert_eq!(key_to_action(key(KeyCode::Char('l'))), Some(Action::OpenLink));
        assert_eq!(key_to_action(key(KeyCode::Char('q'))), Some(Action::Quit));
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
        assert_eq!(key_to_action(key(KeyCode::Char('z'))), None);
    }

    #[test]
    fn test_quit_action() {
        let mut app = app();
        app.apply(Action::Quit);
        assert!(app.should_quit());
    }

    #[test]
    fn test_initial_failure_raises_no_notification() {
        let mut app = app();
        app.timeline.start();
        app.handle_page(PageMessage {
            request: PageRequest::Initial,
            result: Err(FetchError::Status {
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            }),
        });
        assert!(app.notification().is_none());
        assert!(app.timeline().posts().is_empty());
    }

    #[test]
    fn test_continuation_failure_raises_dismissible_notification() {
        let mut app = app();
        app.timeline.start();
        app.handle_page(PageMessage {
            request: PageRequest::Initial,
            result: Ok(vec![post("9")]),
        });
        app.view.scroll_to_bottom();
        let request = app.timeline.on_scroll(app.view.metrics());
        assert_eq!(request, Some(PageRequest::OlderThan(PostId::new("9"))));

        app.handle_page(PageMessage {
            request: PageRequest::OlderThan(PostId::new("9")),
            result: Err(FetchError::Status {
                status: reqwest::StatusCode::BAD_GATEWAY,
            }),
        });
        assert!(app.notification().is_some());
        assert_eq!(app.timeline().posts().len(), 1);

        app.apply(Action::Dismiss);
        assert!(app.notification().is_none());
    }

    #[test]
    fn test_notification_expires_on_tick() {
        let mut app = app();
        app.notification = Some(Notification::load_failed(
            app.config.locale,
            Duration::from_secs(1),
        ));
        app.on_tick(Instant::now());
        assert!(app.notification().is_some());
        app.on_tick(Instant::now() + Duration::from_secs(2));
        assert!(app.notification().is_none());
    }

    #[tokio::test]
    async fn test_scroll_to_bottom_dispatches_continuation() {
        let first_page: Vec<Post> = (1..=20).rev().map(|i| post(&i.to_string())).collect();
        let source = PagedSource {
            pages: Mutex::new(VecDeque::from(vec![first_page])),
        };
        let mut app = App::with_source(Config::default(), Arc::new(source));

        app.start();
        let initial = app.rx.recv().await.unwrap();
        assert_eq!(initial.request, PageRequest::Initial);
        app.handle_page(initial);
        draw(&mut app, 20);

        app.apply(Action::Top);
        assert!(app.scroll_observed);
        app.check_scroll();
        assert!(!app.timeline().is_fetching());
        assert!(app.rx.try_recv().is_err());

        app.apply(Action::Bottom);
        app.check_scroll();
        assert!(app.timeline().is_fetching());
        let message = app.rx.recv().await.unwrap();
        assert_eq!(message.request, PageRequest::OlderThan(PostId::new("1")));

        app.handle_page(message);
        assert_eq!(app.timeline().phase(), Phase::Exhausted);
        assert_eq!(app.timeline().posts().len(), 20);

        draw(&mut app, 20);
        app.apply(Action::Bottom);
        app.check_scroll();
        assert!(!app.timeline().is_fetching());
        tokio::task::yield_now().await;
        assert!(app.rx.try_recv().is_err());
    }

    #[test]
    fn test_post_url_falls_back_to_account() {
        let mut account_only = post("1");
        account_only.account.url = Some("https://miao.social/@neko".to_string());
        let app = loaded_app(vec![account_only]);
        assert_eq!(
            app.post_url_at_top().as_deref(),
            Some("https://miao.social/@neko")
        );

        let app = loaded_app(vec![linked_post("2", "<p>meow</p>")]);
        assert_eq!(
            app.post_url_at_top().as_deref(),
            Some("https://miao.social/@neko/2")
        );
    }

    #[test]
    fn test_body_links_cycle_per_post() {
        let mut app = loaded_app(vec![
            linked_post(
                "2",
                r#"<p><a href="https://a.example">a</a> <a href="https://b.example">b</a></p>"#,
            ),
            linked_post("1", r#"<p><a href="https://c.example">c</a></p>"#),
        ]);

        assert_eq!(app.next_link_at_top().as_deref(), Some("https://a.example"));
        assert_eq!(app.next_link_at_top().as_deref(), Some("https://b.example"));
        assert_eq!(app.next_link_at_top().as_deref(), Some("https://a.example"));

        app.apply(Action::ScrollDown(3));
        assert_eq!(app.next_link_at_top().as_deref(), Some("https://c.example"));
        assert_eq!(app.next_link_at_top().as_deref(), Some("https://c.example"));
    }

    #[test]
    fn test_post_without_links_opens_nothing() {
        let mut app = loaded_app(vec![post("1")]);
        assert_eq!(app.next_link_at_top(), None);
    }
}
