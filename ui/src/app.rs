use std::time::Duration;

use chrono::{DateTime, Utc};
use client::client::AuthEvent;
use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{info, warn};
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::widgets::{Block, Clear, Paragraph, Tabs, Widget, Wrap};
use ratatui::{DefaultTerminal, Frame};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use types::scan::HistoryQuery;

use crate::account::{AccountScreenData, AccountScreenWidget};
use crate::data::{landing_screen, Context, OnKeyEvent, OnTick, Screen, ScreenChange};
use crate::history::{HistoryScreenData, HistoryWidget};
use crate::login::{LoginScreenData, LoginScreenWidget};
use crate::profile::{ProfileScreenData, ProfileScreenWidget};
use crate::results::ResultsScreenWidget;
use crate::scan::{ScanScreenData, ScanScreenWidget};
use crate::scanner::ScannerScreenWidget;

const TABS: [&str; 4] = ["F1 Scan", "F2 History", "F3 Hair profile", "F4 Account"];

pub struct App {
    /// Is the application running?
    running: bool,
    ctx: Context,
    screen: Screen,
    auth_events: broadcast::Receiver<AuthEvent>,
    error_message: Option<ErrorMessage>,
}

struct ErrorMessage {
    message: String,
    expiry_time: DateTime<Utc>,
}

impl ErrorMessage {
    fn is_expired(&self) -> bool {
        Utc::now() > self.expiry_time
    }
}

impl From<String> for ErrorMessage {
    fn from(message: String) -> Self {
        Self {
            message,
            expiry_time: Utc::now() + Duration::from_secs(3),
        }
    }
}

impl App {
    pub async fn new(ctx: Context) -> Self {
        let auth_events = ctx.client.subscribe();
        let screen = landing_screen(&ctx).await;
        Self {
            running: true,
            ctx,
            screen,
            auth_events,
            error_message: None,
        }
    }

    /// Run the application's main loop.
    pub async fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        while self.running {
            terminal.draw(|frame| self.draw(frame))?;
            self.handle_crossterm_events().await?;
            self.handle_tick().await;
            self.handle_auth_events();
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = match self.screen.tab() {
            Some(selected) => {
                let [tabs, body] =
                    Layout::vertical([Constraint::Length(1), Constraint::Min(0)])
                        .areas(frame.area());
                frame.render_widget(
                    Tabs::new(TABS)
                        .select(selected)
                        .highlight_style(Style::default().reversed()),
                    tabs,
                );
                body
            }
            None => frame.area(),
        };

        match &mut self.screen {
            Screen::Login(data) => frame.render_stateful_widget(LoginScreenWidget, area, data),
            Screen::Profile(data) => {
                frame.render_stateful_widget(ProfileScreenWidget, area, data)
            }
            Screen::Scan(data) => frame.render_stateful_widget(ScanScreenWidget, area, data),
            Screen::Scanner(data) => {
                frame.render_stateful_widget(ScannerScreenWidget, area, data)
            }
            Screen::Results(data) => {
                frame.render_stateful_widget(ResultsScreenWidget, area, data)
            }
            Screen::History(data) => frame.render_stateful_widget(HistoryWidget, area, data),
            Screen::Account(data) => {
                frame.render_stateful_widget(AccountScreenWidget, area, data)
            }
        }
        if let Some(position) = self.screen.cursor_position() {
            frame.set_cursor_position(position);
        }

        if let Some(error_message) = &self.error_message {
            if error_message.is_expired() {
                self.error_message = None;
            } else {
                let [_, popup_area] =
                    Layout::vertical(Constraint::from_percentages([85, 15])).areas(frame.area());
                let [_, popup_area, _] =
                    Layout::horizontal(Constraint::from_ratios([(1, 4), (2, 4), (1, 4)]))
                        .areas(popup_area);
                frame.render_widget(
                    ErrorPopup {
                        message: error_message.message.clone(),
                    },
                    popup_area,
                );
            }
        }
    }

    /// Reads the crossterm events and updates the state of [`App`].
    async fn handle_crossterm_events(&mut self) -> Result<()> {
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key_event) = event::read()? {
                match self.on_key_event(key_event).await {
                    Ok(change) => self.apply(change),
                    Err(e) => self.show_error(e.to_string()),
                }
            }
        }
        Ok(())
    }

    async fn handle_tick(&mut self) {
        let result = match &mut self.screen {
            Screen::Login(data) => data.on_tick(&self.ctx).await,
            Screen::Profile(data) => data.on_tick(&self.ctx).await,
            Screen::Scan(data) => data.on_tick(&self.ctx).await,
            Screen::Scanner(data) => data.on_tick(&self.ctx).await,
            Screen::Results(data) => data.on_tick(&self.ctx).await,
            Screen::History(data) => data.on_tick(&self.ctx).await,
            Screen::Account(data) => data.on_tick(&self.ctx).await,
        };
        match result {
            Ok(change) => self.apply(change),
            Err(e) => self.show_error(e.to_string()),
        }
    }

    /// Any call that hits a 401 lands the user back on the login screen.
    fn handle_auth_events(&mut self) {
        loop {
            match self.auth_events.try_recv() {
                Ok(AuthEvent::Expired) | Err(TryRecvError::Lagged(_)) => {
                    // a failed login is reported by the login screen itself
                    if !matches!(self.screen, Screen::Login(_)) {
                        info!("Session expired, returning to login");
                        self.screen = Screen::Login(LoginScreenData::default());
                        self.show_error(
                            "Your session has expired. Please log in again.".to_string(),
                        );
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Closed) => {
                    warn!("Auth event channel closed");
                    break;
                }
            }
        }
    }

    async fn on_key_event(&mut self, key: KeyEvent) -> Result<ScreenChange> {
        if let (KeyEventKind::Press, KeyModifiers::CONTROL, KeyCode::Char('c')) =
            (key.kind, key.modifiers, key.code)
        {
            return Ok(ScreenChange::Quit);
        }
        if let Some(change) = self.navigate(key).await? {
            return Ok(change);
        }
        match &mut self.screen {
            Screen::Login(data) => data.on_key_event(key, &self.ctx).await,
            Screen::Profile(data) => data.on_key_event(key, &self.ctx).await,
            Screen::Scan(data) => data.on_key_event(key, &self.ctx).await,
            Screen::Scanner(data) => data.on_key_event(key, &self.ctx).await,
            Screen::Results(data) => data.on_key_event(key, &self.ctx).await,
            Screen::History(data) => data.on_key_event(key, &self.ctx).await,
            Screen::Account(data) => data.on_key_event(key, &self.ctx).await,
        }
    }

    /// Tab keys, only once the user is signed in and onboarded.
    async fn navigate(&self, key: KeyEvent) -> Result<Option<ScreenChange>> {
        if key.kind != KeyEventKind::Press || self.screen.tab().is_none() {
            return Ok(None);
        }
        let change = match key.code {
            KeyCode::F(1) => ScanScreenData::default().into(),
            KeyCode::F(2) => HistoryScreenData::load(&self.ctx, HistoryQuery::default())
                .await?
                .into(),
            KeyCode::F(3) => {
                let profile = self.ctx.client.session().read().await.hair_profile().cloned();
                ProfileScreenData::new(profile).into()
            }
            KeyCode::F(4) => AccountScreenData::load(&self.ctx).await?.into(),
            _ => return Ok(None),
        };
        Ok(Some(change))
    }

    fn apply(&mut self, change: ScreenChange) {
        match change {
            ScreenChange::Quit => self.running = false,
            ScreenChange::Switch(screen) => self.screen = screen,
            ScreenChange::None => {}
        }
    }

    fn show_error(&mut self, message: String) {
        warn!("{}", message);
        self.error_message.replace(message.into());
    }
}

pub struct ErrorPopup {
    message: String,
}

impl Widget for ErrorPopup {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        Clear.render(area, buf);
        Paragraph::new(self.message)
            .block(
                Block::bordered()
                    .title("Error occurred")
                    .style(Style::default().fg(Color::Red)),
            )
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}
