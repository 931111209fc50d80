use capture::{ScanOutcome, ScanSession, ScannerStart};
use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::info;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::prelude::{Color, Line, StatefulWidget, Style, Stylize, Widget};
use ratatui::widgets::{Block, Clear, Paragraph, Wrap};
use types::scan::ScanByBarcodeRequest;

use crate::data::{Context, OnKeyEvent, OnTick, Screen, ScreenChange};
use crate::results::ResultsScreenData;
use crate::scan::ScanScreenData;

pub enum ScannerState {
    Polling(ScanSession),
    PermissionModal,
    Unsupported,
    NoCamera,
    Failed(String),
    /// A barcode was read but the product lookup failed.
    LookupFailed { barcode: String, message: String },
}

/// Live barcode scanning. The capture loop runs in its own task; this screen
/// only polls it on each tick.
pub struct ScannerScreenData {
    state: ScannerState,
    started_at: DateTime<Utc>,
}

impl From<ScannerScreenData> for ScreenChange {
    fn from(data: ScannerScreenData) -> Self {
        ScreenChange::Switch(Screen::Scanner(data))
    }
}

impl ScannerScreenData {
    pub async fn open(ctx: &Context) -> Self {
        let state = match ctx.scanner.open().await {
            ScannerStart::Polling(session) => ScannerState::Polling(session),
            ScannerStart::PermissionModal => ScannerState::PermissionModal,
            ScannerStart::Unsupported => ScannerState::Unsupported,
            ScannerStart::NoCamera => ScannerState::NoCamera,
            ScannerStart::Failed(message) => ScannerState::Failed(message),
        };
        Self {
            state,
            started_at: Utc::now(),
        }
    }

    /// Scans the decoded barcode. A failed lookup stays on this screen so
    /// Enter can start another capture.
    async fn look_up(
        &mut self,
        ctx: &Context,
        barcode: String,
    ) -> color_eyre::Result<ScreenChange> {
        let request = ScanByBarcodeRequest {
            barcode: barcode.clone(),
        };
        match ctx.client.scan_by_barcode(request).await {
            Ok(scan) => Ok(ResultsScreenData::new(scan).into()),
            Err(e) => {
                self.state = ScannerState::LookupFailed {
                    barcode,
                    message: e.to_string(),
                };
                Err(e.into())
            }
        }
    }

    fn close(&mut self) -> ScreenChange {
        if let ScannerState::Polling(session) = &self.state {
            session.cancel();
        }
        ScanScreenData::default().into()
    }

    fn message(&self) -> (Line, String) {
        match &self.state {
            ScannerState::Polling(_) => {
                let elapsed = (Utc::now() - self.started_at).num_seconds();
                (
                    Line::from("Scanning...").bold(),
                    format!(
                        "Hold the barcode steady in front of the camera. ({elapsed}s)"
                    ),
                )
            }
            ScannerState::PermissionModal => (
                Line::from("Camera access needed").yellow().bold(),
                permission_guidance(std::env::consts::OS).to_string(),
            ),
            ScannerState::Unsupported => (
                Line::from("Camera not available").red().bold(),
                "This device cannot stream from a camera. Enter the barcode by hand instead."
                    .to_string(),
            ),
            ScannerState::NoCamera => (
                Line::from("No camera found").red().bold(),
                "Connect a camera or enter the barcode by hand.".to_string(),
            ),
            ScannerState::Failed(message) => (
                Line::from("Camera error").red().bold(),
                message.clone(),
            ),
            ScannerState::LookupFailed { barcode, message } => (
                Line::from(format!("Read {barcode}")).yellow().bold(),
                format!("{message}. Press Enter to scan again."),
            ),
        }
    }
}

/// How to grant camera access on each platform.
pub fn permission_guidance(os: &str) -> &'static str {
    match os {
        "macos" => {
            "Open System Settings > Privacy & Security > Camera and allow your terminal, \
             then press Enter to try again."
        }
        "windows" => {
            "Open Settings > Privacy & security > Camera, turn on \"Let desktop apps access \
             your camera\", then press Enter to try again."
        }
        _ => {
            "Make sure your user can read the camera device (usually by joining the \
             \"video\" group) and no other program is using it, then press Enter to try again."
        }
    }
}

pub struct ScannerScreenWidget;

impl StatefulWidget for ScannerScreenWidget {
    type State = ScannerScreenData;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        Block::bordered()
            .title(Line::from("Barcode scanner").centered())
            .title_bottom(
                Line::from(vec![
                    "Retry ".into(),
                    "<Enter>".light_blue().bold(),
                    " Close ".into(),
                    "<Esc>".light_blue().bold(),
                ])
                .centered(),
            )
            .render(area, buf);

        let [_, modal, _] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(7),
            Constraint::Fill(1),
        ])
        .flex(Flex::Center)
        .areas(area);
        let [modal] = Layout::horizontal([Constraint::Percentage(60)])
            .flex(Flex::Center)
            .areas(modal);

        let (title, body) = state.message();
        let border = match state.state {
            ScannerState::Polling(_) => Color::Cyan,
            ScannerState::PermissionModal | ScannerState::LookupFailed { .. } => Color::Yellow,
            _ => Color::Red,
        };
        Clear.render(modal, buf);
        Paragraph::new(body)
            .wrap(Wrap { trim: true })
            .centered()
            .block(
                Block::bordered()
                    .title(title.centered())
                    .border_style(Style::default().fg(border)),
            )
            .render(modal, buf);
    }
}

#[async_trait::async_trait]
impl OnTick for ScannerScreenData {
    async fn on_tick(&mut self, ctx: &Context) -> color_eyre::Result<ScreenChange> {
        let ScannerState::Polling(session) = &mut self.state else {
            return Ok(ScreenChange::None);
        };
        match session.try_outcome() {
            None => Ok(ScreenChange::None),
            Some(ScanOutcome::Cancelled) => Ok(ScanScreenData::default().into()),
            Some(ScanOutcome::Failed(message)) => {
                self.state = ScannerState::Failed(message);
                Ok(ScreenChange::None)
            }
            Some(ScanOutcome::Found(barcode)) => {
                info!("Scanned barcode {}", barcode);
                self.look_up(ctx, barcode).await
            }
        }
    }
}

#[async_trait::async_trait]
impl OnKeyEvent for ScannerScreenData {
    async fn on_key_event(
        &mut self,
        key: KeyEvent,
        ctx: &Context,
    ) -> color_eyre::Result<ScreenChange> {
        let change = match (key.kind, key.modifiers, key.code) {
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Esc) => self.close(),
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Enter)
                if !matches!(self.state, ScannerState::Polling(_)) =>
            {
                Self::open(ctx).await.into()
            }
            _ => ScreenChange::None,
        };
        Ok(change)
    }
}
