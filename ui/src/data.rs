use std::borrow::Cow;

use capture::Scanner;
use client::client::Client;
use color_eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::layout::Position;
use ratatui::prelude::{Color, Span, Style};

use crate::account::AccountScreenData;
use crate::history::HistoryScreenData;
use crate::login::LoginScreenData;
use crate::profile::ProfileScreenData;
use crate::results::ResultsScreenData;
use crate::scan::ScanScreenData;
use crate::scanner::ScannerScreenData;

/// Everything a screen needs to talk to the outside world.
pub struct Context {
    pub client: Client,
    pub scanner: Scanner,
}

pub enum ScreenChange {
    Quit,
    Switch(Screen),
    None,
}

pub enum Screen {
    Login(LoginScreenData),
    Profile(ProfileScreenData),
    Scan(ScanScreenData),
    Scanner(ScannerScreenData),
    Results(ResultsScreenData),
    History(HistoryScreenData),
    Account(AccountScreenData),
}

impl Screen {
    pub fn cursor_position(&self) -> Option<Position> {
        match self {
            Screen::Login(data) => data.cursor_position,
            Screen::Profile(data) => data.cursor_position,
            Screen::Scan(data) => data.cursor_position,
            Screen::Account(data) => data.cursor_position,
            Screen::Scanner(_) | Screen::Results(_) | Screen::History(_) => None,
        }
    }

    /// Index into the navigation tabs, `None` for screens outside them.
    pub fn tab(&self) -> Option<usize> {
        match self {
            Screen::Login(_) => None,
            Screen::Profile(data) if data.is_onboarding() => None,
            Screen::Scan(_) | Screen::Scanner(_) | Screen::Results(_) => Some(0),
            Screen::History(_) => Some(1),
            Screen::Profile(_) => Some(2),
            Screen::Account(_) => Some(3),
        }
    }
}

/// Where a signed-out, new or returning user starts.
pub async fn landing_screen(ctx: &Context) -> Screen {
    let session = ctx.client.session().read().await;
    if !session.is_authenticated() {
        Screen::Login(LoginScreenData::default())
    } else if session.hair_profile().is_none() {
        Screen::Profile(ProfileScreenData::new(None))
    } else {
        Screen::Scan(ScanScreenData::default())
    }
}

#[async_trait::async_trait]
pub trait OnTick: Send {
    async fn on_tick(&mut self, _ctx: &Context) -> Result<ScreenChange> {
        Ok(ScreenChange::None)
    }
}

#[async_trait::async_trait]
pub trait OnKeyEvent {
    async fn on_key_event(&mut self, key: KeyEvent, ctx: &Context) -> Result<ScreenChange>;
}

pub fn highlight<'a>(text: impl Into<Cow<'a, str>>, needed: bool) -> Span<'a> {
    if needed {
        Span::styled(text, Style::default().bg(Color::White).fg(Color::Black))
    } else {
        Span::styled(text, Style::default())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use capture::{RxingDecoder, UnavailableCamera};
    use client::session::{MemoryStorage, Session};
    use rstest::rstest;
    use tokio::net::TcpListener;
    use types::domain::{CurlPattern, Density, HairProfile, Porosity, ScalpType};

    use super::*;

    pub(crate) fn context_at(base_url: String) -> Context {
        let session = Session::restore(Box::new(MemoryStorage::default())).into_shared();
        Context {
            client: Client::new(base_url, session),
            scanner: Scanner::new(Arc::new(UnavailableCamera), Arc::new(RxingDecoder)),
        }
    }

    /// A context over in-memory storage whose backend refuses connections.
    pub(crate) async fn offline_context() -> Context {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        context_at(format!("http://{addr}/api"))
    }

    pub(crate) fn profile() -> HairProfile {
        HairProfile {
            profile_id: Some("p-1".to_string()),
            user_id: None,
            porosity: Porosity::High,
            curl_pattern: CurlPattern::Type3B,
            scalp_type: ScalpType::Oily,
            density: Density::Medium,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[rstest]
    #[case(false, false, "login")]
    #[case(false, true, "login")]
    #[case(true, false, "onboarding")]
    #[case(true, true, "scan")]
    #[tokio::test]
    async fn landing_screen_guards_signed_in_screens(
        #[case] signed_in: bool,
        #[case] has_profile: bool,
        #[case] expected: &str,
    ) {
        let ctx = offline_context().await;
        {
            let mut session = ctx.client.session().write().await;
            if signed_in {
                session.set_token("token-1".to_string());
            }
            if has_profile {
                session.set_hair_profile(Some(profile()));
            }
        }

        let landed = match landing_screen(&ctx).await {
            Screen::Login(_) => "login",
            Screen::Profile(data) if data.is_onboarding() => "onboarding",
            Screen::Scan(_) => "scan",
            _ => "other",
        };
        assert_eq!(landed, expected);
    }

    #[test]
    fn only_signed_in_screens_have_tabs() {
        assert_eq!(Screen::Login(LoginScreenData::default()).tab(), None);
        assert_eq!(Screen::Profile(ProfileScreenData::new(None)).tab(), None);
        assert_eq!(Screen::Profile(ProfileScreenData::new(Some(profile()))).tab(), Some(2));
        assert_eq!(Screen::Scan(ScanScreenData::default()).tab(), Some(0));
    }
}
