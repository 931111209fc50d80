use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Flex, Layout, Position, Rect};
use ratatui::prelude::{Line, StatefulWidget, Stylize, Widget};
use ratatui::widgets::{Block, Paragraph};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;
use types::domain::{non_empty, Account, AccountUpdate};

use crate::data::{self, Context, OnKeyEvent, OnTick, Screen, ScreenChange};
use crate::extension::{centered_column, input_cursor, Splittable};
use crate::login::LoginScreenData;
use crate::scan::ScanScreenData;

#[derive(Debug)]
pub struct AccountScreenData {
    account: Account,
    full_name_input: Input,
    email_input: Input,
    focus: AccountFocus,
    pub(crate) cursor_position: Option<Position>,
}

#[derive(Debug, PartialEq, Default, Clone, Copy)]
pub enum AccountFocus {
    #[default]
    FullName,
    Email,
    Save,
    Logout,
}

impl AccountFocus {
    fn next(self) -> Self {
        match self {
            AccountFocus::FullName => AccountFocus::Email,
            AccountFocus::Email => AccountFocus::Save,
            AccountFocus::Save => AccountFocus::Logout,
            AccountFocus::Logout => AccountFocus::FullName,
        }
    }
}

impl From<AccountScreenData> for ScreenChange {
    fn from(data: AccountScreenData) -> Self {
        ScreenChange::Switch(Screen::Account(data))
    }
}

impl AccountScreenData {
    pub async fn load(ctx: &Context) -> color_eyre::Result<Self> {
        Ok(Self::new(ctx.client.get_account().await?))
    }

    fn new(account: Account) -> Self {
        Self {
            full_name_input: Input::new(account.full_name.clone()),
            email_input: Input::new(account.email.clone()),
            account,
            focus: AccountFocus::default(),
            cursor_position: None,
        }
    }

    /// Only fields that were edited, so an untouched form sends nothing.
    fn update(&self) -> AccountUpdate {
        AccountUpdate {
            full_name: non_empty(self.full_name_input.value())
                .filter(|name| *name != self.account.full_name),
            email: non_empty(self.email_input.value()).filter(|email| *email != self.account.email),
        }
    }

    async fn handle_enter(&mut self, ctx: &Context) -> color_eyre::Result<ScreenChange> {
        match self.focus {
            AccountFocus::Save => {
                let update = self.update();
                if update.full_name.is_some() || update.email.is_some() {
                    *self = Self::new(ctx.client.update_account(update).await?);
                }
                Ok(ScanScreenData::default().into())
            }
            AccountFocus::Logout => {
                ctx.client.logout().await;
                Ok(LoginScreenData::default().into())
            }
            _ => {
                self.focus = self.focus.next();
                Ok(ScreenChange::None)
            }
        }
    }
}

pub struct AccountScreenWidget;

impl StatefulWidget for AccountScreenWidget {
    type State = AccountScreenData;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let block = Block::bordered()
            .title(Line::from("Account").centered())
            .title_bottom(
                Line::from(vec![
                    "Move ".into(),
                    "<Tab>".light_blue().bold(),
                    " Back ".into(),
                    "<Esc>".light_blue().bold(),
                ])
                .centered(),
            );
        let inner = block.inner(area);
        block.render(area, buf);

        let [_, form, _] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(11),
            Constraint::Fill(1),
        ])
        .flex(Flex::Center)
        .areas(inner);
        let [summary, full_name, email, actions] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .areas(centered_column(form, 50));

        let since = state
            .account
            .created_at
            .map(|at| format!(", member since {}", at.format("%B %Y")))
            .unwrap_or_default();
        Paragraph::new(format!("{} scans{}", state.account.total_scans, since))
            .centered()
            .italic()
            .render(summary, buf);
        Paragraph::new(state.full_name_input.value())
            .block(Block::bordered().title("Full name"))
            .render(full_name, buf);
        Paragraph::new(state.email_input.value())
            .block(Block::bordered().title("Email"))
            .render(email, buf);

        let [save, logout] = Layout::split_equal(actions, Direction::Horizontal);
        Paragraph::new(data::highlight("Save", state.focus == AccountFocus::Save))
            .centered()
            .block(Block::bordered())
            .render(save, buf);
        Paragraph::new(data::highlight("Log out", state.focus == AccountFocus::Logout))
            .centered()
            .block(Block::bordered())
            .render(logout, buf);

        state.cursor_position = match state.focus {
            AccountFocus::FullName => Some(input_cursor(&state.full_name_input, full_name)),
            AccountFocus::Email => Some(input_cursor(&state.email_input, email)),
            _ => None,
        };
    }
}

impl OnTick for AccountScreenData {}

#[async_trait::async_trait]
impl OnKeyEvent for AccountScreenData {
    async fn on_key_event(
        &mut self,
        key: KeyEvent,
        ctx: &Context,
    ) -> color_eyre::Result<ScreenChange> {
        match (key.kind, key.modifiers, key.code) {
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Esc) => {
                Ok(ScanScreenData::default().into())
            }
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Tab | KeyCode::Down) => {
                self.focus = self.focus.next();
                Ok(ScreenChange::None)
            }
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Enter) => {
                self.handle_enter(ctx).await
            }
            _ => {
                match self.focus {
                    AccountFocus::FullName => {
                        self.full_name_input.handle_event(&Event::Key(key));
                    }
                    AccountFocus::Email => {
                        self.email_input.handle_event(&Event::Key(key));
                    }
                    _ => {}
                }
                Ok(ScreenChange::None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn account() -> Account {
        Account {
            user_id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            full_name: "Ada Lovelace".to_string(),
            created_at: None,
            total_scans: 3,
        }
    }

    #[test]
    fn untouched_form_updates_nothing() {
        let update = AccountScreenData::new(account()).update();
        assert_eq!(update.full_name, None);
        assert_eq!(update.email, None);
    }

    #[test]
    fn only_edited_fields_are_sent() {
        let mut data = AccountScreenData::new(account());
        data.full_name_input = Input::new("Ada King".to_string());
        data.email_input = Input::new("  ".to_string());

        let update = data.update();
        assert_eq!(update.full_name.as_deref(), Some("Ada King"));
        assert_eq!(update.email, None);
    }
}
