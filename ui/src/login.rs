use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Flex, Layout, Position, Rect};
use ratatui::prelude::{Color, Masked, Modifier, Span, StatefulWidget, Style, Widget};
use ratatui::widgets::{Block, Paragraph};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;
use types::domain::{LoginRequest, RegisterRequest};

use crate::data::{self, landing_screen, Context, OnKeyEvent, OnTick, Screen, ScreenChange};
use crate::extension::{centered_column, input_cursor, Splittable};
use crate::profile::ProfileScreenData;

#[derive(Debug, Default)]
pub struct LoginScreenData {
    email_input: Input,
    password_input: Input,
    full_name_input: Input,
    focus: LoginScreenFocus,
    pub(crate) cursor_position: Option<Position>,
}

impl From<LoginScreenData> for ScreenChange {
    fn from(data: LoginScreenData) -> Self {
        ScreenChange::Switch(Screen::Login(data))
    }
}

#[derive(Debug, PartialEq, Default, Clone, Copy)]
pub enum LoginScreenFocus {
    #[default]
    Email,
    Password,
    FullName,
    Login,
    Register,
}

impl LoginScreenFocus {
    fn next(self) -> Self {
        match self {
            LoginScreenFocus::Email => LoginScreenFocus::Password,
            LoginScreenFocus::Password => LoginScreenFocus::FullName,
            LoginScreenFocus::FullName => LoginScreenFocus::Login,
            LoginScreenFocus::Login => LoginScreenFocus::Register,
            LoginScreenFocus::Register => LoginScreenFocus::Email,
        }
    }

    fn previous(self) -> Self {
        match self {
            LoginScreenFocus::Email => LoginScreenFocus::Register,
            LoginScreenFocus::Password => LoginScreenFocus::Email,
            LoginScreenFocus::FullName => LoginScreenFocus::Password,
            LoginScreenFocus::Login => LoginScreenFocus::FullName,
            LoginScreenFocus::Register => LoginScreenFocus::Login,
        }
    }
}

impl LoginScreenData {
    fn handle_input_event(&mut self, key: KeyEvent) {
        let input = match self.focus {
            LoginScreenFocus::Email => &mut self.email_input,
            LoginScreenFocus::Password => &mut self.password_input,
            LoginScreenFocus::FullName => &mut self.full_name_input,
            _ => return,
        };
        input.handle_event(&Event::Key(key));
    }

    fn login_request(&self) -> LoginRequest {
        LoginRequest {
            email: self.email_input.value().trim().to_string(),
            password: self.password_input.value().to_string(),
        }
    }

    fn register_request(&self) -> RegisterRequest {
        RegisterRequest {
            email: self.email_input.value().trim().to_string(),
            password: self.password_input.value().to_string(),
            full_name: self.full_name_input.value().trim().to_string(),
        }
    }

    async fn handle_enter(&mut self, ctx: &Context) -> color_eyre::Result<ScreenChange> {
        let change = match self.focus {
            LoginScreenFocus::Login => {
                ctx.client.login(self.login_request()).await?;
                ScreenChange::Switch(landing_screen(ctx).await)
            }
            LoginScreenFocus::Register => {
                ctx.client.register(self.register_request()).await?;
                ProfileScreenData::new(None).into()
            }
            _ => {
                self.focus = self.focus.next();
                ScreenChange::None
            }
        };
        Ok(change)
    }

    fn update_cursor_position(&mut self, email: Rect, password: Rect, full_name: Rect) {
        self.cursor_position = match self.focus {
            LoginScreenFocus::Email => Some(input_cursor(&self.email_input, email)),
            LoginScreenFocus::Password => Some(input_cursor(&self.password_input, password)),
            LoginScreenFocus::FullName => Some(input_cursor(&self.full_name_input, full_name)),
            _ => None,
        };
    }
}

pub struct LoginScreenWidget;

impl StatefulWidget for LoginScreenWidget {
    type State = LoginScreenData;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let [_, all, _] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(13),
            Constraint::Fill(1),
        ])
        .flex(Flex::Center)
        .areas(area);
        let [email, password, full_name, actions, instructions] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .areas(all);

        let email = centered_column(email, 50);
        Paragraph::new(state.email_input.value())
            .block(Block::bordered().title("Email"))
            .render(email, buf);

        let password = centered_column(password, 50);
        let password_text =
            Span::styled(Masked::new(state.password_input.value(), '*'), Color::White);
        Paragraph::new(password_text)
            .block(Block::bordered().title("Password"))
            .render(password, buf);

        let full_name = centered_column(full_name, 50);
        Paragraph::new(state.full_name_input.value())
            .block(Block::bordered().title("Full name (register only)"))
            .render(full_name, buf);

        let [_, login, register, _] = Layout::split_equal(actions, Direction::Horizontal);
        Paragraph::new(data::highlight(
            "Login",
            state.focus == LoginScreenFocus::Login,
        ))
        .centered()
        .block(Block::bordered())
        .render(login, buf);
        Paragraph::new(data::highlight(
            "Register",
            state.focus == LoginScreenFocus::Register,
        ))
        .centered()
        .block(Block::bordered())
        .render(register, buf);
        Paragraph::new("Press Tab to switch focus, Esc to quit")
            .style(Style::default().add_modifier(Modifier::ITALIC))
            .centered()
            .render(instructions, buf);
        state.update_cursor_position(email, password, full_name);
    }
}

impl OnTick for LoginScreenData {}

#[async_trait::async_trait]
impl OnKeyEvent for LoginScreenData {
    async fn on_key_event(
        &mut self,
        key: KeyEvent,
        ctx: &Context,
    ) -> color_eyre::Result<ScreenChange> {
        match (key.kind, key.modifiers, key.code) {
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Esc) => Ok(ScreenChange::Quit),
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Tab | KeyCode::Down) => {
                self.focus = self.focus.next();
                Ok(ScreenChange::None)
            }
            (KeyEventKind::Press, KeyModifiers::SHIFT, KeyCode::BackTab)
            | (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Up) => {
                self.focus = self.focus.previous();
                Ok(ScreenChange::None)
            }
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Enter) => {
                self.handle_enter(ctx).await
            }
            _ => {
                self.handle_input_event(key);
                Ok(ScreenChange::None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_cycles_through_every_field() {
        let mut focus = LoginScreenFocus::default();
        for _ in 0..5 {
            assert_eq!(focus.next().previous(), focus);
            focus = focus.next();
        }
        assert_eq!(focus, LoginScreenFocus::Email);
    }

    #[test]
    fn requests_trim_identity_fields_but_not_passwords() {
        let data = LoginScreenData {
            email_input: Input::new(" ada@example.com ".to_string()),
            password_input: Input::new(" secret ".to_string()),
            full_name_input: Input::new("Ada Lovelace ".to_string()),
            ..Default::default()
        };
        let request = data.register_request();
        assert_eq!(request.email, "ada@example.com");
        assert_eq!(request.password, " secret ");
        assert_eq!(request.full_name, "Ada Lovelace");
        assert_eq!(data.login_request().email, "ada@example.com");
    }
}
