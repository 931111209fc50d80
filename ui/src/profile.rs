use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::info;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Flex, Layout, Position, Rect};
use ratatui::prelude::{Line, Modifier, StatefulWidget, Style, Stylize, Widget};
use ratatui::widgets::{Block, Paragraph};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;
use types::domain::{non_empty, Choice, HairProfile, HairProfileCreate, HairProfileUpdate};

use crate::data::{self, Context, OnKeyEvent, OnTick, Screen, ScreenChange};
use crate::extension::{centered_column, input_cursor};
use crate::scan::ScanScreenData;

/// Hair profile form. Without an existing profile it doubles as onboarding.
#[derive(Debug)]
pub struct ProfileScreenData {
    existing: Option<HairProfile>,
    draft: HairProfileCreate,
    notes_input: Input,
    focus: ProfileFocus,
    pub(crate) cursor_position: Option<Position>,
}

#[derive(Debug, PartialEq, Default, Clone, Copy)]
pub enum ProfileFocus {
    #[default]
    Porosity,
    CurlPattern,
    ScalpType,
    Density,
    Notes,
    Save,
}

impl ProfileFocus {
    const ORDER: [ProfileFocus; 6] = [
        ProfileFocus::Porosity,
        ProfileFocus::CurlPattern,
        ProfileFocus::ScalpType,
        ProfileFocus::Density,
        ProfileFocus::Notes,
        ProfileFocus::Save,
    ];

    fn step(self, forward: bool) -> Self {
        let index = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        let len = Self::ORDER.len();
        let next = if forward { index + 1 } else { index + len - 1 };
        Self::ORDER[next % len]
    }
}

impl From<ProfileScreenData> for ScreenChange {
    fn from(data: ProfileScreenData) -> Self {
        ScreenChange::Switch(Screen::Profile(data))
    }
}

impl ProfileScreenData {
    pub fn new(existing: Option<HairProfile>) -> Self {
        let draft = existing
            .as_ref()
            .map(HairProfileCreate::from)
            .unwrap_or_default();
        let notes_input = Input::new(draft.notes.clone().unwrap_or_default());
        Self {
            existing,
            draft,
            notes_input,
            focus: ProfileFocus::default(),
            cursor_position: None,
        }
    }

    pub fn is_onboarding(&self) -> bool {
        self.existing.is_none()
    }

    fn cycle(&mut self, forward: bool) {
        fn step<T: Choice>(value: T, forward: bool) -> T {
            if forward {
                value.next()
            } else {
                value.previous()
            }
        }
        match self.focus {
            ProfileFocus::Porosity => self.draft.porosity = step(self.draft.porosity, forward),
            ProfileFocus::CurlPattern => {
                self.draft.curl_pattern = step(self.draft.curl_pattern, forward)
            }
            ProfileFocus::ScalpType => {
                self.draft.scalp_type = step(self.draft.scalp_type, forward)
            }
            ProfileFocus::Density => self.draft.density = step(self.draft.density, forward),
            ProfileFocus::Notes | ProfileFocus::Save => {}
        }
    }

    fn submitted_draft(&self) -> HairProfileCreate {
        HairProfileCreate {
            notes: non_empty(self.notes_input.value()),
            ..self.draft.clone()
        }
    }

    async fn save(&mut self, ctx: &Context) -> color_eyre::Result<ScreenChange> {
        let draft = self.submitted_draft();
        match &self.existing {
            Some(current) => {
                let update = HairProfileUpdate::diff(current, &draft);
                if update.is_empty() {
                    info!("Hair profile unchanged");
                } else {
                    ctx.client.update_hair_profile(update).await?;
                }
            }
            None => {
                ctx.client.create_hair_profile(draft).await?;
            }
        }
        Ok(ScanScreenData::default().into())
    }

    fn instructions(&self) -> Line<'static> {
        let mut spans = vec![
            "Change ".into(),
            "<Left/Right>".light_blue().bold(),
            " Move ".into(),
            "<Tab>".light_blue().bold(),
        ];
        if self.existing.is_some() {
            spans.extend([
                " Delete ".into(),
                "<CTRL + D>".red().bold(),
                " Back ".into(),
                "<Esc>".light_blue().bold(),
            ]);
        } else {
            spans.extend([" Quit ".into(), "<Esc>".red().bold()]);
        }
        spans.into()
    }
}

pub struct ProfileScreenWidget;

impl StatefulWidget for ProfileScreenWidget {
    type State = ProfileScreenData;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let title = if state.is_onboarding() {
            "Tell us about your hair"
        } else {
            "Hair profile"
        };
        let block = Block::bordered()
            .title(Line::from(title).centered())
            .title_bottom(state.instructions().centered());
        let inner = block.inner(area);
        block.render(area, buf);

        let [_, form, _] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(18),
            Constraint::Fill(1),
        ])
        .flex(Flex::Center)
        .areas(inner);
        let form = centered_column(form, 50);
        let rows: [Rect; 6] = Layout::vertical([Constraint::Length(3); 6]).areas(form);

        let choices = [
            ("Porosity", state.draft.porosity.to_string(), ProfileFocus::Porosity),
            (
                "Curl pattern",
                state.draft.curl_pattern.to_string(),
                ProfileFocus::CurlPattern,
            ),
            ("Scalp", state.draft.scalp_type.to_string(), ProfileFocus::ScalpType),
            ("Density", state.draft.density.to_string(), ProfileFocus::Density),
        ];
        for ((label, value, focus), row) in choices.into_iter().zip(rows) {
            Paragraph::new(data::highlight(format!("< {value} >"), state.focus == focus))
                .centered()
                .block(Block::bordered().title(label))
                .render(row, buf);
        }

        Paragraph::new(state.notes_input.value())
            .block(Block::bordered().title("Notes"))
            .render(rows[4], buf);
        let save = if state.is_onboarding() { "Continue" } else { "Save" };
        Paragraph::new(data::highlight(save, state.focus == ProfileFocus::Save))
            .centered()
            .style(Style::default().add_modifier(Modifier::BOLD))
            .block(Block::bordered())
            .render(rows[5], buf);

        state.cursor_position =
            (state.focus == ProfileFocus::Notes).then(|| input_cursor(&state.notes_input, rows[4]));
    }
}

impl OnTick for ProfileScreenData {}

#[async_trait::async_trait]
impl OnKeyEvent for ProfileScreenData {
    async fn on_key_event(
        &mut self,
        key: KeyEvent,
        ctx: &Context,
    ) -> color_eyre::Result<ScreenChange> {
        let change = match (key.kind, key.modifiers, key.code) {
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Esc) => {
                if self.is_onboarding() {
                    ScreenChange::Quit
                } else {
                    ScanScreenData::default().into()
                }
            }
            (KeyEventKind::Press, KeyModifiers::CONTROL, KeyCode::Char('d'))
                if !self.is_onboarding() =>
            {
                ctx.client.delete_hair_profile().await?;
                ProfileScreenData::new(None).into()
            }
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Tab | KeyCode::Down) => {
                self.focus = self.focus.step(true);
                ScreenChange::None
            }
            (KeyEventKind::Press, KeyModifiers::SHIFT, KeyCode::BackTab)
            | (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Up) => {
                self.focus = self.focus.step(false);
                ScreenChange::None
            }
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Enter) => {
                if self.focus == ProfileFocus::Save {
                    return self.save(ctx).await;
                }
                self.focus = self.focus.step(true);
                ScreenChange::None
            }
            _ if self.focus == ProfileFocus::Notes => {
                self.notes_input.handle_event(&Event::Key(key));
                ScreenChange::None
            }
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Left | KeyCode::Right) => {
                self.cycle(key.code == KeyCode::Right);
                ScreenChange::None
            }
            _ => ScreenChange::None,
        };
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::domain::{CurlPattern, Density, Porosity, ScalpType};

    fn profile() -> HairProfile {
        HairProfile {
            profile_id: Some("p-1".to_string()),
            user_id: None,
            porosity: Porosity::Low,
            curl_pattern: CurlPattern::Type4C,
            scalp_type: ScalpType::Dry,
            density: Density::High,
            notes: Some("shrinkage".to_string()),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn onboarding_starts_from_defaults() {
        let data = ProfileScreenData::new(None);
        assert!(data.is_onboarding());
        assert_eq!(data.submitted_draft(), HairProfileCreate::default());
    }

    #[test]
    fn editing_starts_from_the_stored_profile() {
        let data = ProfileScreenData::new(Some(profile()));
        assert!(!data.is_onboarding());
        assert_eq!(data.notes_input.value(), "shrinkage");
        assert_eq!(data.submitted_draft(), HairProfileCreate::from(&profile()));
    }

    #[test]
    fn arrows_cycle_the_focused_choice() {
        let mut data = ProfileScreenData::new(Some(profile()));
        data.focus = ProfileFocus::CurlPattern;
        data.cycle(true);
        assert_eq!(data.draft.curl_pattern, CurlPattern::Type3A);
        data.cycle(false);
        data.cycle(false);
        assert_eq!(data.draft.curl_pattern, CurlPattern::Type4B);

        let update = HairProfileUpdate::diff(&profile(), &data.submitted_draft());
        assert_eq!(update.curl_pattern, Some(CurlPattern::Type4B));
        assert_eq!(update.porosity, None);
    }

    #[test]
    fn focus_wraps_both_ways() {
        assert_eq!(ProfileFocus::Save.step(true), ProfileFocus::Porosity);
        assert_eq!(ProfileFocus::Porosity.step(false), ProfileFocus::Save);
    }
}
