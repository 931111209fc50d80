use std::path::PathBuf;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::prelude::{Line, StatefulWidget, Stylize, Widget};
use ratatui::widgets::{Block, Paragraph, Tabs};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;
use types::domain::non_empty;
use types::scan::{ScanByBarcodeRequest, ScanByIngredientsRequest};

use crate::data::{Context, OnKeyEvent, OnTick, Screen, ScreenChange};
use crate::extension::input_cursor;
use crate::results::ResultsScreenData;
use crate::scanner::ScannerScreenData;

#[derive(Debug, PartialEq, Default, Clone, Copy)]
pub enum ScanMode {
    #[default]
    Ingredients,
    Barcode,
    Image,
}

impl ScanMode {
    const TITLES: [&'static str; 3] = ["Ingredient list", "Barcode", "Label photo"];

    fn index(self) -> usize {
        match self {
            ScanMode::Ingredients => 0,
            ScanMode::Barcode => 1,
            ScanMode::Image => 2,
        }
    }

    fn next(self) -> Self {
        match self {
            ScanMode::Ingredients => ScanMode::Barcode,
            ScanMode::Barcode => ScanMode::Image,
            ScanMode::Image => ScanMode::Ingredients,
        }
    }

    fn field_count(self) -> usize {
        match self {
            ScanMode::Ingredients => 4,
            ScanMode::Barcode | ScanMode::Image => 1,
        }
    }
}

/// Entry point for all three ways of scanning a product.
#[derive(Debug, Default)]
pub struct ScanScreenData {
    mode: ScanMode,
    ingredients_input: Input,
    product_name_input: Input,
    brand_input: Input,
    category_input: Input,
    barcode_input: Input,
    image_path_input: Input,
    focus: usize,
    pub(crate) cursor_position: Option<Position>,
}

impl From<ScanScreenData> for ScreenChange {
    fn from(data: ScanScreenData) -> Self {
        ScreenChange::Switch(Screen::Scan(data))
    }
}

impl ScanScreenData {
    fn fields(&self) -> Vec<(&'static str, &Input)> {
        match self.mode {
            ScanMode::Ingredients => vec![
                ("Ingredients (comma separated)", &self.ingredients_input),
                ("Product name (optional)", &self.product_name_input),
                ("Brand (optional)", &self.brand_input),
                ("Category (optional)", &self.category_input),
            ],
            ScanMode::Barcode => vec![("Barcode", &self.barcode_input)],
            ScanMode::Image => vec![("Path to a photo of the label", &self.image_path_input)],
        }
    }

    fn focused_input(&mut self) -> &mut Input {
        match (self.mode, self.focus) {
            (ScanMode::Ingredients, 1) => &mut self.product_name_input,
            (ScanMode::Ingredients, 2) => &mut self.brand_input,
            (ScanMode::Ingredients, 3) => &mut self.category_input,
            (ScanMode::Ingredients, _) => &mut self.ingredients_input,
            (ScanMode::Barcode, _) => &mut self.barcode_input,
            (ScanMode::Image, _) => &mut self.image_path_input,
        }
    }

    fn switch_mode(&mut self) {
        self.mode = self.mode.next();
        self.focus = 0;
    }

    fn ingredients_request(&self) -> ScanByIngredientsRequest {
        ScanByIngredientsRequest {
            ingredients_text: self.ingredients_input.value().trim().to_string(),
            product_name: non_empty(self.product_name_input.value()),
            product_brand: non_empty(self.brand_input.value()),
            product_category: non_empty(self.category_input.value()),
        }
    }

    async fn submit(&mut self, ctx: &Context) -> color_eyre::Result<ScreenChange> {
        let scan = match self.mode {
            ScanMode::Ingredients => {
                ctx.client
                    .scan_by_ingredients(self.ingredients_request())
                    .await?
            }
            ScanMode::Barcode => {
                ctx.client
                    .scan_by_barcode(ScanByBarcodeRequest {
                        barcode: self.barcode_input.value().trim().to_string(),
                    })
                    .await?
            }
            ScanMode::Image => {
                let path = PathBuf::from(self.image_path_input.value().trim());
                ctx.client.scan_by_image(&path).await?
            }
        };
        Ok(ResultsScreenData::new(scan).into())
    }

    fn instructions(&self) -> Line<'static> {
        let mut spans = vec![
            "Scan ".into(),
            "<Enter>".light_blue().bold(),
            " Next field ".into(),
            "<Tab>".light_blue().bold(),
            " Mode ".into(),
            "<CTRL + N>".light_blue().bold(),
        ];
        if self.mode == ScanMode::Barcode {
            spans.extend([" Camera ".into(), "<CTRL + O>".light_blue().bold()]);
        }
        spans.into()
    }
}

pub struct ScanScreenWidget;

impl StatefulWidget for ScanScreenWidget {
    type State = ScanScreenData;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let block = Block::bordered()
            .title(Line::from("Scan a product").centered())
            .title_bottom(state.instructions().centered());
        let inner = block.inner(area);
        block.render(area, buf);

        let [tabs, form] =
            Layout::vertical([Constraint::Length(2), Constraint::Min(0)]).areas(inner);
        Tabs::new(ScanMode::TITLES)
            .select(state.mode.index())
            .highlight_style(ratatui::style::Style::default().reversed())
            .render(tabs, buf);

        let fields = state.fields();
        let rows = Layout::vertical(vec![Constraint::Length(3); fields.len()]).split(form);
        for ((title, input), row) in fields.iter().zip(rows.iter()) {
            Paragraph::new(input.value())
                .block(Block::bordered().title(*title))
                .render(*row, buf);
        }
        let cursor = fields
            .get(state.focus)
            .zip(rows.get(state.focus))
            .map(|((_, input), row)| input_cursor(input, *row));
        state.cursor_position = cursor;
    }
}

impl OnTick for ScanScreenData {}

#[async_trait::async_trait]
impl OnKeyEvent for ScanScreenData {
    async fn on_key_event(
        &mut self,
        key: KeyEvent,
        ctx: &Context,
    ) -> color_eyre::Result<ScreenChange> {
        let change = match (key.kind, key.modifiers, key.code) {
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Esc) => ScreenChange::Quit,
            (KeyEventKind::Press, KeyModifiers::CONTROL, KeyCode::Char('n')) => {
                self.switch_mode();
                ScreenChange::None
            }
            (KeyEventKind::Press, KeyModifiers::CONTROL, KeyCode::Char('o'))
                if self.mode == ScanMode::Barcode =>
            {
                ScannerScreenData::open(ctx).await.into()
            }
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Tab | KeyCode::Down) => {
                self.focus = (self.focus + 1) % self.mode.field_count();
                ScreenChange::None
            }
            (KeyEventKind::Press, KeyModifiers::SHIFT, KeyCode::BackTab)
            | (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Up) => {
                let count = self.mode.field_count();
                self.focus = (self.focus + count - 1) % count;
                ScreenChange::None
            }
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Enter) => {
                return self.submit(ctx).await;
            }
            _ => {
                self.focused_input().handle_event(&Event::Key(key));
                ScreenChange::None
            }
        };
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_product_fields_are_left_out_when_blank() {
        let data = ScanScreenData {
            ingredients_input: Input::new(" Water, Glycerin, Shea Butter ".to_string()),
            brand_input: Input::new("   ".to_string()),
            ..Default::default()
        };
        let request = data.ingredients_request();
        assert_eq!(request.ingredients_text, "Water, Glycerin, Shea Butter");
        assert_eq!(request.product_name, None);
        assert_eq!(request.product_brand, None);
    }

    #[test]
    fn switching_mode_resets_focus() {
        let mut data = ScanScreenData {
            focus: 3,
            ..Default::default()
        };
        data.switch_mode();
        assert_eq!(data.mode, ScanMode::Barcode);
        assert_eq!(data.focus, 0);
        assert_eq!(data.fields().len(), 1);
    }

    #[test]
    fn typing_goes_to_the_focused_field() {
        let mut data = ScanScreenData {
            focus: 2,
            ..Default::default()
        };
        data.focused_input()
            .handle_event(&Event::Key(KeyEvent::from(KeyCode::Char('x'))));
        assert_eq!(data.brand_input.value(), "x");
        assert_eq!(data.ingredients_input.value(), "");
    }
}
