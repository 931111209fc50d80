use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::info;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Rect};
use ratatui::prelude::{Line, Modifier, StatefulWidget, Style, Stylize};
use ratatui::widgets::{Block, Cell, Row, Table, TableState};
use types::scan::{HistoryQuery, ScanResult};

use crate::data::{Context, OnKeyEvent, OnTick, Screen, ScreenChange};
use crate::results::{verdict_color, ResultsScreenData};
use crate::scan::ScanScreenData;

#[derive(Debug)]
pub struct HistoryScreenData {
    pub scans: Vec<ScanResult>,
    pub query: HistoryQuery,
    pub table_state: TableState,
    /// Set once the page after this one came back empty.
    last_page: bool,
}

impl From<HistoryScreenData> for ScreenChange {
    fn from(data: HistoryScreenData) -> Self {
        ScreenChange::Switch(Screen::History(data))
    }
}

impl HistoryScreenData {
    pub async fn load(ctx: &Context, query: HistoryQuery) -> color_eyre::Result<Self> {
        let scans = ctx.client.scan_history(query).await?;
        Ok(Self::new(scans, query))
    }

    fn new(scans: Vec<ScanResult>, query: HistoryQuery) -> Self {
        let selected = (!scans.is_empty()).then_some(0);
        Self {
            scans,
            query,
            table_state: TableState::default().with_selected(selected),
            last_page: false,
        }
    }

    fn has_next_page(&self) -> bool {
        !self.last_page && self.scans.len() as u32 >= self.query.limit
    }

    /// Moves to `next` unless it is empty, in which case this page is the last.
    fn advance(&mut self, next: HistoryScreenData) -> ScreenChange {
        if next.scans.is_empty() {
            info!("No scans past page {}", self.query.page());
            self.last_page = true;
            ScreenChange::None
        } else {
            next.into()
        }
    }

    fn has_previous_page(&self) -> bool {
        self.query.skip > 0
    }

    fn selected(&self) -> Option<&ScanResult> {
        self.table_state
            .selected()
            .and_then(|selected| self.scans.get(selected))
    }

    async fn delete_selected(&mut self, ctx: &Context) -> color_eyre::Result<()> {
        let Some(scan_id) = self.selected().map(|scan| scan.scan_id.clone()) else {
            return Ok(());
        };
        ctx.client.delete_scan(&scan_id).await?;
        info!("Deleted scan {}", scan_id);
        let mut query = self.query;
        // deleting the last row of a page steps back a page
        if self.scans.len() == 1 && query.skip > 0 {
            query = query.previous_page();
        }
        *self = Self::load(ctx, query).await?;
        Ok(())
    }

    fn footer(&self) -> Line<'static> {
        let mut spans = vec![
            format!("Page {} ", self.query.page()).into(),
            " Open ".into(),
            "<Enter>".light_blue().bold(),
            " Delete ".into(),
            "<D>".red().bold(),
        ];
        if self.has_previous_page() {
            spans.extend([" Previous ".into(), "<Left>".light_blue().bold()]);
        }
        if self.has_next_page() {
            spans.extend([" Next ".into(), "<Right>".light_blue().bold()]);
        }
        spans.into()
    }
}

pub struct HistoryWidget;

impl StatefulWidget for HistoryWidget {
    type State = HistoryScreenData;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let header = ["Date", "Product", "Type", "Verdict", "Score"]
            .into_iter()
            .map(Cell::from)
            .collect::<Row>()
            .height(1)
            .bold();
        let selected_row_style = Style::default().add_modifier(Modifier::REVERSED);
        let rows = state
            .scans
            .iter()
            .map(|scan| {
                let date = scan
                    .created_at
                    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                Row::new([
                    Cell::from(date),
                    Cell::from(scan.title()),
                    Cell::from(scan.scan_type.to_string()),
                    Cell::from(scan.verdict.to_string()).fg(verdict_color(scan.verdict)),
                    Cell::from(scan.overall_score.to_string()),
                ])
            })
            .collect::<Vec<_>>();
        let title = if state.scans.is_empty() {
            "Scan history (no scans yet)"
        } else {
            "Scan history"
        };
        let table = Table::new(
            rows,
            [
                Constraint::Length(16),
                Constraint::Fill(1),
                Constraint::Length(11),
                Constraint::Length(8),
                Constraint::Length(5),
            ],
        )
        .block(
            Block::bordered()
                .title(Line::from(title).centered())
                .title_bottom(state.footer().centered()),
        )
        .row_highlight_style(selected_row_style)
        .header(header);
        StatefulWidget::render(table, area, buf, &mut state.table_state);
    }
}

impl OnTick for HistoryScreenData {}

#[async_trait::async_trait]
impl OnKeyEvent for HistoryScreenData {
    async fn on_key_event(
        &mut self,
        key: KeyEvent,
        ctx: &Context,
    ) -> color_eyre::Result<ScreenChange> {
        let change = match (key.kind, key.modifiers, key.code) {
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Esc) => {
                ScanScreenData::default().into()
            }
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Down | KeyCode::Tab) => {
                self.table_state.select_next();
                ScreenChange::None
            }
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Up) => {
                self.table_state.select_previous();
                ScreenChange::None
            }
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Right)
                if self.has_next_page() =>
            {
                let next = Self::load(ctx, self.query.next_page()).await?;
                self.advance(next)
            }
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Left)
                if self.has_previous_page() =>
            {
                Self::load(ctx, self.query.previous_page()).await?.into()
            }
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Enter) => {
                match self.selected().map(|scan| scan.scan_id.clone()) {
                    Some(scan_id) => {
                        ResultsScreenData::new(ctx.client.get_scan(&scan_id).await?).into()
                    }
                    None => ScreenChange::None,
                }
            }
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Char('d') | KeyCode::Delete) => {
                self.delete_selected(ctx).await?;
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
    use serde_json::json;

    fn scan(id: &str) -> ScanResult {
        serde_json::from_value(json!({
            "scan_id": id,
            "scan_type": "barcode",
            "ingredients_text": "Water",
            "verdict": "GREAT",
            "overall_score": 90,
            "moisture_score": 80,
            "buildup_risk": 10,
            "scalp_score": 85
        }))
        .unwrap()
    }

    #[test]
    fn paging_follows_page_size() {
        let query = HistoryQuery { limit: 2, skip: 0 };
        let full = HistoryScreenData::new(vec![scan("a"), scan("b")], query);
        assert!(full.has_next_page());
        assert!(!full.has_previous_page());

        let last = HistoryScreenData::new(vec![scan("c")], query.next_page());
        assert!(!last.has_next_page());
        assert!(last.has_previous_page());
    }

    #[test]
    fn empty_next_page_keeps_the_current_one() {
        let query = HistoryQuery { limit: 2, skip: 0 };
        let mut full = HistoryScreenData::new(vec![scan("a"), scan("b")], query);

        let change = full.advance(HistoryScreenData::new(Vec::new(), query.next_page()));

        assert!(matches!(change, ScreenChange::None));
        assert!(!full.has_next_page());
        assert_eq!(full.scans.len(), 2);
    }

    #[test]
    fn non_empty_next_page_is_shown() {
        let query = HistoryQuery { limit: 2, skip: 0 };
        let mut full = HistoryScreenData::new(vec![scan("a"), scan("b")], query);

        let change = full.advance(HistoryScreenData::new(vec![scan("c")], query.next_page()));

        assert!(matches!(change, ScreenChange::Switch(Screen::History(_))));
    }

    #[test]
    fn selection_starts_on_the_first_scan() {
        let data = HistoryScreenData::new(vec![scan("a"), scan("b")], HistoryQuery::default());
        assert_eq!(data.selected().map(|s| s.scan_id.as_str()), Some("a"));

        let empty = HistoryScreenData::new(Vec::new(), HistoryQuery::default());
        assert!(empty.selected().is_none());
    }
}
