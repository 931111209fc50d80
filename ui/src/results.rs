use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::{Color, Line, Span, StatefulWidget, Style, Stylize, Widget};
use ratatui::widgets::{Block, Gauge, List, Paragraph, Wrap};
use types::scan::{ScanResult, Verdict};

use crate::data::{Context, OnKeyEvent, OnTick, Screen, ScreenChange};
use crate::extension::Splittable;
use crate::scan::ScanScreenData;

#[derive(Debug)]
pub struct ResultsScreenData {
    pub scan: ScanResult,
}

impl ResultsScreenData {
    pub fn new(scan: ScanResult) -> Self {
        Self { scan }
    }
}

impl From<ResultsScreenData> for ScreenChange {
    fn from(data: ResultsScreenData) -> Self {
        ScreenChange::Switch(Screen::Results(data))
    }
}

pub fn verdict_color(verdict: Verdict) -> Color {
    match verdict {
        Verdict::Great => Color::Green,
        Verdict::Caution => Color::Yellow,
        Verdict::Avoid => Color::Red,
    }
}

fn score_gauge(label: &str, score: i32, color: Color) -> Gauge {
    Gauge::default()
        .block(Block::bordered().title(label))
        .gauge_style(Style::default().fg(color))
        .percent(score.clamp(0, 100) as u16)
        .label(format!("{score}/100"))
}

fn flag(label: &str, set: bool) -> Span {
    if set {
        Span::from(format!("[x] {label}")).bold()
    } else {
        Span::from(format!("[ ] {label}")).dim()
    }
}

pub struct ResultsScreenWidget;

impl StatefulWidget for ResultsScreenWidget {
    type State = ResultsScreenData;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let scan = &state.scan;
        let color = verdict_color(scan.verdict);
        let block = Block::bordered()
            .title(Line::from(scan.title()).centered().bold())
            .title_bottom(
                Line::from(vec![
                    "Scan another ".into(),
                    "<Enter>".light_blue().bold(),
                    " History ".into(),
                    "<F2>".light_blue().bold(),
                ])
                .centered(),
            );
        let inner = block.inner(area);
        block.render(area, buf);

        let [verdict, scores, flags, explanation, ingredients] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(5),
        ])
        .areas(inner);

        Paragraph::new(Line::from(vec![
            Span::from(scan.verdict.to_string()).fg(color).bold(),
            format!(
                "  {} of {} ingredients recognized",
                scan.matched_ingredients_count, scan.total_ingredients_count
            )
            .into(),
        ]))
        .centered()
        .render(verdict, buf);

        let [overall, moisture, scalp, buildup] =
            Layout::split_equal(scores, Direction::Horizontal);
        score_gauge("Overall", scan.overall_score, color).render(overall, buf);
        score_gauge("Moisture", scan.moisture_score, Color::Cyan).render(moisture, buf);
        score_gauge("Scalp", scan.scalp_score, Color::Cyan).render(scalp, buf);
        score_gauge("Buildup risk", scan.buildup_risk, Color::Magenta).render(buildup, buf);

        Paragraph::new(Line::from(vec![
            flag("Water based", scan.water_based),
            "   ".into(),
            flag("Heavy oils", scan.heavy_oils),
            "   ".into(),
            flag("Protein heavy", scan.protein_heavy),
        ]))
        .centered()
        .render(flags, buf);

        Widget::render(
            List::new(scan.explanation.iter().map(|line| format!("- {line}")))
                .block(Block::bordered().title("Why")),
            explanation,
            buf,
        );

        Paragraph::new(scan.ingredients_text.as_str())
            .wrap(Wrap { trim: true })
            .block(Block::bordered().title("Ingredients"))
            .render(ingredients, buf);
    }
}

impl OnTick for ResultsScreenData {}

#[async_trait::async_trait]
impl OnKeyEvent for ResultsScreenData {
    async fn on_key_event(
        &mut self,
        key: KeyEvent,
        _ctx: &Context,
    ) -> color_eyre::Result<ScreenChange> {
        let change = match (key.kind, key.modifiers, key.code) {
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Esc | KeyCode::Enter) => {
                ScanScreenData::default().into()
            }
            _ => ScreenChange::None,
        };
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Verdict::Great, Color::Green)]
    #[case(Verdict::Caution, Color::Yellow)]
    #[case(Verdict::Avoid, Color::Red)]
    fn verdicts_have_distinct_colors(#[case] verdict: Verdict, #[case] color: Color) {
        assert_eq!(verdict_color(verdict), color);
    }
}
