use ratatui::layout::{Constraint, Direction, Flex, Layout, Position, Rect};
use tui_input::Input;

pub trait Splittable {
    fn split_equal<const N: usize>(area: Rect, direction: Direction) -> [Rect; N];
}

impl Splittable for Layout {
    fn split_equal<const N: usize>(area: Rect, direction: Direction) -> [Rect; N] {
        let n = N as u32;
        match direction {
            Direction::Horizontal => {
                Self::horizontal(Constraint::from_ratios([(1, n); N])).areas(area)
            }
            Direction::Vertical => Self::vertical(Constraint::from_ratios([(1, n); N])).areas(area),
        }
    }
}

/// Cursor inside a bordered single-line input.
pub fn input_cursor(input: &Input, area: Rect) -> Position {
    (area.x + input.visual_cursor() as u16 + 1, area.y + 1).into()
}

/// A horizontally centered column at most `width` wide.
pub fn centered_column(area: Rect, width: u16) -> Rect {
    let [column] = Layout::horizontal([Constraint::Max(width)])
        .flex(Flex::Center)
        .areas(area);
    column
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_into_equal_parts() {
        let [left, right] = Layout::split_equal(Rect::new(0, 0, 40, 3), Direction::Horizontal);
        assert_eq!(left.width, 20);
        assert_eq!(right.x, 20);
    }

    #[test]
    fn cursor_sits_after_the_text_inside_the_border() {
        let input = Input::new("abc".to_string());
        let cursor = input_cursor(&input, Rect::new(10, 5, 30, 3));
        assert_eq!(cursor, Position::new(14, 6));
    }
}
