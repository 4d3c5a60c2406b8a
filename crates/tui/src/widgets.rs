use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use salvo_core::{
    board::{CellState, Grid, COLUMNS, ROWS},
    game::CellCursor,
};

const MAX_FIELD_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary_fg: Color,
    pub accent: Color,
    pub muted: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub success: Color,
    pub warning: Color,
    pub danger: Color,
    pub ship: Color,
    pub hit: Color,
    pub miss: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            selection_fg: Color::White,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
            ship: Color::Green,
            hit: Color::Red,
            miss: Color::Blue,
        }
    }
}

/// Single-line editable text. The cursor counts characters, not bytes.
#[derive(Debug, Clone, Default)]
pub struct TextField {
    input: String,
    cursor: usize,
    masked: bool,
}

impl TextField {
    pub fn masked() -> Self {
        Self {
            masked: true,
            ..Self::default()
        }
    }

    pub fn value(&self) -> &str {
        &self.input
    }

    pub fn trimmed(&self) -> String {
        self.input.trim().to_string()
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    fn char_len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_offset(&self, index: usize) -> usize {
        self.input
            .char_indices()
            .nth(index)
            .map(|(offset, _)| offset)
            .unwrap_or(self.input.len())
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.char_len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    pub fn insert(&mut self, ch: char) {
        if ch.is_control() || self.char_len() >= MAX_FIELD_LEN {
            return;
        }
        let offset = self.byte_offset(self.cursor);
        self.input.insert(offset, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let offset = self.byte_offset(self.cursor);
        if offset < self.input.len() {
            self.input.remove(offset);
        }
    }

    pub fn delete(&mut self) {
        let offset = self.byte_offset(self.cursor);
        if offset < self.input.len() {
            self.input.remove(offset);
        }
    }

    /// Text as displayed, with the cursor drawn when focused.
    pub fn display(&self, focused: bool) -> String {
        let shown: String = if self.masked {
            "•".repeat(self.char_len())
        } else {
            self.input.clone()
        };
        if !focused {
            return shown;
        }
        let mut chars: Vec<char> = shown.chars().collect();
        chars.insert(self.cursor.min(chars.len()), '▏');
        chars.into_iter().collect()
    }
}

/// Glyph and colour for a classified cell.
fn cell_glyph(state: CellState, theme: &Theme) -> (&'static str, Style) {
    match state {
        CellState::Empty => ("·", Style::default().fg(theme.muted)),
        CellState::Ship => ("■", Style::default().fg(theme.ship)),
        CellState::Hit => (
            "✕",
            Style::default().fg(theme.hit).add_modifier(Modifier::BOLD),
        ),
        CellState::Miss => ("○", Style::default().fg(theme.miss)),
    }
}

/// Render a grid as text lines with row letters and column numbers.
pub fn grid_lines(grid: &Grid, theme: &Theme, cursor: Option<CellCursor>) -> Vec<Line<'static>> {
    let mut header = vec![Span::raw("   ")];
    for col in COLUMNS {
        header.push(Span::styled(
            format!("{col:>3}"),
            Style::default().fg(theme.accent),
        ));
    }

    let mut lines = vec![Line::from(header)];
    for (row_idx, row) in grid.rows().enumerate() {
        let mut spans = vec![Span::styled(
            format!("{:<3}", ROWS[row_idx]),
            Style::default().fg(theme.accent),
        )];
        for (col_idx, state) in row.iter().enumerate() {
            let (glyph, mut style) = cell_glyph(*state, theme);
            let selected = cursor
                .map(|cursor| cursor.row() == row_idx && cursor.col() == col_idx)
                .unwrap_or(false);
            if selected {
                style = style
                    .bg(theme.selection_bg)
                    .fg(theme.selection_fg)
                    .add_modifier(Modifier::BOLD);
            }
            spans.push(Span::styled(format!("{glyph:>3}"), style));
        }
        lines.push(Line::from(spans));
    }
    lines
}

pub fn legend_line(theme: &Theme) -> Line<'static> {
    let entry = |state: CellState, label: &'static str| {
        let (glyph, style) = cell_glyph(state, theme);
        vec![Span::styled(glyph, style), Span::raw(format!(" {label}   "))]
    };
    let mut spans = Vec::new();
    spans.extend(entry(CellState::Ship, "ship"));
    spans.extend(entry(CellState::Hit, "hit"));
    spans.extend(entry(CellState::Miss, "miss"));
    spans.extend(entry(CellState::Empty, "unknown"));
    Line::from(spans)
}

pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_field_edits_at_cursor() {
        let mut field = TextField::default();
        for ch in "game".chars() {
            field.insert(ch);
        }
        field.move_home();
        field.insert('a');
        field.move_end();
        field.backspace();
        assert_eq!(field.value(), "agam");
        field.move_cursor(-10);
        field.delete();
        assert_eq!(field.value(), "gam");
    }

    #[test]
    fn masked_field_hides_input() {
        let mut field = TextField::masked();
        field.insert('p');
        field.insert('w');
        assert_eq!(field.display(false), "••");
        assert_eq!(field.value(), "pw");
    }

    #[test]
    fn non_ascii_input_is_kept() {
        let mut field = TextField::masked();
        for ch in "pässwörd".chars() {
            field.insert(ch);
        }
        assert_eq!(field.value(), "pässwörd");
        assert_eq!(field.display(false), "••••••••");

        field.move_cursor(-2);
        field.backspace();
        field.insert('o');
        assert_eq!(field.value(), "pässword");
        field.move_home();
        field.move_cursor(1);
        field.delete();
        assert_eq!(field.value(), "pssword");
        field.move_end();
        field.insert('\u{1b}');
        assert_eq!(field.value(), "pssword");
    }

    #[test]
    fn grid_has_header_and_ten_rows() {
        let grid = salvo_core::board::classify(&[], &[], "me", salvo_core::BoardSide::Own);
        let lines = grid_lines(&grid, &Theme::default(), None);
        assert_eq!(lines.len(), 11);
    }
}
