//! Query results viewer widget
//!
//! Draws the grid model's memoized window as a bordered table: evenly
//! weighted columns, box-drawing separators between every row, the offset
//! cell reversed. The window itself (which slice of the matrix is visible)
//! is the model's business; this module only lays it out.

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use unicode_truncate::UnicodeTruncateStr;

use crate::grid::{GridWindow, WindowCell};
use crate::ui::theme::{BorderGlyphs, Theme};

pub fn render(frame: &mut Frame, area: Rect, window: &GridWindow, theme: &Theme) {
    let lines = grid_lines(window, area.width as usize, theme);
    let shown = lines.into_iter().take(area.height as usize).collect::<Vec<_>>();
    frame.render_widget(Paragraph::new(shown), area);
}

/// Lay the window out as styled lines: borders between all rows, cells
/// padded to an even per-column width.
pub fn grid_lines(window: &GridWindow, width: usize, theme: &Theme) -> Vec<Line<'static>> {
    let GridWindow::Table { rows, .. } = window else {
        return vec![Line::styled("No data", theme.grid_empty)];
    };
    let Some(cols) = rows.first().map(|r| r.len()).filter(|&c| c > 0) else {
        return vec![Line::styled("No data", theme.grid_empty)];
    };

    let cell_w = cell_width(width, cols);
    let glyphs = theme.borders;
    let mut out = Vec::with_capacity(rows.len() * 2 + 1);

    out.push(border_line(BorderRow::Top, cols, cell_w, glyphs, theme));
    for (i, row) in rows.iter().enumerate() {
        out.push(content_line(row, cell_w, glyphs, theme));
        let kind = if i + 1 == rows.len() {
            BorderRow::Bottom
        } else {
            BorderRow::Middle
        };
        out.push(border_line(kind, cols, cell_w, glyphs, theme));
    }
    out
}

/// Evenly weighted column width for `cols` columns and their separators
fn cell_width(total: usize, cols: usize) -> usize {
    total.saturating_sub(cols + 1).checked_div(cols).unwrap_or(0).max(1)
}

#[derive(Clone, Copy, PartialEq)]
enum BorderRow {
    Top,
    Middle,
    Bottom,
}

fn border_line(
    kind: BorderRow,
    cols: usize,
    cell_w: usize,
    glyphs: BorderGlyphs,
    theme: &Theme,
) -> Line<'static> {
    let (left, mid, right) = match kind {
        BorderRow::Top => (glyphs.top_left, glyphs.top_t, glyphs.top_right),
        BorderRow::Middle => (glyphs.left_t, glyphs.intersect, glyphs.right_t),
        BorderRow::Bottom => (glyphs.bottom_left, glyphs.bottom_t, glyphs.bottom_right),
    };
    let mut text = String::new();
    text.push(left);
    for c in 0..cols {
        for _ in 0..cell_w {
            text.push(glyphs.horizontal);
        }
        text.push(if c + 1 == cols { right } else { mid });
    }
    Line::styled(text, theme.grid_border)
}

fn content_line(
    row: &[WindowCell],
    cell_w: usize,
    glyphs: BorderGlyphs,
    theme: &Theme,
) -> Line<'static> {
    let border = Span::styled(glyphs.vertical.to_string(), theme.grid_border);
    let mut spans = vec![border.clone()];
    for cell in row {
        let style = if cell.selected {
            theme.grid_selected
        } else if cell.header {
            theme.grid_header
        } else {
            theme.grid_cell
        };
        spans.push(Span::styled(fit_cell(&cell.text, cell_w), style));
        spans.push(border.clone());
    }
    Line::from(spans)
}

/// Truncate to the display width and pad with spaces (CJK-safe)
fn fit_cell(text: &str, width: usize) -> String {
    let (cut, used) = text.unicode_truncate(width);
    let mut out = cut.to_string();
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}
