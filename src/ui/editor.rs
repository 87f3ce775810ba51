//! Query editor widget
//!
//! Multi-line SQL editor. Cursor positions are (line, column) in
//! characters; conversion to byte offsets happens at the edit sites.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;

use crate::ui::theme::Theme;

/// Query editor component
pub struct QueryEditor {
    lines: Vec<String>,
    /// Cursor position (line, column), column counted in chars
    cursor: (usize, usize),
}

impl QueryEditor {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            cursor: (0, 0),
        }
    }

    pub fn with_content(content: &str) -> Self {
        let mut editor = Self::new();
        editor.set_content(content);
        editor
    }

    /// The buffer joined back into one query string
    pub fn content(&self) -> String {
        self.lines.join("\n")
    }

    pub fn set_content(&mut self, content: &str) {
        self.lines = content.split('\n').map(str::to_string).collect();
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.cursor = (0, 0);
    }

    pub fn clear(&mut self) {
        self.set_content("");
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines.get(row).map_or(0, |l| l.chars().count())
    }

    fn byte_at(&self, row: usize, col: usize) -> usize {
        let line = &self.lines[row];
        line.char_indices()
            .nth(col)
            .map_or(line.len(), |(i, _)| i)
    }

    pub fn insert_char(&mut self, c: char) {
        let (row, col) = self.cursor;
        let at = self.byte_at(row, col);
        self.lines[row].insert(at, c);
        self.cursor.1 += 1;
    }

    pub fn insert_newline(&mut self) {
        let (row, col) = self.cursor;
        let at = self.byte_at(row, col);
        let rest = self.lines[row].split_off(at);
        self.lines.insert(row + 1, rest);
        self.cursor = (row + 1, 0);
    }

    /// Backspace: remove the char before the cursor, joining lines at col 0
    pub fn delete_back(&mut self) {
        let (row, col) = self.cursor;
        if col > 0 {
            let at = self.byte_at(row, col - 1);
            self.lines[row].remove(at);
            self.cursor.1 -= 1;
        } else if row > 0 {
            let removed = self.lines.remove(row);
            let prev_len = self.line_len(row - 1);
            self.lines[row - 1].push_str(&removed);
            self.cursor = (row - 1, prev_len);
        }
    }

    /// Delete: remove the char under the cursor
    pub fn delete_forward(&mut self) {
        let (row, col) = self.cursor;
        if col < self.line_len(row) {
            let at = self.byte_at(row, col);
            self.lines[row].remove(at);
        } else if row + 1 < self.lines.len() {
            let next = self.lines.remove(row + 1);
            self.lines[row].push_str(&next);
        }
    }

    pub fn move_up(&mut self) {
        if self.cursor.0 > 0 {
            self.cursor.0 -= 1;
            self.cursor.1 = self.cursor.1.min(self.line_len(self.cursor.0));
        }
    }

    pub fn move_down(&mut self) {
        if self.cursor.0 + 1 < self.lines.len() {
            self.cursor.0 += 1;
            self.cursor.1 = self.cursor.1.min(self.line_len(self.cursor.0));
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor.1 > 0 {
            self.cursor.1 -= 1;
        } else if self.cursor.0 > 0 {
            self.cursor.0 -= 1;
            self.cursor.1 = self.line_len(self.cursor.0);
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor.1 < self.line_len(self.cursor.0) {
            self.cursor.1 += 1;
        } else if self.cursor.0 + 1 < self.lines.len() {
            self.cursor.0 += 1;
            self.cursor.1 = 0;
        }
    }

    /// Free-form text input. Returns whether the key was consumed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.insert_char(c);
                true
            }
            KeyCode::Enter => {
                self.insert_newline();
                true
            }
            KeyCode::Backspace => {
                self.delete_back();
                true
            }
            KeyCode::Delete => {
                self.delete_forward();
                true
            }
            KeyCode::Up => {
                self.move_up();
                true
            }
            KeyCode::Down => {
                self.move_down();
                true
            }
            KeyCode::Left => {
                self.move_left();
                true
            }
            KeyCode::Right => {
                self.move_right();
                true
            }
            KeyCode::Home => {
                self.cursor.1 = 0;
                true
            }
            KeyCode::End => {
                self.cursor.1 = self.line_len(self.cursor.0);
                true
            }
            _ => false,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool, theme: &Theme) {
        if area.height == 0 {
            return;
        }
        let height = area.height as usize;
        let scroll = self.cursor.0.saturating_sub(height.saturating_sub(1));

        let mut out = Vec::with_capacity(height);
        for (row, line) in self.lines.iter().enumerate().skip(scroll).take(height) {
            if focused && row == self.cursor.0 {
                out.push(cursor_line(line, self.cursor.1, theme));
            } else {
                out.push(Line::styled(line.clone(), theme.editor_text));
            }
        }
        frame.render_widget(ratatui::widgets::Paragraph::new(out), area);
    }
}

/// Split the cursor line into before / cursor-cell / after spans
fn cursor_line<'a>(line: &'a str, col: usize, theme: &Theme) -> Line<'a> {
    let chars: Vec<char> = line.chars().collect();
    let before: String = chars.iter().take(col).collect();
    let at: String = chars
        .get(col)
        .map(|c| c.to_string())
        .unwrap_or_else(|| " ".to_string());
    let after: String = chars.iter().skip(col + 1).collect();
    Line::from(vec![
        Span::styled(before, theme.editor_text),
        Span::styled(at, theme.editor_cursor),
        Span::styled(after, theme.editor_text),
    ])
}

impl Default for QueryEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(editor: &mut QueryEditor, text: &str) {
        for c in text.chars() {
            editor.insert_char(c);
        }
    }

    #[test]
    fn test_editor_starts_empty() {
        let editor = QueryEditor::new();
        assert_eq!(editor.content(), "");
        assert_eq!(editor.cursor, (0, 0));
    }

    #[test]
    fn test_insert_and_newline() {
        let mut editor = QueryEditor::new();
        type_str(&mut editor, "SELECT 1");
        editor.insert_newline();
        type_str(&mut editor, "FROM t");
        assert_eq!(editor.content(), "SELECT 1\nFROM t");
        assert_eq!(editor.cursor, (1, 6));
    }

    #[test]
    fn test_backspace_joins_lines() {
        let mut editor = QueryEditor::with_content("ab\ncd");
        editor.cursor = (1, 0);
        editor.delete_back();
        assert_eq!(editor.content(), "abcd");
        assert_eq!(editor.cursor, (0, 2));
    }

    #[test]
    fn test_delete_forward_joins_lines() {
        let mut editor = QueryEditor::with_content("ab\ncd");
        editor.cursor = (0, 2);
        editor.delete_forward();
        assert_eq!(editor.content(), "abcd");
    }

    #[test]
    fn test_vertical_movement_clamps_column() {
        let mut editor = QueryEditor::with_content("long line\nx");
        editor.cursor = (0, 8);
        editor.move_down();
        assert_eq!(editor.cursor, (1, 1));
        editor.move_up();
        assert_eq!(editor.cursor, (0, 1));
    }

    #[test]
    fn test_horizontal_movement_wraps_lines() {
        let mut editor = QueryEditor::with_content("ab\ncd");
        editor.cursor = (0, 2);
        editor.move_right();
        assert_eq!(editor.cursor, (1, 0));
        editor.move_left();
        assert_eq!(editor.cursor, (0, 2));
    }

    #[test]
    fn test_multibyte_insertion() {
        let mut editor = QueryEditor::new();
        type_str(&mut editor, "héllo");
        editor.move_left();
        editor.insert_char('_');
        assert_eq!(editor.content(), "héll_o");
    }

    #[test]
    fn test_set_content_resets_cursor() {
        let mut editor = QueryEditor::with_content("SELECT * FROM users");
        editor.cursor = (0, 5);
        editor.set_content("x");
        assert_eq!(editor.cursor, (0, 0));
        assert_eq!(editor.content(), "x");
    }
}
