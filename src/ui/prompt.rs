//! Modal input prompt
//!
//! A single-line input box used for tree search and `${param}` query
//! parameters. Rendered centered over the frame; all keys are intercepted
//! while it is open.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::ui::layout::centered;
use crate::ui::theme::Theme;

/// What a key press did to the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptAction {
    Consumed,
    Submit(String),
    Cancel,
}

/// Single-line modal input
pub struct Prompt {
    title: String,
    input: String,
    /// Cursor position in chars
    cursor: usize,
}

impl Prompt {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            input: String::new(),
            cursor: 0,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    fn byte_cursor(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor)
            .map_or(self.input.len(), |(i, _)| i)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PromptAction {
        match key.code {
            KeyCode::Char(c)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                let at = self.byte_cursor();
                self.input.insert(at, c);
                self.cursor += 1;
                PromptAction::Consumed
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_cursor();
                    self.input.remove(at);
                }
                PromptAction::Consumed
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                PromptAction::Consumed
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.input.chars().count());
                PromptAction::Consumed
            }
            KeyCode::Home => {
                self.cursor = 0;
                PromptAction::Consumed
            }
            KeyCode::End => {
                self.cursor = self.input.chars().count();
                PromptAction::Consumed
            }
            KeyCode::Enter => PromptAction::Submit(self.input.clone()),
            KeyCode::Esc => PromptAction::Cancel,
            _ => PromptAction::Consumed,
        }
    }

    pub fn render(&self, frame: &mut Frame, theme: &Theme) {
        let area = centered(frame.area(), 52, 3);
        frame.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", self.title))
            .title_style(theme.prompt_title)
            .border_style(theme.border_focused);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chars: Vec<char> = self.input.chars().collect();
        let before: String = chars.iter().take(self.cursor).collect();
        let at: String = chars
            .get(self.cursor)
            .map(|c| c.to_string())
            .unwrap_or_else(|| " ".to_string());
        let after: String = chars.iter().skip(self.cursor + 1).collect();
        let line = Line::from(vec![
            Span::styled(before, theme.prompt_input),
            Span::styled(at, theme.editor_cursor),
            Span::styled(after, theme.prompt_input),
        ]);
        frame.render_widget(Paragraph::new(line), inner);
    }
}
