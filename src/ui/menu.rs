//! Modal action menu
//!
//! Vertical pick-list used for a node's actions. Arrow keys move the
//! selection, Enter picks, Esc dismisses.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::ui::layout::centered;
use crate::ui::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Consumed,
    Pick(usize),
    Cancel,
}

pub struct Menu {
    title: String,
    items: Vec<String>,
    selected: usize,
}

impl Menu {
    pub fn new(title: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            title: title.into(),
            items,
            selected: 0,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> MenuAction {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                MenuAction::Consumed
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.items.len() {
                    self.selected += 1;
                }
                MenuAction::Consumed
            }
            KeyCode::Enter => {
                if self.items.is_empty() {
                    MenuAction::Cancel
                } else {
                    MenuAction::Pick(self.selected)
                }
            }
            KeyCode::Esc => MenuAction::Cancel,
            _ => MenuAction::Consumed,
        }
    }

    pub fn render(&self, frame: &mut Frame, theme: &Theme) {
        let width = self
            .items
            .iter()
            .map(|i| i.width())
            .max()
            .unwrap_or(0)
            .max(self.title.width() + 2) as u16
            + 6;
        let height = self.items.len() as u16 + 2;
        let area = centered(frame.area(), width, height);
        frame.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", self.title))
            .title_style(theme.prompt_title)
            .border_style(theme.border_focused);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines: Vec<Line> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let style = if i == self.selected {
                    theme.menu_selected
                } else {
                    theme.menu_item
                };
                Line::styled(format!(" {} ", item), style)
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn menu() -> Menu {
        Menu::new(
            "Actions",
            vec!["Count rows".to_string(), "Table size".to_string()],
        )
    }

    #[test]
    fn test_navigation_clamps() {
        let mut m = menu();
        m.handle_key(key(KeyCode::Up));
        assert_eq!(m.handle_key(key(KeyCode::Enter)), MenuAction::Pick(0));
        m.handle_key(key(KeyCode::Down));
        m.handle_key(key(KeyCode::Down));
        m.handle_key(key(KeyCode::Down));
        assert_eq!(m.handle_key(key(KeyCode::Enter)), MenuAction::Pick(1));
    }

    #[test]
    fn test_escape_cancels() {
        let mut m = menu();
        assert_eq!(m.handle_key(key(KeyCode::Esc)), MenuAction::Cancel);
    }

    #[test]
    fn test_empty_menu_enter_cancels() {
        let mut m = Menu::new("Actions", Vec::new());
        assert_eq!(m.handle_key(key(KeyCode::Enter)), MenuAction::Cancel);
    }
}
