//! UI theme and styling
//!
//! Defines colors, styles and border glyphs for all UI components, plus the
//! color-name lookup used by driver definitions.

use ratatui::style::{Color, Modifier, Style};

/// Application theme
#[derive(Debug, Clone)]
pub struct Theme {
    // Panel borders
    pub border_focused: Style,
    pub border_unfocused: Style,

    // Tree panel
    pub tree_cursor: Style,
    pub tree_search_footer: Style,

    // Query panel
    pub tab_active: Style,
    pub tab_inactive: Style,
    pub editor_text: Style,
    pub editor_cursor: Style,
    pub conn_line: Style,

    // Results grid
    pub grid_border: Style,
    pub grid_header: Style,
    pub grid_cell: Style,
    pub grid_selected: Style,
    pub grid_empty: Style,
    pub note_text: Style,
    pub note_error: Style,

    // Prompt / menu overlays
    pub prompt_title: Style,
    pub prompt_input: Style,
    pub menu_item: Style,
    pub menu_selected: Style,

    // Status messages
    pub status_success: Style,
    pub status_error: Style,
    pub status_info: Style,
    pub status_warning: Style,
    pub binding_key: Style,
    pub binding_name: Style,

    /// Box-drawing characters for the results grid
    pub borders: BorderGlyphs,
}

/// Box drawing characters (thin variant)
#[derive(Debug, Clone, Copy)]
pub struct BorderGlyphs {
    pub horizontal: char,
    pub vertical: char,
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub left_t: char,
    pub right_t: char,
    pub top_t: char,
    pub bottom_t: char,
    pub intersect: char,
}

impl BorderGlyphs {
    pub const THIN: Self = Self {
        horizontal: '─',
        vertical: '│',
        top_left: '┌',
        top_right: '┐',
        bottom_left: '└',
        bottom_right: '┘',
        left_t: '├',
        right_t: '┤',
        top_t: '┬',
        bottom_t: '┴',
        intersect: '┼',
    };

    pub const ASCII: Self = Self {
        horizontal: '-',
        vertical: '|',
        top_left: '+',
        top_right: '+',
        bottom_left: '+',
        bottom_right: '+',
        left_t: '+',
        right_t: '+',
        top_t: '+',
        bottom_t: '+',
        intersect: '+',
    };
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            border_focused: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            border_unfocused: Style::default().fg(Color::DarkGray),

            tree_cursor: Style::default().add_modifier(Modifier::REVERSED),
            tree_search_footer: Style::default().add_modifier(Modifier::REVERSED),

            tab_active: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::DarkGray),
            editor_text: Style::default().fg(Color::White),
            editor_cursor: Style::default().bg(Color::White).fg(Color::Black),
            conn_line: Style::default().fg(Color::Green),

            grid_border: Style::default().fg(Color::DarkGray),
            grid_header: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            grid_cell: Style::default().fg(Color::White),
            grid_selected: Style::default().add_modifier(Modifier::REVERSED),
            grid_empty: Style::default().fg(Color::DarkGray),
            note_text: Style::default().fg(Color::Gray),
            note_error: Style::default().fg(Color::Red),

            prompt_title: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            prompt_input: Style::default().fg(Color::White),
            menu_item: Style::default().fg(Color::White),
            menu_selected: Style::default().add_modifier(Modifier::REVERSED),

            status_success: Style::default().fg(Color::Green),
            status_error: Style::default().fg(Color::Red),
            status_info: Style::default().fg(Color::Blue),
            status_warning: Style::default().fg(Color::Yellow),
            binding_key: Style::default().add_modifier(Modifier::REVERSED),
            binding_name: Style::default().fg(Color::Gray),

            borders: BorderGlyphs::THIN,
        }
    }
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get border style based on focus
    pub fn border_style(&self, focused: bool) -> Style {
        if focused {
            self.border_focused
        } else {
            self.border_unfocused
        }
    }
}

/// Style for a driver-defined color name. Unknown or missing names fall
/// back to the default foreground.
pub fn color_style(name: Option<&str>) -> Style {
    match name {
        Some(name) => Style::default().fg(parse_color(name)),
        None => Style::default(),
    }
}

/// Style for leaf "button" entries like `[Data]`
pub fn button_style() -> Style {
    Style::default().fg(Color::Yellow)
}

fn parse_color(name: &str) -> Color {
    match name.to_ascii_lowercase().as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "gray" | "grey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "lightred" => Color::LightRed,
        "lightgreen" => Color::LightGreen,
        "lightyellow" => Color::LightYellow,
        "lightblue" => Color::LightBlue,
        "lightmagenta" => Color::LightMagenta,
        "lightcyan" => Color::LightCyan,
        "white" => Color::White,
        _ => Color::Reset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color_known_and_unknown() {
        assert_eq!(parse_color("cyan"), Color::Cyan);
        assert_eq!(parse_color("DarkGray"), Color::DarkGray);
        assert_eq!(parse_color("mauve"), Color::Reset);
    }

    #[test]
    fn test_color_style_none_is_default() {
        assert_eq!(color_style(None), Style::default());
        assert_eq!(color_style(Some("green")), Style::default().fg(Color::Green));
    }
}
