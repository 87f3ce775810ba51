//! Bottom bar: active key bindings and status messages

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::{App, StatusLevel};
use crate::ui::theme::Theme;

pub fn render(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    if area.height == 0 {
        return;
    }

    // line 1: bindings for the focused panel
    let mut spans = Vec::new();
    for (key, name) in app.keymap.hints(app.focus) {
        spans.push(Span::styled(format!("[{}]", key), theme.binding_key));
        spans.push(Span::styled(format!(" {} ", name), theme.binding_name));
        spans.push(Span::raw(" "));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)),
        Rect::new(area.x, area.y, area.width, 1),
    );

    if area.height < 2 {
        return;
    }

    // line 2: status message, else the active tab's connection
    let line = if let Some(status) = &app.status {
        let style = match status.level {
            StatusLevel::Info => theme.status_info,
            StatusLevel::Success => theme.status_success,
            StatusLevel::Warning => theme.status_warning,
            StatusLevel::Error => theme.status_error,
        };
        Line::styled(status.message.clone(), style)
    } else if let Some(tab) = app.active_tab() {
        Line::styled(format!("[{}]", tab.conn), theme.conn_line)
    } else {
        Line::styled("[no connection]", theme.binding_name)
    };
    frame.render_widget(
        Paragraph::new(line),
        Rect::new(area.x, area.y + 1, area.width, 1),
    );
}
