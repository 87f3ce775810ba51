//! Top-level render function
//!
//! Orchestrates rendering of all panels using the layout module: tree on
//! the left, tabbed query editor and results grid on the right, bindings
//! bar at the bottom, modal overlays on top.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::{App, PanelFocus};
use crate::ui::layout::panel_areas;
use crate::ui::{results, statusbar, tree_view};

/// Render the entire application
pub fn render(frame: &mut Frame, app: &mut App) {
    let size = frame.area();
    app.update_result_viewport(size.width, size.height);
    app.before_render();

    let theme = app.theme.clone();
    let areas = panel_areas(size);

    // ── Tree panel ───────────────────────────────────────────
    let tree_block = Block::default()
        .borders(Borders::ALL)
        .title(" TreeView [F1] ")
        .border_style(theme.border_style(app.focus == PanelFocus::Tree));
    let tree_inner = tree_block.inner(areas.tree);
    frame.render_widget(tree_block, areas.tree);
    tree_view::render(frame, tree_inner, &app.tree, &theme);

    // ── Query panel ──────────────────────────────────────────
    let query_block = Block::default()
        .borders(Borders::ALL)
        .title(" Query [F2] ")
        .border_style(theme.border_style(app.focus == PanelFocus::Query));
    let query_inner = query_block.inner(areas.query);
    frame.render_widget(query_block, areas.query);
    render_query_panel(frame, query_inner, app, &theme);

    // ── Results panel ────────────────────────────────────────
    let results_block = Block::default()
        .borders(Borders::ALL)
        .title(" Result Panel [F3] ")
        .border_style(theme.border_style(app.focus == PanelFocus::Results));
    let results_inner = results_block.inner(areas.results);
    frame.render_widget(results_block, areas.results);
    render_results_panel(frame, results_inner, app, &theme);

    // ── Bottom bar and overlays ──────────────────────────────
    statusbar::render(frame, areas.bar, app, &theme);
    app.render_overlay(frame, &theme);
}

fn render_query_panel(frame: &mut Frame, area: Rect, app: &App, theme: &crate::ui::theme::Theme) {
    if area.height == 0 {
        return;
    }
    if app.tabs.is_empty() {
        frame.render_widget(
            Paragraph::new("Connect first").style(theme.note_error),
            area,
        );
        return;
    }

    // tab strip
    let mut spans = Vec::new();
    for (i, tab) in app.tabs.iter().enumerate() {
        let style = if i == app.active_tab {
            theme.tab_active
        } else {
            theme.tab_inactive
        };
        spans.push(Span::styled(tab.name.clone(), style));
        spans.push(Span::styled(" | ", theme.tab_inactive));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)),
        Rect::new(area.x, area.y, area.width, 1),
    );

    if area.height < 3 {
        return;
    }
    let Some(tab) = app.active_tab() else {
        return;
    };

    // connection line
    frame.render_widget(
        Paragraph::new(format!("{}", tab.conn)).style(theme.conn_line),
        Rect::new(area.x, area.y + 1, area.width, 1),
    );

    // editor body
    let editor_area = Rect::new(
        area.x,
        area.y + 2,
        area.width,
        area.height - 2,
    );
    tab.editor
        .render(frame, editor_area, app.focus == PanelFocus::Query, theme);
}

fn render_results_panel(
    frame: &mut Frame,
    area: Rect,
    app: &mut App,
    theme: &crate::ui::theme::Theme,
) {
    if area.height == 0 {
        return;
    }
    let note_style = if app.note_error {
        theme.note_error
    } else {
        theme.note_text
    };
    frame.render_widget(
        Paragraph::new(app.note.clone()).style(note_style),
        Rect::new(area.x, area.y, area.width, 1),
    );
    if area.height < 2 {
        return;
    }
    let grid_area = Rect::new(area.x, area.y + 1, area.width, area.height - 1);
    let window = app.grid.window().clone();
    results::render(frame, grid_area, &window, theme);
}
