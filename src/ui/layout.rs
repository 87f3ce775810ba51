//! Panel layout management
//!
//! Tree panel on the left (one third), query editor over results on the
//! right, a two-line bindings/status bar along the bottom.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Computed panel areas for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelAreas {
    pub tree: Rect,
    pub query: Rect,
    pub results: Rect,
    pub bar: Rect,
}

/// Split the terminal into the three panels plus the bottom bar
pub fn panel_areas(area: Rect) -> PanelAreas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(2)])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)])
        .split(rows[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(columns[1]);

    PanelAreas {
        tree: columns[0],
        query: right[0],
        results: right[1],
        bar: rows[1],
    }
}

/// Centered overlay rect for prompts and menus
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_areas_cover_frame() {
        let areas = panel_areas(Rect::new(0, 0, 120, 40));
        assert_eq!(areas.bar.height, 2);
        assert_eq!(areas.tree.x, 0);
        assert!(areas.tree.width >= 39 && areas.tree.width <= 41);
        assert_eq!(areas.query.y, 0);
        assert_eq!(areas.results.bottom(), 38);
    }

    #[test]
    fn test_centered_clamps_to_area() {
        let area = Rect::new(0, 0, 20, 10);
        let rect = centered(area, 100, 100);
        assert_eq!(rect, area);
        let small = centered(area, 10, 4);
        assert_eq!(small, Rect::new(5, 3, 10, 4));
    }
}
