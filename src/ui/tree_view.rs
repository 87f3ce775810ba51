//! Tree panel widget
//!
//! Renders the controller's flattened projection: exactly the panel height
//! in lines, the cursor kept vertically centered once it scrolls past the
//! first half-viewport, the cursor line's label segments (not its
//! indentation) reversed, and a reverse " Search" footer line while search
//! mode is active.

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::tree::TreeState;
use crate::ui::theme::Theme;

pub fn render(frame: &mut Frame, area: Rect, tree: &TreeState, theme: &Theme) {
    let lines = content_lines(tree, area.height as usize, area.width as usize, theme);
    frame.render_widget(Paragraph::new(lines), area);
}

/// Build exactly `height` display lines for the tree panel
pub fn content_lines<'a>(
    tree: &'a TreeState,
    height: usize,
    width: usize,
    theme: &Theme,
) -> Vec<Line<'a>> {
    let skip = tree.scroll_skip(height);
    let mut out = Vec::with_capacity(height);

    for i in 0..height {
        if tree.searching() && i + 1 == height {
            let text = format!(" Search{}", " ".repeat(width.saturating_sub(7)));
            out.push(Line::styled(text, theme.tree_search_footer));
            continue;
        }

        let idx = i + skip;
        let Some(flat) = tree.lines().get(idx) else {
            out.push(Line::from(""));
            continue;
        };
        let Some(node) = tree.node(flat.id) else {
            out.push(Line::from(""));
            continue;
        };

        let cursor_here = idx == tree.cursor_index() && tree.cursor() == Some(flat.id);
        let mut spans = vec![Span::raw("  ".repeat(flat.depth))];
        for (style, text) in node.label().segments() {
            let style = if cursor_here {
                style.patch(theme.tree_cursor)
            } else {
                *style
            };
            spans.push(Span::styled(text.clone(), style));
        }
        out.push(Line::from(spans));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{ChildSource, Label, NodeSpec};
    use crate::error::DbError;

    struct StaticSource(Vec<String>);

    impl ChildSource for StaticSource {
        fn fetch(&self, _indexing: bool) -> Result<Vec<NodeSpec>, DbError> {
            Ok(self
                .0
                .iter()
                .map(|n| NodeSpec::branch(Label::plain(n)))
                .collect())
        }
    }

    fn tree_with_children(n: usize) -> TreeState {
        let mut tree = TreeState::new();
        let names: Vec<String> = (0..n).map(|i| format!("child-{i}")).collect();
        let (root, _) = tree
            .add_root(NodeSpec::branch(Label::plain("root")).with_source(Box::new(StaticSource(names))))
            .unwrap();
        tree.open(root, false).unwrap();
        tree.refresh();
        tree
    }

    fn texts(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_exactly_height_lines() {
        let tree = tree_with_children(2);
        let theme = Theme::default();
        let lines = content_lines(&tree, 8, 20, &theme);
        assert_eq!(lines.len(), 8);
        let texts = texts(&lines);
        assert_eq!(texts[0], "root");
        assert_eq!(texts[1], "  child-0");
        assert_eq!(texts[3], ""); // past content: blank
    }

    #[test]
    fn test_scrolls_to_keep_cursor_centered() {
        let mut tree = tree_with_children(20);
        tree.move_cursor(10);
        let theme = Theme::default();
        let lines = content_lines(&tree, 6, 20, &theme);
        // skip = 10 - 3 = 7 → first visible line is child-6
        assert_eq!(texts(&lines)[0], "  child-6");
    }

    #[test]
    fn test_search_footer_replaces_last_line() {
        let mut tree = tree_with_children(3);
        let matches = tree.search("child");
        tree.begin_search(matches).unwrap();
        let theme = Theme::default();
        let lines = content_lines(&tree, 5, 20, &theme);
        assert_eq!(lines.len(), 5);
        assert!(texts(&lines)[4].starts_with(" Search"));
    }

    #[test]
    fn test_cursor_line_reversed_on_label_only() {
        let mut tree = tree_with_children(2);
        tree.move_cursor(1);
        let theme = Theme::default();
        let lines = content_lines(&tree, 4, 20, &theme);
        let cursor_line = &lines[1];
        // indent span unstyled, label span carries the reversed modifier
        assert_eq!(cursor_line.spans[0].style, Style::default());
        assert!(cursor_line.spans[1]
            .style
            .add_modifier
            .contains(Modifier::REVERSED));
    }
}
