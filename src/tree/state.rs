//! Tree controller: flattened projection, cursor, diff-refresh, search
//!
//! `TreeState` owns a forest of lazily loaded nodes and the flattened,
//! currently-visible projection used for rendering and cursor math. It is
//! deliberately side-effect free: mutating operations return [`TreeEvent`]
//! values describing what the application should do (select, run a
//! command), never invoking callbacks themselves.

use crate::error::DbError;
use crate::tree::node::{Forest, Node, NodeId, NodeKind, NodeSpec};

/// One visible line of the flattened projection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatLine {
    pub id: NodeId,
    pub depth: usize,
}

/// Events emitted by tree operations for the application dispatcher
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent {
    /// The cursor settled on a node
    Selected(NodeId),
    /// A leaf was activated; run its command
    Invoke(crate::tree::node::NodeCommand),
}

/// The tree controller
pub struct TreeState {
    forest: Forest,
    roots: Vec<NodeId>,
    cursor: Option<NodeId>,
    cursor_index: usize,
    lines: Vec<FlatLine>,
    dirty: bool,
    searching: bool,
    matches: Vec<NodeId>,
}

impl TreeState {
    pub fn new() -> Self {
        let mut tree = Self {
            forest: Forest::new(),
            roots: Vec::new(),
            cursor: None,
            cursor_index: 0,
            lines: Vec::new(),
            dirty: true,
            searching: false,
            matches: Vec::new(),
        };
        tree.refresh();
        tree
    }

    // ── Accessors ────────────────────────────────────────────

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.forest.get(id)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn lines(&self) -> &[FlatLine] {
        &self.lines
    }

    pub fn cursor(&self) -> Option<NodeId> {
        self.cursor
    }

    pub fn cursor_index(&self) -> usize {
        self.cursor_index
    }

    pub fn cursor_is_root(&self) -> bool {
        self.cursor
            .is_some_and(|c| self.forest.get(c).is_some_and(|n| n.parent().is_none()))
    }

    pub fn searching(&self) -> bool {
        self.searching
    }

    pub fn matches(&self) -> &[NodeId] {
        &self.matches
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Subtree node count (diagnostics)
    pub fn size(&self, id: NodeId) -> usize {
        self.forest.size(id)
    }

    // ── Structure ────────────────────────────────────────────

    /// Add a new forest root (to the front), move the cursor onto it and
    /// rebuild the projection.
    pub fn add_root(&mut self, spec: NodeSpec) -> Result<(NodeId, Vec<TreeEvent>), DbError> {
        let auto_open = spec.auto_open;
        let id = self.forest.insert(spec, None);
        self.roots.insert(0, id);
        self.cursor = Some(id);
        if auto_open {
            self.open(id, false)?;
        }
        let events = self.refresh();
        Ok((id, events))
    }

    /// Rebuild the flattened projection if something marked it dirty
    pub fn ensure_fresh(&mut self) -> Vec<TreeEvent> {
        if self.dirty { self.refresh() } else { Vec::new() }
    }

    /// Rebuild the flattened projection: depth-first over roots, descending
    /// only into open branches. Re-resolves the cursor: if the remembered
    /// node is still visible its new index wins (and a `Selected` event
    /// fires, exactly once); otherwise the previous numeric index is kept
    /// when still in range, else the cursor falls back to the first line.
    pub fn refresh(&mut self) -> Vec<TreeEvent> {
        self.dirty = false;
        let old_index = self.cursor_index;

        let mut lines = Vec::new();
        let mut found = None;
        let mut stack: Vec<(NodeId, usize)> =
            self.roots.iter().rev().map(|&id| (id, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.forest.get(id) else {
                continue;
            };
            if self.cursor == Some(id) && found.is_none() {
                found = Some(lines.len());
            }
            lines.push(FlatLine { id, depth });
            if node.is_open() {
                for &child in node.children().iter().rev() {
                    stack.push((child, depth + 1));
                }
            }
        }
        self.lines = lines;

        let mut events = Vec::new();
        match found {
            Some(index) => {
                self.cursor_index = index;
                if let Some(id) = self.cursor {
                    events.push(TreeEvent::Selected(id));
                }
            }
            None if old_index < self.lines.len() => {
                self.cursor_index = old_index;
                self.cursor = Some(self.lines[old_index].id);
            }
            None => {
                self.cursor_index = 0;
                self.cursor = self.lines.first().map(|l| l.id);
            }
        }
        events
    }

    // ── Node operations ──────────────────────────────────────

    /// Open a branch, materializing children through its source when they
    /// have not been loaded yet.
    ///
    /// With `indexing` set the node's visible open state is left untouched
    /// (bulk loading only). Opening a forest root triggers a full indexing
    /// walk of its subtree. A failed source call leaves the node closed
    /// with its previous children.
    pub fn open(&mut self, id: NodeId, indexing: bool) -> Result<(), DbError> {
        let Some(node) = self.forest.get(id) else {
            return Ok(());
        };
        if node.kind() == NodeKind::Leaf || node.is_open() || node.loading {
            return Ok(());
        }

        if node.children().is_empty() {
            let specs = self.fetch_children(id, indexing)?;
            self.adopt_children(id, specs)?;
        }

        if !indexing {
            if let Some(node) = self.forest.get_mut(id) {
                node.is_open = true;
            }
            self.dirty = true;
            if self.forest.get(id).is_some_and(|n| n.parent().is_none()) {
                self.index_all(id)?;
            }
        }
        Ok(())
    }

    /// Close a branch. Children are retained so re-opening is cheap and
    /// nested open state survives the collapse.
    pub fn close(&mut self, id: NodeId) {
        if let Some(node) = self.forest.get_mut(id)
            && node.kind == NodeKind::Branch
            && node.is_open
        {
            node.is_open = false;
            self.dirty = true;
        }
    }

    /// Toggle a branch open/closed; activating a leaf returns its command
    pub fn toggle(&mut self, id: NodeId) -> Result<Vec<TreeEvent>, DbError> {
        let Some(node) = self.forest.get(id) else {
            return Ok(Vec::new());
        };
        self.dirty = true;
        match node.kind() {
            NodeKind::Branch => {
                if node.is_open() {
                    self.close(id);
                } else {
                    self.open(id, false)?;
                }
                Ok(Vec::new())
            }
            NodeKind::Leaf => Ok(node
                .on_toggle
                .clone()
                .map(TreeEvent::Invoke)
                .into_iter()
                .collect()),
        }
    }

    /// Toggle the cursor node; with no cursor but existing roots, select
    /// and toggle the first root.
    pub fn toggle_cursor(&mut self) -> Result<Vec<TreeEvent>, DbError> {
        let id = match self.cursor {
            Some(id) => id,
            None => match self.roots.first().copied() {
                Some(root) => {
                    self.cursor = Some(root);
                    root
                }
                None => return Ok(Vec::new()),
            },
        };
        self.toggle(id)
    }

    /// Diff-refresh: re-fetch the node's children and reconcile against the
    /// loaded set by label identity.
    ///
    /// The final order is the fetched order. A fetched spec whose label
    /// matches a not-yet-consumed existing child reuses that child — open
    /// state and loaded subtree intact — and is refreshed recursively.
    /// Unmatched existing children are dropped from the arena; unmatched
    /// specs are instantiated. Nothing mutates unless the fetch succeeds.
    pub fn refresh_node(&mut self, id: NodeId) -> Result<(), DbError> {
        let Some(node) = self.forest.get(id) else {
            return Ok(());
        };
        if !node.is_open() || node.source.is_none() || node.loading {
            return Ok(());
        }

        let specs = self.fetch_children(id, false)?;

        let old: Vec<NodeId> = match self.forest.get(id) {
            Some(n) => n.children().to_vec(),
            None => return Ok(()),
        };
        let mut remaining: Vec<Option<NodeId>> = old.into_iter().map(Some).collect();
        let mut new_children = Vec::with_capacity(specs.len());
        let mut kept = Vec::new();
        let mut pending_open = Vec::new();

        for spec in specs {
            let mut reused = None;
            for slot in remaining.iter_mut() {
                if let Some(oid) = *slot
                    && self.forest.get(oid).is_some_and(|n| n.label == spec.label)
                {
                    *slot = None;
                    reused = Some(oid);
                    break;
                }
            }
            match reused {
                Some(oid) => {
                    new_children.push(oid);
                    kept.push(oid);
                }
                None => {
                    let auto_open = spec.auto_open;
                    let cid = self.forest.insert(spec, Some(id));
                    if auto_open {
                        pending_open.push(cid);
                    }
                    new_children.push(cid);
                }
            }
        }

        for slot in remaining {
            if let Some(oid) = slot {
                self.forest.remove_subtree(oid);
            }
        }
        if let Some(node) = self.forest.get_mut(id) {
            node.children = new_children;
        }
        self.dirty = true;

        for cid in pending_open {
            self.open(cid, false)?;
        }
        for oid in kept {
            self.refresh_node(oid)?;
        }
        Ok(())
    }

    /// Force-materialize the whole subtree under `id` without changing
    /// visible open states. Returns the number of nodes visited.
    pub fn index_all(&mut self, id: NodeId) -> Result<usize, DbError> {
        let mut visited = 0;
        self.index_walk(id, &mut visited)?;
        Ok(visited)
    }

    fn index_walk(&mut self, id: NodeId, visited: &mut usize) -> Result<(), DbError> {
        let Some(node) = self.forest.get(id) else {
            return Ok(());
        };
        *visited += 1;
        if !node.is_open() {
            self.open(id, true)?;
        }
        let children: Vec<NodeId> = match self.forest.get(id) {
            Some(n) => n.children().to_vec(),
            None => return Ok(()),
        };
        for child in children {
            self.index_walk(child, visited)?;
        }
        Ok(())
    }

    /// Take the node's source out, run it, and put it back. While the call
    /// is in flight the node is flagged `loading`, so re-entrant opens are
    /// coalesced into the outstanding one.
    fn fetch_children(&mut self, id: NodeId, indexing: bool) -> Result<Vec<NodeSpec>, DbError> {
        let Some(node) = self.forest.get_mut(id) else {
            return Ok(Vec::new());
        };
        let Some(source) = node.source.take() else {
            return Ok(Vec::new());
        };
        node.loading = true;
        let fetched = source.fetch(indexing);
        if let Some(node) = self.forest.get_mut(id) {
            node.source = Some(source);
            node.loading = false;
        }
        fetched
    }

    /// Initial population of a node's children from fetched specs
    fn adopt_children(&mut self, id: NodeId, specs: Vec<NodeSpec>) -> Result<(), DbError> {
        let mut pending_open = Vec::new();
        for spec in specs {
            let auto_open = spec.auto_open;
            let cid = self.forest.insert(spec, Some(id));
            if auto_open {
                pending_open.push(cid);
            }
        }
        for cid in pending_open {
            self.open(cid, false)?;
        }
        Ok(())
    }

    // ── Cursor navigation ────────────────────────────────────

    /// Move the cursor by `delta` lines, clamped to the projection bounds
    pub fn move_cursor(&mut self, delta: isize) -> Vec<TreeEvent> {
        if self.lines.is_empty() {
            return Vec::new();
        }
        let max = self.lines.len() as isize - 1;
        let target = (self.cursor_index as isize + delta).clamp(0, max) as usize;
        self.cursor_index = target;
        let id = self.lines[target].id;
        self.cursor = Some(id);
        vec![TreeEvent::Selected(id)]
    }

    /// Jump to the nearest earlier line that is strictly shallower than the
    /// cursor line (the visual parent). Pure index-table walk.
    pub fn goto_parent(&mut self) -> Vec<TreeEvent> {
        let idx = self.cursor_index;
        if idx == 0 || idx >= self.lines.len() {
            return Vec::new();
        }
        let depth = self.lines[idx].depth;
        for i in (0..idx).rev() {
            if self.lines[i].depth < depth {
                return self.move_cursor(i as isize - idx as isize);
            }
        }
        Vec::new()
    }

    /// Jump to the next line at the cursor's depth; when no such sibling
    /// follows, fall back to the next deeper line.
    pub fn goto_next_sibling(&mut self) -> Vec<TreeEvent> {
        let idx = self.cursor_index;
        if idx >= self.lines.len() {
            return Vec::new();
        }
        let depth = self.lines[idx].depth;
        for i in idx + 1..self.lines.len() {
            if self.lines[i].depth == depth {
                return self.move_cursor(i as isize - idx as isize);
            }
        }
        for i in idx + 1..self.lines.len() {
            if self.lines[i].depth > depth {
                return self.move_cursor(i as isize - idx as isize);
            }
        }
        Vec::new()
    }

    /// Open every ancestor of `id`, make it the cursor and rebuild.
    /// A node that no longer exists degrades to plain index recovery.
    pub fn reveal(&mut self, id: NodeId) -> Result<Vec<TreeEvent>, DbError> {
        if !self.forest.contains(id) {
            return Ok(self.refresh());
        }
        for ancestor in self.forest.ancestors(id) {
            self.open(ancestor, false)?;
        }
        self.cursor = Some(id);
        Ok(self.refresh())
    }

    // ── Search ───────────────────────────────────────────────

    /// Plain-text search over the forest root containing the cursor.
    /// Prefix matches go to the front of the results, substring-only
    /// matches are appended. Does not mutate tree state.
    pub fn search(&self, query: &str) -> Vec<NodeId> {
        let Some(cursor) = self.cursor else {
            return Vec::new();
        };
        let mut results = Vec::new();
        self.search_subtree(query, self.forest.root_of(cursor), &mut results);
        results
    }

    fn search_subtree(&self, query: &str, id: NodeId, results: &mut Vec<NodeId>) {
        let Some(node) = self.forest.get(id) else {
            return;
        };
        let text = node.label().plain_text();
        if text.starts_with(query) {
            results.insert(0, id);
        } else if text.contains(query) {
            results.push(id);
        }
        for &child in node.children() {
            self.search_subtree(query, child, results);
        }
    }

    /// Enter search mode over `matches`, revealing the first one.
    /// An empty match set leaves the state untouched.
    pub fn begin_search(&mut self, matches: Vec<NodeId>) -> Result<Vec<TreeEvent>, DbError> {
        let Some(&first) = matches.first() else {
            return Ok(Vec::new());
        };
        self.searching = true;
        self.matches = matches;
        self.reveal(first)
    }

    pub fn next_match(&mut self) -> Result<Vec<TreeEvent>, DbError> {
        self.step_match(1)
    }

    pub fn prev_match(&mut self) -> Result<Vec<TreeEvent>, DbError> {
        self.step_match(-1)
    }

    fn step_match(&mut self, dir: isize) -> Result<Vec<TreeEvent>, DbError> {
        if !self.searching || self.matches.is_empty() {
            return Ok(Vec::new());
        }
        let len = self.matches.len() as isize;
        let pos = self
            .cursor
            .and_then(|c| self.matches.iter().position(|&m| m == c))
            .unwrap_or(0) as isize;
        let next = (pos + dir).rem_euclid(len) as usize;
        self.reveal(self.matches[next])
    }

    pub fn cancel_search(&mut self) {
        self.searching = false;
        self.matches.clear();
    }

    // ── Rendering support ────────────────────────────────────

    /// How many leading lines to skip so the cursor sits at the vertical
    /// center once it has scrolled past the first half-viewport.
    pub fn scroll_skip(&self, height: usize) -> usize {
        let half = height / 2;
        self.cursor_index.saturating_sub(half)
    }
}

impl Default for TreeState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::node::{ChildSource, ConnTarget, Label, NodeCommand};
    use std::cell::Cell;
    use std::rc::Rc;

    struct FnSource {
        calls: Rc<Cell<usize>>,
        f: Box<dyn Fn(bool) -> Result<Vec<NodeSpec>, DbError>>,
    }

    impl ChildSource for FnSource {
        fn fetch(&self, indexing: bool) -> Result<Vec<NodeSpec>, DbError> {
            self.calls.set(self.calls.get() + 1);
            (self.f)(indexing)
        }
    }

    fn source(
        f: impl Fn(bool) -> Result<Vec<NodeSpec>, DbError> + 'static,
    ) -> (Box<FnSource>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        (
            Box::new(FnSource {
                calls: calls.clone(),
                f: Box::new(f),
            }),
            calls,
        )
    }

    fn branch(label: &str) -> NodeSpec {
        NodeSpec::branch(Label::plain(label))
    }

    /// A branch whose source yields plain branches named `children`
    fn branch_with(label: &str, children: &[&str]) -> NodeSpec {
        let names: Vec<String> = children.iter().map(|s| s.to_string()).collect();
        let (src, _) = source(move |_| Ok(names.iter().map(|n| branch(n)).collect()));
        branch(label).with_source(src)
    }

    fn dummy_command() -> NodeCommand {
        NodeCommand::RunQuery {
            title: "Count".to_string(),
            conn: ConnTarget {
                server: "local".to_string(),
                database: None,
            },
            sql: "SELECT 1".to_string(),
            refresh_tag: None,
        }
    }

    fn plain_lines(tree: &TreeState) -> Vec<(String, usize)> {
        tree.lines()
            .iter()
            .map(|l| {
                let text = tree.node(l.id).map(|n| n.label().plain_text()).unwrap_or_default();
                (text, l.depth)
            })
            .collect()
    }

    #[test]
    fn test_flatten_order_and_depths() {
        let mut tree = TreeState::new();
        let (src, _) = source(|_| Ok(vec![branch("x"), branch_with("y", &["z"])]));
        let (root, _) = tree
            .add_root(branch("r").with_source(src))
            .unwrap();
        tree.open(root, false).unwrap();
        // find and open y
        tree.refresh();
        let y = tree.lines()[2].id;
        tree.open(y, false).unwrap();
        tree.refresh();

        assert_eq!(
            plain_lines(&tree),
            vec![
                ("r".to_string(), 0),
                ("x".to_string(), 1),
                ("y".to_string(), 1),
                ("z".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_closed_branch_contributes_single_line() {
        let mut tree = TreeState::new();
        let (src, _) = source(|_| Ok(vec![branch_with("y", &["z"])]));
        let (root, _) = tree.add_root(branch("r").with_source(src)).unwrap();
        tree.open(root, false).unwrap();
        tree.refresh();
        // y is materialized (indexing walk) but closed: z is not visible
        assert_eq!(
            plain_lines(&tree),
            vec![("r".to_string(), 0), ("y".to_string(), 1)]
        );
    }

    #[test]
    fn test_source_invoked_once_until_refresh() {
        let mut tree = TreeState::new();
        let names = ["a", "b"];
        let (child_src, child_calls) = source(move |_| {
            Ok(names.iter().map(|n| branch(n)).collect())
        });
        let (root_src, _) = source({
            let child_src = Rc::new(Cell::new(Some(child_src)));
            move |_| {
                let mut specs = vec![];
                if let Some(src) = child_src.take() {
                    specs.push(branch("inner").with_source(src));
                }
                Ok(specs)
            }
        });
        let (root, _) = tree.add_root(branch("r").with_source(root_src)).unwrap();
        tree.open(root, false).unwrap();
        // the indexing walk materialized "inner" exactly once
        assert_eq!(child_calls.get(), 1);

        tree.refresh();
        let inner = tree.lines()[1].id;
        tree.open(inner, false).unwrap();
        tree.close(inner);
        tree.open(inner, false).unwrap();
        // children already loaded: no further fetches
        assert_eq!(child_calls.get(), 1);
    }

    #[test]
    fn test_diff_refresh_idempotent() {
        let mut tree = TreeState::new();
        let (src, calls) = source(|_| Ok(vec![branch("a"), branch("b")]));
        let (root, _) = tree.add_root(branch("r").with_source(src)).unwrap();
        tree.open(root, false).unwrap();

        tree.refresh_node(root).unwrap();
        let first: Vec<NodeId> = tree.node(root).unwrap().children().to_vec();
        tree.refresh_node(root).unwrap();
        let second: Vec<NodeId> = tree.node(root).unwrap().children().to_vec();

        assert_eq!(first, second);
        assert_eq!(calls.get(), 3); // initial load + two refreshes
    }

    #[test]
    fn test_diff_refresh_preserves_matching_labels() {
        let mut tree = TreeState::new();
        // first fetch: [a, b]; later fetches: [b, c]
        let probe = Rc::new(Cell::new(0));
        let p = probe.clone();
        let (src, _) = source(move |_| {
            let n = p.get();
            p.set(n + 1);
            if n == 0 {
                Ok(vec![branch("a"), branch_with("b", &["b1"])])
            } else {
                Ok(vec![branch_with("b", &["b1"]), branch("c")])
            }
        });
        let (root, _) = tree.add_root(branch("r").with_source(src)).unwrap();
        tree.open(root, false).unwrap();
        tree.refresh();

        let a = tree.node(root).unwrap().children()[0];
        let b = tree.node(root).unwrap().children()[1];
        tree.open(b, false).unwrap();
        let b_child = tree.node(b).unwrap().children()[0];

        tree.refresh_node(root).unwrap();

        let children = tree.node(root).unwrap().children().to_vec();
        assert_eq!(children.len(), 2);
        // b was reused in place, with its open state and subtree intact
        assert_eq!(children[0], b);
        assert!(tree.node(b).unwrap().is_open());
        assert_eq!(tree.node(b).unwrap().children(), &[b_child]);
        // a was removed, c inserted
        assert!(tree.node(a).is_none());
        assert_eq!(
            tree.node(children[1]).unwrap().label().plain_text(),
            "c"
        );
    }

    #[test]
    fn test_refresh_node_noop_when_closed() {
        let mut tree = TreeState::new();
        let (src, calls) = source(|_| Ok(vec![branch("a")]));
        let (root, _) = tree.add_root(branch("r").with_source(src)).unwrap();
        tree.refresh_node(root).unwrap();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_failed_fetch_leaves_node_closed() {
        let mut tree = TreeState::new();
        let calls_probe = Rc::new(Cell::new(0));
        let probe = calls_probe.clone();
        let (src, _) = source(move |_| {
            if probe.get() == 0 {
                probe.set(1);
                Err(DbError::QueryFailed("boom".to_string()))
            } else {
                Ok(vec![branch("a")])
            }
        });
        let (root, _) = tree.add_root(branch("r").with_source(src)).unwrap();

        assert!(tree.open(root, false).is_err());
        let node = tree.node(root).unwrap();
        assert!(!node.is_open());
        assert!(node.children().is_empty());

        // the next attempt succeeds and loads normally
        tree.open(root, false).unwrap();
        let node = tree.node(root).unwrap();
        assert!(node.is_open());
        assert_eq!(node.children().len(), 1);
    }

    #[test]
    fn test_failed_refresh_keeps_previous_children() {
        let mut tree = TreeState::new();
        let calls_probe = Rc::new(Cell::new(0));
        let probe = calls_probe.clone();
        let (src, _) = source(move |_| {
            let n = probe.get();
            probe.set(n + 1);
            if n == 0 {
                Ok(vec![branch("a"), branch("b")])
            } else {
                Err(DbError::QueryFailed("gone".to_string()))
            }
        });
        let (root, _) = tree.add_root(branch("r").with_source(src)).unwrap();
        tree.open(root, false).unwrap();
        let before = tree.node(root).unwrap().children().to_vec();

        assert!(tree.refresh_node(root).is_err());
        assert_eq!(tree.node(root).unwrap().children(), &before[..]);
        assert!(tree.node(root).unwrap().is_open());
    }

    #[test]
    fn test_move_cursor_clamps_both_ends() {
        let mut tree = TreeState::new();
        let (src, _) = source(|_| Ok(vec![branch("a"), branch("b")]));
        let (root, _) = tree.add_root(branch("r").with_source(src)).unwrap();
        tree.open(root, false).unwrap();
        tree.refresh();
        assert_eq!(tree.lines().len(), 3);

        tree.move_cursor(-100);
        assert_eq!(tree.cursor_index(), 0);
        tree.move_cursor(100);
        assert_eq!(tree.cursor_index(), 2);
        tree.move_cursor(1);
        assert_eq!(tree.cursor_index(), 2);
    }

    #[test]
    fn test_move_cursor_fires_selected() {
        let mut tree = TreeState::new();
        let (src, _) = source(|_| Ok(vec![branch("a")]));
        let (root, _) = tree.add_root(branch("r").with_source(src)).unwrap();
        tree.open(root, false).unwrap();
        tree.refresh();

        let events = tree.move_cursor(1);
        let expected = tree.lines()[1].id;
        assert_eq!(events, vec![TreeEvent::Selected(expected)]);
        assert_eq!(tree.cursor(), Some(expected));
    }

    #[test]
    fn test_cursor_recovery_after_node_removed() {
        let mut tree = TreeState::new();
        let calls_probe = Rc::new(Cell::new(0));
        let probe = calls_probe.clone();
        let (src, _) = source(move |_| {
            let n = probe.get();
            probe.set(n + 1);
            if n == 0 {
                Ok(vec![branch("a"), branch("b")])
            } else {
                Ok(vec![branch("b")])
            }
        });
        let (root, _) = tree.add_root(branch("r").with_source(src)).unwrap();
        tree.open(root, false).unwrap();
        tree.refresh();
        tree.move_cursor(1); // cursor on "a" at index 1

        tree.refresh_node(root).unwrap();
        tree.refresh();

        // "a" is gone; the numeric index is still in range and lands on "b"
        assert_eq!(tree.cursor_index(), 1);
        let text = tree
            .node(tree.cursor().unwrap())
            .unwrap()
            .label()
            .plain_text();
        assert_eq!(text, "b");
    }

    #[test]
    fn test_goto_parent_walks_to_shallower_line() {
        let mut tree = TreeState::new();
        let (src, _) = source(|_| Ok(vec![branch_with("a", &["a1", "a2"]), branch("b")]));
        let (root, _) = tree.add_root(branch("r").with_source(src)).unwrap();
        tree.open(root, false).unwrap();
        tree.refresh();
        let a = tree.lines()[1].id;
        tree.open(a, false).unwrap();
        tree.refresh();
        // lines: r a a1 a2 b

        tree.move_cursor(3); // a2
        tree.goto_parent();
        assert_eq!(tree.cursor(), Some(a));
        tree.goto_parent();
        assert_eq!(tree.cursor(), Some(root));
    }

    #[test]
    fn test_goto_next_sibling_with_fallback() {
        let mut tree = TreeState::new();
        let (src, _) = source(|_| Ok(vec![branch_with("a", &["a1", "a2"]), branch("b")]));
        let (root, _) = tree.add_root(branch("r").with_source(src)).unwrap();
        tree.open(root, false).unwrap();
        tree.refresh();
        let a = tree.lines()[1].id;
        tree.open(a, false).unwrap();
        tree.refresh();
        // lines: r(0) a(1) a1(2) a2(2) b(1)

        tree.move_cursor(2); // a1
        tree.goto_next_sibling();
        assert_eq!(tree.cursor_index(), 3); // a2

        tree.goto_next_sibling(); // no further depth-2 line; no deeper line either
        assert_eq!(tree.cursor_index(), 3);

        tree.move_cursor(-2); // a
        tree.goto_next_sibling();
        assert_eq!(tree.cursor_index(), 4); // b
    }

    #[test]
    fn test_toggle_leaf_returns_its_command() {
        let mut tree = TreeState::new();
        let cmd = dummy_command();
        let leaf_cmd = cmd.clone();
        let (src, _) = source(move |_| {
            Ok(vec![NodeSpec::leaf(Label::plain("[Count]"), leaf_cmd.clone())])
        });
        let (root, _) = tree.add_root(branch("r").with_source(src)).unwrap();
        tree.open(root, false).unwrap();
        tree.refresh();

        tree.move_cursor(1);
        let events = tree.toggle_cursor().unwrap();
        assert_eq!(events, vec![TreeEvent::Invoke(cmd)]);
        // and the leaf did not become "open"
        let leaf = tree.cursor().unwrap();
        assert!(!tree.node(leaf).unwrap().is_open());
    }

    #[test]
    fn test_toggle_cursor_falls_back_to_first_root() {
        let mut tree = TreeState::new();
        let (src, _) = source(|_| Ok(vec![branch("a")]));
        tree.add_root(branch("r").with_source(src)).unwrap();
        // force a cursorless state
        tree.cursor = None;
        tree.toggle_cursor().unwrap();
        assert!(tree.cursor_is_root());
        assert!(tree.node(tree.cursor().unwrap()).unwrap().is_open());
    }

    #[test]
    fn test_index_all_counts_visited_nodes() {
        let mut tree = TreeState::new();
        let (src, _) = source(|_| Ok(vec![branch_with("a", &["a1", "a2"]), branch("b")]));
        let (root, _) = tree.add_root(branch("r").with_source(src)).unwrap();
        tree.open(root, false).unwrap();

        let visited = tree.index_all(root).unwrap();
        // r, a, a1, a2, b
        assert_eq!(visited, 5);
        // indexing materialized a's children without opening it
        tree.refresh();
        assert_eq!(
            plain_lines(&tree),
            vec![("r".to_string(), 0), ("a".to_string(), 1), ("b".to_string(), 1)]
        );
    }

    #[test]
    fn test_search_ranks_prefix_before_substring() {
        let mut tree = TreeState::new();
        let (src, _) = source(|_| {
            Ok(vec![branch("apple"), branch("applesauce"), branch("pineapple")])
        });
        let (root, _) = tree.add_root(branch("fruit").with_source(src)).unwrap();
        tree.open(root, false).unwrap();
        tree.refresh();

        let results = tree.search("apple");
        let texts: Vec<String> = results
            .iter()
            .map(|&id| tree.node(id).unwrap().label().plain_text())
            .collect();
        assert_eq!(texts.len(), 3);
        assert!(texts[..2].contains(&"apple".to_string()));
        assert!(texts[..2].contains(&"applesauce".to_string()));
        assert_eq!(texts[2], "pineapple");
    }

    #[test]
    fn test_empty_search_keeps_browsing_state() {
        let mut tree = TreeState::new();
        let (src, _) = source(|_| Ok(vec![branch("a")]));
        tree.add_root(branch("r").with_source(src)).unwrap();

        let results = tree.search("nothing-matches-this");
        assert!(results.is_empty());
        tree.begin_search(results).unwrap();
        assert!(!tree.searching());
    }

    #[test]
    fn test_search_mode_wraps_both_directions() {
        let mut tree = TreeState::new();
        let (src, _) = source(|_| Ok(vec![branch("match-1"), branch("other"), branch("match-2")]));
        let (root, _) = tree.add_root(branch("r").with_source(src)).unwrap();
        tree.open(root, false).unwrap();
        tree.refresh();

        let matches = tree.search("match");
        assert_eq!(matches.len(), 2);
        tree.begin_search(matches.clone()).unwrap();
        assert!(tree.searching());
        assert_eq!(tree.cursor(), Some(matches[0]));

        tree.next_match().unwrap();
        assert_eq!(tree.cursor(), Some(matches[1]));
        tree.next_match().unwrap();
        assert_eq!(tree.cursor(), Some(matches[0]));
        tree.prev_match().unwrap();
        assert_eq!(tree.cursor(), Some(matches[1]));

        tree.cancel_search();
        assert!(!tree.searching());
        assert!(tree.matches().is_empty());
    }

    #[test]
    fn test_reveal_opens_ancestor_chain() {
        let mut tree = TreeState::new();
        let (src, _) = source(|_| Ok(vec![branch_with("a", &["deep"])]));
        let (root, _) = tree.add_root(branch("r").with_source(src)).unwrap();
        tree.open(root, false).unwrap();
        tree.close(root);
        tree.refresh();

        let a = tree.node(root).unwrap().children()[0];
        let deep = tree.node(a).unwrap().children()[0];

        tree.reveal(deep).unwrap();
        assert_eq!(tree.cursor(), Some(deep));
        assert!(tree.node(root).unwrap().is_open());
        assert!(tree.node(a).unwrap().is_open());
        assert!(tree.lines().iter().any(|l| l.id == deep));
    }

    #[test]
    fn test_refresh_fires_selected_exactly_once() {
        let mut tree = TreeState::new();
        let (src, _) = source(|_| Ok(vec![branch("a")]));
        let (root, _) = tree.add_root(branch("r").with_source(src)).unwrap();
        tree.open(root, false).unwrap();

        let events = tree.refresh();
        let selected: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, TreeEvent::Selected(_)))
            .collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(events[0], TreeEvent::Selected(root));
    }

    #[test]
    fn test_scroll_skip_centers_cursor() {
        let mut tree = TreeState::new();
        let (src, _) = source(|_| {
            Ok((0..20).map(|i| branch(&format!("n{i}"))).collect())
        });
        let (root, _) = tree.add_root(branch("r").with_source(src)).unwrap();
        tree.open(root, false).unwrap();
        tree.refresh();

        tree.move_cursor(3);
        assert_eq!(tree.scroll_skip(10), 0);
        tree.move_cursor(5); // index 8
        assert_eq!(tree.scroll_skip(10), 3);
    }

    #[test]
    fn test_empty_tree_operations_are_safe() {
        let mut tree = TreeState::new();
        assert!(tree.move_cursor(1).is_empty());
        assert!(tree.goto_parent().is_empty());
        assert!(tree.goto_next_sibling().is_empty());
        assert!(tree.toggle_cursor().unwrap().is_empty());
        assert!(tree.search("x").is_empty());
        assert_eq!(tree.cursor(), None);
    }

    #[test]
    fn test_new_roots_prepend() {
        let mut tree = TreeState::new();
        let (first, _) = tree.add_root(branch("first")).unwrap();
        let (second, _) = tree.add_root(branch("second")).unwrap();
        assert_eq!(tree.roots(), &[second, first]);
        assert_eq!(tree.cursor(), Some(second));
    }
}
