//! Tree nodes and the arena that owns them
//!
//! Nodes are stored in a single owning [`Forest`] keyed by [`NodeId`];
//! parent/child relationships are id references. The owning direction is
//! always parent → children, and the `parent` back-link is a plain lookup
//! key for ancestor walks.
//!
//! A node's identity across refreshes is its [`Label`] — two fetches that
//! produce a node with an identical label describe the same node, and the
//! diff in [`TreeState::refresh_node`](crate::tree::TreeState::refresh_node)
//! preserves its open state and loaded subtree.

use std::collections::HashMap;

use ratatui::style::Style;

use crate::error::DbError;

/// Stable node identifier. Ids are assigned monotonically and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

/// Node archetype.
///
/// A `Branch` may hold children and toggles open/closed; a `Leaf` has no
/// children and toggling it activates its command instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Branch,
    Leaf,
}

/// Styled node text: an ordered sequence of `(style, text)` segments.
///
/// Label equality (over the full segment list) is node identity for
/// diff-refresh purposes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Label {
    segments: Vec<(Style, String)>,
}

impl Label {
    /// An unstyled single-segment label
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            segments: vec![(Style::default(), text.into())],
        }
    }

    /// A single-segment label with the given style
    pub fn styled(style: Style, text: impl Into<String>) -> Self {
        Self {
            segments: vec![(style, text.into())],
        }
    }

    /// Append a segment
    pub fn push(&mut self, style: Style, text: impl Into<String>) {
        self.segments.push((style, text.into()));
    }

    pub fn segments(&self) -> &[(Style, String)] {
        &self.segments
    }

    /// The label text with styling stripped, used for search matching
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(|(_, t)| t.as_str()).collect()
    }
}

/// Identifies the connection a command should run on: a configured server,
/// optionally narrowed to one of its databases.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnTarget {
    pub server: String,
    pub database: Option<String>,
}

impl std::fmt::Display for ConnTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.database {
            Some(db) => write!(f, "{}/{}", self.server, db),
            None => write!(f, "{}", self.server),
        }
    }
}

/// What a node asks the application to do.
///
/// Tree operations never execute side effects themselves; they hand one of
/// these back and the application dispatcher applies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeCommand {
    /// Execute `sql` on `conn`, presenting results under `title`.
    ///
    /// `sql` has had its `#{..}` scope placeholders resolved already; any
    /// `${..}` parameters are collected from the user at execution time.
    /// `refresh_tag` names the ancestor node kind to diff-refresh after the
    /// query ran (the connection-scope node).
    RunQuery {
        title: String,
        conn: ConnTarget,
        sql: String,
        refresh_tag: Option<String>,
    },

    /// Open a new query tab on `conn` pre-filled with `sql`.
    OpenTab { conn: ConnTarget, sql: String },
}

/// A named entry in a node's actions menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedCommand {
    pub name: String,
    pub command: NodeCommand,
}

/// Produces a node's children on demand.
///
/// Implementations must be deterministic enough that repeated invocation
/// over unchanged backing data yields specs with identical labels — the
/// diff-refresh mechanism keys on label stability.
pub trait ChildSource {
    /// Fetch a fresh ordered set of child specs.
    ///
    /// `indexing` is true when the fetch happens during a bulk indexing
    /// walk rather than a user-visible expansion.
    fn fetch(&self, indexing: bool) -> Result<Vec<NodeSpec>, DbError>;
}

/// Everything needed to instantiate a node: what a [`ChildSource`] produces.
pub struct NodeSpec {
    pub kind: NodeKind,
    pub label: Label,
    /// Expand immediately after instantiation
    pub auto_open: bool,
    /// Node definition key this spec came from (used for ancestor lookups)
    pub tag: Option<String>,
    pub source: Option<Box<dyn ChildSource>>,
    /// Leaf activation command
    pub on_toggle: Option<NodeCommand>,
    /// Fired (by the dispatcher) when the cursor settles on this node
    pub on_select: Option<NodeCommand>,
    /// Entries for the actions menu
    pub actions: Vec<NamedCommand>,
    /// Command behind "open connection in a new tab"
    pub open_tab: Option<NodeCommand>,
}

impl NodeSpec {
    /// A branch with no source: permanently closed until given one
    pub fn branch(label: Label) -> Self {
        Self {
            kind: NodeKind::Branch,
            label,
            auto_open: false,
            tag: None,
            source: None,
            on_toggle: None,
            on_select: None,
            actions: Vec::new(),
            open_tab: None,
        }
    }

    /// A leaf activating `command` on toggle
    pub fn leaf(label: Label, command: NodeCommand) -> Self {
        Self {
            kind: NodeKind::Leaf,
            label,
            auto_open: false,
            tag: None,
            source: None,
            on_toggle: Some(command),
            on_select: None,
            actions: Vec::new(),
            open_tab: None,
        }
    }

    pub fn with_source(mut self, source: Box<dyn ChildSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_auto_open(mut self, auto_open: bool) -> Self {
        self.auto_open = auto_open;
        self
    }
}

/// A single tree node, owned by the [`Forest`]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) label: Label,
    pub(crate) is_open: bool,
    /// Re-entrancy guard: set while this node's source call is in flight
    pub(crate) loading: bool,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) tag: Option<String>,
    pub(crate) source: Option<Box<dyn ChildSource>>,
    pub(crate) on_toggle: Option<NodeCommand>,
    pub(crate) on_select: Option<NodeCommand>,
    pub(crate) actions: Vec<NamedCommand>,
    pub(crate) open_tab: Option<NodeCommand>,
}

impl Node {
    fn from_spec(spec: NodeSpec, parent: Option<NodeId>) -> Self {
        Self {
            kind: spec.kind,
            label: spec.label,
            is_open: false,
            loading: false,
            children: Vec::new(),
            parent,
            tag: spec.tag,
            source: spec.source,
            on_toggle: spec.on_toggle,
            on_select: spec.on_select,
            actions: spec.actions,
            open_tab: spec.open_tab,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn on_select(&self) -> Option<&NodeCommand> {
        self.on_select.as_ref()
    }

    pub fn actions(&self) -> &[NamedCommand] {
        &self.actions
    }

    pub fn open_tab(&self) -> Option<&NodeCommand> {
        self.open_tab.as_ref()
    }

    /// Whether the node can ever produce children
    pub fn expandable(&self) -> bool {
        self.kind == NodeKind::Branch && (self.source.is_some() || !self.children.is_empty())
    }
}

/// The single owning store of tree nodes
#[derive(Default)]
pub struct Forest {
    nodes: HashMap<NodeId, Node>,
    next: u64,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate `spec` under `parent` (appending to its children).
    ///
    /// Does not honor `auto_open` — expansion needs the tree state and is
    /// handled by the caller.
    pub fn insert(&mut self, spec: NodeSpec, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        self.nodes.insert(id, Node::from_spec(spec, parent));
        if let Some(pid) = parent
            && let Some(p) = self.nodes.get_mut(&pid)
        {
            p.children.push(id);
        }
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Drop `id` and its whole subtree from the store.
    ///
    /// Does not unlink `id` from its parent's child list; the caller owns
    /// that list during reconciliation.
    pub fn remove_subtree(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(&id) {
            for child in node.children {
                self.remove_subtree(child);
            }
        }
    }

    /// Subtree node count: 1 plus the recursive sum over children
    pub fn size(&self, id: NodeId) -> usize {
        match self.nodes.get(&id) {
            Some(node) => 1 + node.children.iter().map(|&c| self.size(c)).sum::<usize>(),
            None => 0,
        }
    }

    /// Ancestor chain from `id`'s parent up to its root
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.nodes.get(&id).and_then(|n| n.parent);
        while let Some(pid) = cur {
            out.push(pid);
            cur = self.nodes.get(&pid).and_then(|n| n.parent);
        }
        out
    }

    /// The root of the tree containing `id`
    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().copied().unwrap_or(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> ConnTarget {
        ConnTarget {
            server: "local".to_string(),
            database: None,
        }
    }

    #[test]
    fn test_label_plain_text_joins_segments() {
        let mut label = Label::styled(Style::default(), "pub");
        label.push(Style::default(), "lic");
        assert_eq!(label.plain_text(), "public");
    }

    #[test]
    fn test_label_identity_includes_style() {
        use ratatui::style::Color;
        let a = Label::styled(Style::default().fg(Color::Green), "users");
        let b = Label::styled(Style::default(), "users");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_insert_links_parent_and_child() {
        let mut forest = Forest::new();
        let root = forest.insert(NodeSpec::branch(Label::plain("root")), None);
        let child = forest.insert(NodeSpec::branch(Label::plain("child")), Some(root));

        assert_eq!(forest.get(root).unwrap().children(), &[child]);
        assert_eq!(forest.get(child).unwrap().parent(), Some(root));
    }

    #[test]
    fn test_remove_subtree_drops_descendants() {
        let mut forest = Forest::new();
        let root = forest.insert(NodeSpec::branch(Label::plain("root")), None);
        let child = forest.insert(NodeSpec::branch(Label::plain("child")), Some(root));
        let grandchild = forest.insert(NodeSpec::branch(Label::plain("gc")), Some(child));

        forest.remove_subtree(child);
        assert!(forest.contains(root));
        assert!(!forest.contains(child));
        assert!(!forest.contains(grandchild));
    }

    #[test]
    fn test_size_counts_subtree() {
        let mut forest = Forest::new();
        let root = forest.insert(NodeSpec::branch(Label::plain("root")), None);
        let a = forest.insert(NodeSpec::branch(Label::plain("a")), Some(root));
        forest.insert(NodeSpec::branch(Label::plain("b")), Some(root));
        forest.insert(
            NodeSpec::leaf(
                Label::plain("action"),
                NodeCommand::OpenTab {
                    conn: target(),
                    sql: String::new(),
                },
            ),
            Some(a),
        );

        assert_eq!(forest.size(root), 4);
        assert_eq!(forest.size(a), 2);
    }

    #[test]
    fn test_ancestors_and_root_of() {
        let mut forest = Forest::new();
        let root = forest.insert(NodeSpec::branch(Label::plain("root")), None);
        let mid = forest.insert(NodeSpec::branch(Label::plain("mid")), Some(root));
        let leafish = forest.insert(NodeSpec::branch(Label::plain("deep")), Some(mid));

        assert_eq!(forest.ancestors(leafish), vec![mid, root]);
        assert_eq!(forest.root_of(leafish), root);
        assert_eq!(forest.root_of(root), root);
    }

    #[test]
    fn test_branch_without_source_is_not_expandable() {
        let mut forest = Forest::new();
        let id = forest.insert(NodeSpec::branch(Label::plain("column")), None);
        assert!(!forest.get(id).unwrap().expandable());
    }
}
