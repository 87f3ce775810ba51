//! Data-driven keybinding configuration
//!
//! All keybindings are defined as data in `KeyMap::default()`, not as match
//! arms scattered across components. To add a new binding, add an entry to
//! the appropriate context in `KeyMap::default()` and handle the
//! `KeyAction` in `App::execute_key_action()`.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::PanelFocus;

/// A key combination (code + modifiers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBind {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl From<KeyEvent> for KeyBind {
    fn from(event: KeyEvent) -> Self {
        Self {
            code: event.code,
            modifiers: event.modifiers,
        }
    }
}

/// Semantic key actions — what a key means, not what key it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    // Global
    Quit,
    FocusTree,
    FocusQuery,
    FocusResults,
    CycleFocus,

    // Navigation (tree cursor / grid offset)
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,

    // Tree-specific
    GotoParent,
    GotoNextSibling,
    Toggle,
    RefreshNode,
    IndexTree,
    Search,
    Actions,
    OpenConnection,
    Cancel,

    // Query-specific
    ExecuteQuery,
    PrevTab,
    NextTab,
    CloseTab,
}

/// Keybinding configuration — maps key combos to semantic actions per
/// context.
pub struct KeyMap {
    /// Bindings that apply regardless of focus (checked first)
    global: HashMap<KeyBind, KeyAction>,
    /// Per-panel bindings (checked after global)
    panels: HashMap<PanelFocus, HashMap<KeyBind, KeyAction>>,
}

impl KeyMap {
    /// Resolve a key event to a semantic action.
    /// Checks global bindings first, then panel-specific bindings.
    pub fn resolve(&self, focus: PanelFocus, key: KeyEvent) -> Option<KeyAction> {
        let bind = KeyBind::from(key);
        if let Some(action) = self.global.get(&bind) {
            return Some(*action);
        }
        self.panels.get(&focus).and_then(|m| m.get(&bind)).copied()
    }

    /// The bindings shown in the bottom bar for `focus`
    pub fn hints(&self, focus: PanelFocus) -> Vec<(&'static str, &'static str)> {
        let mut hints = vec![("Tab", "Switch"), ("^Q", "Quit")];
        match focus {
            PanelFocus::Tree => hints.extend([
                ("Enter", "Toggle"),
                ("F5", "Refresh"),
                ("F6", "Index"),
                ("/", "Search"),
                ("a", "Actions"),
                ("o", "Open"),
            ]),
            PanelFocus::Query => hints.extend([
                ("^E", "Execute"),
                ("S-←/→", "Tabs"),
                ("^W", "Close tab"),
            ]),
            PanelFocus::Results => hints.extend([("↑↓←→", "Move cell")]),
        }
        hints
    }
}

fn bind(code: KeyCode, modifiers: KeyModifiers) -> KeyBind {
    KeyBind { code, modifiers }
}

impl Default for KeyMap {
    fn default() -> Self {
        let mut global = HashMap::new();
        global.insert(
            bind(KeyCode::Char('q'), KeyModifiers::CONTROL),
            KeyAction::Quit,
        );
        global.insert(
            bind(KeyCode::Char('c'), KeyModifiers::CONTROL),
            KeyAction::Quit,
        );
        global.insert(bind(KeyCode::F(1), KeyModifiers::NONE), KeyAction::FocusTree);
        global.insert(bind(KeyCode::F(2), KeyModifiers::NONE), KeyAction::FocusQuery);
        global.insert(
            bind(KeyCode::F(3), KeyModifiers::NONE),
            KeyAction::FocusResults,
        );
        global.insert(bind(KeyCode::Tab, KeyModifiers::NONE), KeyAction::CycleFocus);

        let mut panels = HashMap::new();

        // ── Tree ─────────────────────────────────────────────────
        let mut tree = HashMap::new();
        tree.insert(bind(KeyCode::Up, KeyModifiers::NONE), KeyAction::MoveUp);
        tree.insert(bind(KeyCode::Down, KeyModifiers::NONE), KeyAction::MoveDown);
        tree.insert(
            bind(KeyCode::Up, KeyModifiers::SHIFT),
            KeyAction::GotoParent,
        );
        tree.insert(
            bind(KeyCode::Down, KeyModifiers::SHIFT),
            KeyAction::GotoNextSibling,
        );
        tree.insert(bind(KeyCode::Enter, KeyModifiers::NONE), KeyAction::Toggle);
        tree.insert(bind(KeyCode::Char(' '), KeyModifiers::NONE), KeyAction::Toggle);
        tree.insert(bind(KeyCode::F(5), KeyModifiers::NONE), KeyAction::RefreshNode);
        tree.insert(bind(KeyCode::F(6), KeyModifiers::NONE), KeyAction::IndexTree);
        tree.insert(bind(KeyCode::Char('/'), KeyModifiers::NONE), KeyAction::Search);
        tree.insert(bind(KeyCode::Char('a'), KeyModifiers::NONE), KeyAction::Actions);
        tree.insert(
            bind(KeyCode::Char('o'), KeyModifiers::NONE),
            KeyAction::OpenConnection,
        );
        tree.insert(bind(KeyCode::Esc, KeyModifiers::NONE), KeyAction::Cancel);
        panels.insert(PanelFocus::Tree, tree);

        // ── Query ────────────────────────────────────────────────
        let mut query = HashMap::new();
        query.insert(
            bind(KeyCode::Char('e'), KeyModifiers::CONTROL),
            KeyAction::ExecuteQuery,
        );
        query.insert(bind(KeyCode::Left, KeyModifiers::SHIFT), KeyAction::PrevTab);
        query.insert(bind(KeyCode::Right, KeyModifiers::SHIFT), KeyAction::NextTab);
        query.insert(
            bind(KeyCode::Char('w'), KeyModifiers::CONTROL),
            KeyAction::CloseTab,
        );
        panels.insert(PanelFocus::Query, query);

        // ── Results ──────────────────────────────────────────────
        let mut results = HashMap::new();
        results.insert(bind(KeyCode::Up, KeyModifiers::NONE), KeyAction::MoveUp);
        results.insert(bind(KeyCode::Down, KeyModifiers::NONE), KeyAction::MoveDown);
        results.insert(bind(KeyCode::Left, KeyModifiers::NONE), KeyAction::MoveLeft);
        results.insert(bind(KeyCode::Right, KeyModifiers::NONE), KeyAction::MoveRight);
        panels.insert(PanelFocus::Results, results);

        Self { global, panels }
    }
}
