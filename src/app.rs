//! Application state and event handling
//!
//! Central dispatcher: key events come in, panel state updates, and tree
//! [`TreeEvent`]s / [`NodeCommand`]s are applied here. Components never
//! reach into each other — the tree describes what should happen and this
//! module decides how.

use std::collections::HashMap;
use std::rc::Rc;

use crossterm::event::KeyEvent;

use crate::config::Settings;
use crate::config::servers::ServerConfig;
use crate::db::browser::{self, TreeContext};
use crate::error::Result;
use crate::grid::{Extent, GridState};
use crate::keymap::{KeyAction, KeyMap};
use crate::query::{self, Placeholder};
use crate::tree::{ConnTarget, NodeCommand, NodeId, TreeEvent, TreeState};
use crate::ui::editor::QueryEditor;
use crate::ui::menu::{Menu, MenuAction};
use crate::ui::prompt::{Prompt, PromptAction};
use crate::ui::theme::Theme;

/// Panel focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelFocus {
    Tree,
    Query,
    Results,
}

/// Status message with severity level
pub struct StatusMessage {
    pub message: String,
    pub level: StatusLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One query tab: an editor bound to a connection
pub struct QueryTab {
    pub name: String,
    pub conn: ConnTarget,
    pub editor: QueryEditor,
}

/// A query waiting for its `${param}` values
struct PendingQuery {
    title: String,
    conn: ConnTarget,
    sql: String,
    refresh_tag: Option<String>,
    origin: Option<NodeId>,
    params: Vec<Placeholder>,
    values: HashMap<String, String>,
}

/// Modal state over the panels
enum Overlay {
    Prompt {
        prompt: Prompt,
        purpose: PromptPurpose,
    },
    Menu {
        menu: Menu,
        commands: Vec<NodeCommand>,
        origin: Option<NodeId>,
    },
}

enum PromptPurpose {
    Search,
    Param(PendingQuery),
}

/// Main application state
pub struct App {
    pub focus: PanelFocus,
    pub tree: TreeState,
    pub grid: GridState,
    pub tabs: Vec<QueryTab>,
    pub active_tab: usize,
    pub keymap: KeyMap,
    pub theme: Theme,
    pub status: Option<StatusMessage>,
    /// Result note line ("42 rows in 1.3ms", error text, ...)
    pub note: String,
    /// The note line carries an error
    pub note_error: bool,
    pub running: bool,
    overlay: Option<Overlay>,
    ctx: Rc<TreeContext>,
    settings: Settings,
    result_viewport: Extent,
}

impl App {
    pub fn new(ctx: Rc<TreeContext>, settings: Settings) -> Self {
        Self {
            focus: PanelFocus::Tree,
            tree: TreeState::new(),
            grid: GridState::new(),
            tabs: Vec::new(),
            active_tab: 0,
            keymap: KeyMap::default(),
            theme: Theme::default(),
            status: None,
            note: String::new(),
            note_error: false,
            running: true,
            overlay: None,
            ctx,
            settings,
            result_viewport: Extent::new(4, 7),
        }
    }

    /// Register a configured server as a new forest root
    pub fn add_server(&mut self, name: &str, cfg: &ServerConfig) -> Result<()> {
        let spec = browser::server_root(&self.ctx, name, cfg)?;
        let (_, events) = self.tree.add_root(spec)?;
        self.dispatch_tree_events(events);
        Ok(())
    }

    pub fn overlay_active(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn active_tab(&self) -> Option<&QueryTab> {
        self.tabs.get(self.active_tab)
    }

    pub fn set_status(&mut self, message: impl Into<String>, level: StatusLevel) {
        self.status = Some(StatusMessage {
            message: message.into(),
            level,
        });
    }

    /// Recompute the result grid viewport from the terminal size.
    /// Each grid row takes ~3 terminal lines and each column ~15 cells.
    pub fn update_result_viewport(&mut self, width: u16, height: u16) {
        let usable_w = (width as usize / 2).saturating_sub(5);
        let usable_h = (height as usize).saturating_sub(10);
        let viewport = Extent::new((usable_w / 15).max(1), (usable_h / 3).max(1));
        self.result_viewport = viewport;
        self.grid.set_viewport(viewport);
    }

    /// Rebuild the tree projection if something marked it dirty; called
    /// once per frame before drawing.
    pub fn before_render(&mut self) {
        let events = self.tree.ensure_fresh();
        self.dispatch_tree_events(events);
    }

    // ── Key handling ─────────────────────────────────────────

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.status = None;

        if self.overlay.is_some() {
            self.handle_overlay_key(key);
            return;
        }

        if let Some(action) = self.keymap.resolve(self.focus, key) {
            self.execute_key_action(action);
            return;
        }

        // Free-form text input falls through to the editor
        if self.focus == PanelFocus::Query
            && let Some(tab) = self.tabs.get_mut(self.active_tab)
        {
            tab.editor.handle_key(key);
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) {
        let Some(overlay) = self.overlay.take() else {
            return;
        };
        match overlay {
            Overlay::Prompt { mut prompt, purpose } => match prompt.handle_key(key) {
                PromptAction::Consumed => {
                    self.overlay = Some(Overlay::Prompt { prompt, purpose });
                }
                PromptAction::Cancel => {}
                PromptAction::Submit(text) => self.submit_prompt(purpose, text),
            },
            Overlay::Menu {
                mut menu,
                commands,
                origin,
            } => match menu.handle_key(key) {
                MenuAction::Consumed => {
                    self.overlay = Some(Overlay::Menu {
                        menu,
                        commands,
                        origin,
                    });
                }
                MenuAction::Cancel => {}
                MenuAction::Pick(i) => {
                    if let Some(cmd) = commands.into_iter().nth(i) {
                        self.run_command(cmd, origin);
                    }
                }
            },
        }
    }

    fn execute_key_action(&mut self, action: KeyAction) {
        match action {
            // ── Global ───────────────────────────────────────
            KeyAction::Quit => self.running = false,
            KeyAction::FocusTree => self.focus = PanelFocus::Tree,
            KeyAction::FocusQuery => {
                if !self.tabs.is_empty() {
                    self.focus = PanelFocus::Query;
                }
            }
            KeyAction::FocusResults => self.focus = PanelFocus::Results,
            KeyAction::CycleFocus => self.cycle_focus(),

            // ── Navigation ───────────────────────────────────
            KeyAction::MoveUp => self.move_vertical(-1),
            KeyAction::MoveDown => self.move_vertical(1),
            KeyAction::MoveLeft => {
                if self.focus == PanelFocus::Results {
                    self.grid.move_offset(-1, 0);
                }
            }
            KeyAction::MoveRight => {
                if self.focus == PanelFocus::Results {
                    self.grid.move_offset(1, 0);
                }
            }

            // ── Tree ─────────────────────────────────────────
            KeyAction::GotoParent => {
                if !self.tree.searching() {
                    let events = self.tree.goto_parent();
                    self.dispatch_tree_events(events);
                }
            }
            KeyAction::GotoNextSibling => {
                if !self.tree.searching() {
                    let events = self.tree.goto_next_sibling();
                    self.dispatch_tree_events(events);
                }
            }
            KeyAction::Toggle => {
                if !self.tree.searching() {
                    match self.tree.toggle_cursor() {
                        Ok(events) => self.dispatch_tree_events(events),
                        Err(e) => self.set_status(e.to_string(), StatusLevel::Error),
                    }
                }
            }
            KeyAction::RefreshNode => {
                if let Some(id) = self.tree.cursor()
                    && let Err(e) = self.tree.refresh_node(id)
                {
                    self.set_status(e.to_string(), StatusLevel::Error);
                }
            }
            KeyAction::IndexTree => {
                if self.tree.cursor_is_root()
                    && let Some(id) = self.tree.cursor()
                {
                    match self.tree.index_all(id) {
                        Ok(count) => self.set_status(
                            format!("Indexed {} nodes", count),
                            StatusLevel::Success,
                        ),
                        Err(e) => self.set_status(e.to_string(), StatusLevel::Error),
                    }
                }
            }
            KeyAction::Search => {
                if self.focus == PanelFocus::Tree {
                    self.overlay = Some(Overlay::Prompt {
                        prompt: Prompt::new("Enter a search"),
                        purpose: PromptPurpose::Search,
                    });
                }
            }
            KeyAction::Actions => self.open_actions_menu(),
            KeyAction::OpenConnection => {
                if let Some(cmd) = self
                    .tree
                    .cursor()
                    .and_then(|id| self.tree.node(id))
                    .and_then(|n| n.open_tab().cloned())
                {
                    let origin = self.tree.cursor();
                    self.run_command(cmd, origin);
                }
            }
            KeyAction::Cancel => {
                if self.tree.searching() {
                    self.tree.cancel_search();
                }
            }

            // ── Query ────────────────────────────────────────
            KeyAction::ExecuteQuery => self.execute_editor(),
            KeyAction::PrevTab => self.step_tab(-1),
            KeyAction::NextTab => self.step_tab(1),
            KeyAction::CloseTab => self.close_tab(),
        }
    }

    fn move_vertical(&mut self, delta: isize) {
        match self.focus {
            PanelFocus::Tree => {
                // in search mode the line keys walk the matches instead
                let result = if self.tree.searching() {
                    if delta > 0 {
                        self.tree.next_match()
                    } else {
                        self.tree.prev_match()
                    }
                } else {
                    Ok(self.tree.move_cursor(delta))
                };
                match result {
                    Ok(events) => self.dispatch_tree_events(events),
                    Err(e) => self.set_status(e.to_string(), StatusLevel::Error),
                }
            }
            PanelFocus::Results => self.grid.move_offset(0, delta),
            PanelFocus::Query => {}
        }
    }

    fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            PanelFocus::Tree if self.tabs.is_empty() => PanelFocus::Results,
            PanelFocus::Tree => PanelFocus::Query,
            PanelFocus::Query => PanelFocus::Results,
            PanelFocus::Results => PanelFocus::Tree,
        };
    }

    fn open_actions_menu(&mut self) {
        let Some(id) = self.tree.cursor() else {
            return;
        };
        let Some(node) = self.tree.node(id) else {
            return;
        };
        if node.actions().is_empty() {
            self.set_status("No actions for this node", StatusLevel::Info);
            return;
        }
        let title = format!("Actions for {}", node.label().plain_text());
        let names = node.actions().iter().map(|a| a.name.clone()).collect();
        let commands = node.actions().iter().map(|a| a.command.clone()).collect();
        self.overlay = Some(Overlay::Menu {
            menu: Menu::new(title, names),
            commands,
            origin: Some(id),
        });
    }

    // ── Tree events and commands ─────────────────────────────

    fn dispatch_tree_events(&mut self, events: Vec<TreeEvent>) {
        for event in events {
            match event {
                TreeEvent::Selected(id) => {
                    tracing::trace!(?id, "selected");
                    if let Some(cmd) = self.tree.node(id).and_then(|n| n.on_select().cloned()) {
                        self.run_command(cmd, Some(id));
                    }
                }
                TreeEvent::Invoke(cmd) => {
                    let origin = self.tree.cursor();
                    self.run_command(cmd, origin);
                }
            }
        }
    }

    fn run_command(&mut self, command: NodeCommand, origin: Option<NodeId>) {
        match command {
            NodeCommand::RunQuery {
                title,
                conn,
                sql,
                refresh_tag,
            } => self.start_query(title, conn, sql, refresh_tag, origin),
            NodeCommand::OpenTab { conn, sql } => {
                self.add_tab("New tab", conn, &sql);
                self.focus = PanelFocus::Query;
            }
        }
    }

    /// Run a query, collecting `${param}` values through the prompt first
    /// when the sql carries any.
    fn start_query(
        &mut self,
        title: String,
        conn: ConnTarget,
        sql: String,
        refresh_tag: Option<String>,
        origin: Option<NodeId>,
    ) {
        let params = query::param_placeholders(&sql);
        if params.is_empty() {
            self.execute_query(title, conn, sql, refresh_tag, origin);
            return;
        }
        let pending = PendingQuery {
            title,
            conn,
            sql,
            refresh_tag,
            origin,
            params,
            values: HashMap::new(),
        };
        self.prompt_next_param(pending);
    }

    fn prompt_next_param(&mut self, pending: PendingQuery) {
        match pending.params.get(pending.values.len()) {
            Some(param) => {
                self.overlay = Some(Overlay::Prompt {
                    prompt: Prompt::new(format!("Parameter: {}", param.name)),
                    purpose: PromptPurpose::Param(pending),
                });
            }
            None => {
                match query::substitute_params(&pending.sql, &pending.values) {
                    Ok(sql) => self.execute_query(
                        pending.title,
                        pending.conn,
                        sql,
                        pending.refresh_tag,
                        pending.origin,
                    ),
                    Err(e) => self.set_status(e.to_string(), StatusLevel::Error),
                }
            }
        }
    }

    fn submit_prompt(&mut self, purpose: PromptPurpose, text: String) {
        match purpose {
            PromptPurpose::Search => {
                let results = self.tree.search(&text);
                match self.tree.begin_search(results) {
                    Ok(events) => self.dispatch_tree_events(events),
                    Err(e) => self.set_status(e.to_string(), StatusLevel::Error),
                }
            }
            PromptPurpose::Param(mut pending) => {
                if let Some(param) = pending.params.get(pending.values.len()) {
                    pending.values.insert(param.name.clone(), text);
                }
                self.prompt_next_param(pending);
            }
        }
    }

    /// Execute `sql` and route the outcome to the grid, the note line and
    /// the status bar. Mirrors the behavior of the tree/editor execute
    /// paths: results with columns land in the grid; statement results
    /// only update the note.
    fn execute_query(
        &mut self,
        title: String,
        conn: ConnTarget,
        sql: String,
        refresh_tag: Option<String>,
        origin: Option<NodeId>,
    ) {
        // keep a tab showing what ran, as the original did
        let current = self.active_tab().map(|t| t.editor.content());
        if current.as_deref() != Some(sql.as_str()) {
            self.add_tab(&title, conn.clone(), &sql);
        }

        let outcome = self.ctx.pool.borrow_mut().execute(&conn, &sql);
        match outcome {
            Ok(results) => {
                if !results.columns.is_empty() {
                    let (header, rows) = results.display_grid(self.settings.cell_limit);
                    let total = Extent::new(results.columns.len(), results.rows.len());
                    self.grid.reset(rows, header, self.result_viewport, total);
                    self.note = format!(
                        "{} rows in {:.1}ms",
                        results.row_count,
                        results.execution_time.as_secs_f64() * 1000.0
                    );
                } else {
                    self.note = format!("Affected rows {}", results.row_count);
                }
                self.note_error = false;
                self.set_status("Query finished", StatusLevel::Success);
                self.tree.mark_dirty();
                if let (Some(tag), Some(origin)) = (refresh_tag, origin) {
                    self.refresh_scope_ancestor(origin, &tag);
                }
            }
            Err(e) => {
                self.note = e.to_string();
                self.note_error = true;
                self.set_status("Query failed", StatusLevel::Error);
            }
        }
    }

    /// Draw the active modal, if any, over the panels
    pub fn render_overlay(&self, frame: &mut ratatui::Frame, theme: &Theme) {
        match &self.overlay {
            Some(Overlay::Prompt { prompt, .. }) => prompt.render(frame, theme),
            Some(Overlay::Menu { menu, .. }) => menu.render(frame, theme),
            None => {}
        }
    }

    /// Diff-refresh the nearest ancestor carrying `tag` (the node that owns
    /// the connection the command ran on)
    fn refresh_scope_ancestor(&mut self, origin: NodeId, tag: &str) {
        let mut cur = Some(origin);
        while let Some(id) = cur {
            if self.tree.node(id).is_some_and(|n| n.tag() == Some(tag)) {
                if let Err(e) = self.tree.refresh_node(id) {
                    self.set_status(e.to_string(), StatusLevel::Error);
                }
                return;
            }
            cur = self.tree.node(id).and_then(|n| n.parent());
        }
    }

    // ── Tabs ─────────────────────────────────────────────────

    pub fn add_tab(&mut self, name: &str, conn: ConnTarget, content: &str) {
        self.tabs.push(QueryTab {
            name: name.to_string(),
            conn,
            editor: QueryEditor::with_content(content),
        });
        self.active_tab = self.tabs.len() - 1;
    }

    fn step_tab(&mut self, delta: isize) {
        if self.tabs.len() > 1 {
            let len = self.tabs.len() as isize;
            self.active_tab = (self.active_tab as isize + delta).rem_euclid(len) as usize;
        }
    }

    fn close_tab(&mut self) {
        if self.tabs.len() > 1 {
            self.tabs.remove(self.active_tab);
            if self.active_tab >= self.tabs.len() {
                self.active_tab = self.tabs.len() - 1;
            }
        } else {
            self.set_status("Cannot close the last tab", StatusLevel::Warning);
        }
    }

    fn execute_editor(&mut self) {
        let Some(tab) = self.active_tab() else {
            return;
        };
        let sql = tab.editor.content();
        if sql.trim().is_empty() {
            return;
        }
        let title = tab.name.clone();
        let conn = tab.conn.clone();
        self.start_query(title, conn, sql, None, None);
    }
}
