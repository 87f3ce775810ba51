//! Bridges driver definitions to the tree
//!
//! Every tree node is described by a driver `NodeDef`. This module turns
//! those definitions into [`NodeSpec`]s: the server roots, and
//! [`DriverSource`] — the `ChildSource` that runs a node's children query
//! (or materializes its static children) and appends its leaf buttons.
//!
//! All configuration interpretation happens here, once per node, when the
//! spec is built: `#{}` placeholders are substituted from the ancestor
//! scope, connection scopes resolve to concrete [`ConnTarget`]s, and
//! matching scripts are folded into the actions menu. The tree core never
//! sees configuration.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::config::drivers::{ConnScope, DriverSpec};
use crate::config::servers::ServerConfig;
use crate::config::Registry;
use crate::db::pool::ConnectionPool;
use crate::error::{ConfigResult, DbError};
use crate::query;
use crate::tree::{ChildSource, ConnTarget, Label, NamedCommand, NodeCommand, NodeSpec};
use crate::ui::theme;

/// Ancestor data: node kind → that ancestor's key column value
pub type Scope = HashMap<String, String>;

/// Shared handles every tree source needs
pub struct TreeContext {
    pub registry: Rc<Registry>,
    pub pool: Rc<RefCell<ConnectionPool>>,
}

/// Build the forest root spec for one configured server
pub fn server_root(
    ctx: &Rc<TreeContext>,
    name: &str,
    cfg: &ServerConfig,
) -> ConfigResult<NodeSpec> {
    let driver = ctx.registry.driver(&cfg.driver)?;
    let display = format!("{} <{}:{}>", driver.name, cfg.host, cfg.port);
    let mut scope = Scope::new();
    scope.insert(driver.root.clone(), name.to_string());
    build_node(ctx, driver, name, &driver.root, display, scope)
        .map_err(|e| crate::error::ConfigError::Invalid(e.to_string()))
}

/// Child source driven by a node definition
pub struct DriverSource {
    ctx: Rc<TreeContext>,
    driver_key: String,
    /// Server profile name, for connection resolution
    server: String,
    /// Node kind whose children this source produces
    def_key: String,
    scope: Scope,
}

impl ChildSource for DriverSource {
    fn fetch(&self, _indexing: bool) -> Result<Vec<NodeSpec>, DbError> {
        let driver = self.driver()?;
        let def = driver
            .node(&self.def_key)
            .map_err(|e| DbError::Driver(e.to_string()))?;

        let mut specs = Vec::new();

        if let Some(cq) = &def.children {
            let sql = query::substitute_scope(&cq.query, &self.scope)?;
            let target = conn_target(&self.server, &self.scope, cq.conn)?;
            let results = self.ctx.pool.borrow_mut().execute(&target, &sql)?;
            for row in &results.rows {
                let cells: Vec<String> =
                    row.values.iter().map(|v| v.display_string(1000)).collect();
                let key_value = cells.first().cloned().unwrap_or_default();
                let display = cells.get(1).cloned().unwrap_or_else(|| key_value.clone());
                let mut scope = self.scope.clone();
                scope.insert(cq.node.clone(), key_value);
                specs.push(build_node(
                    &self.ctx,
                    driver,
                    &self.server,
                    &cq.node,
                    display,
                    scope,
                )?);
            }
        }

        for sc in &def.children_static {
            let mut scope = self.scope.clone();
            scope.insert(sc.node.clone(), sc.label.clone());
            specs.push(build_node(
                &self.ctx,
                driver,
                &self.server,
                &sc.node,
                sc.label.clone(),
                scope,
            )?);
        }

        for extra in &def.extra_children {
            let sql = query::substitute_scope(&extra.query, &self.scope)?;
            let conn = conn_target(&self.server, &self.scope, extra.conn)?;
            specs.push(NodeSpec::leaf(
                Label::styled(theme::button_style(), extra.label.clone()),
                NodeCommand::RunQuery {
                    title: extra.tab.clone(),
                    conn,
                    sql,
                    refresh_tag: Some(extra.conn.tag().to_string()),
                },
            ));
        }

        Ok(specs)
    }
}

impl DriverSource {
    fn driver(&self) -> Result<&DriverSpec, DbError> {
        self.ctx
            .registry
            .driver(&self.driver_key)
            .map_err(|e| DbError::Driver(e.to_string()))
    }
}

/// Assemble the spec for one node of kind `kind` with `scope` already
/// including its own entry
fn build_node(
    ctx: &Rc<TreeContext>,
    driver: &DriverSpec,
    server: &str,
    kind: &str,
    display: String,
    scope: Scope,
) -> Result<NodeSpec, DbError> {
    let def = driver.node(kind).map_err(|e| DbError::Driver(e.to_string()))?;

    let label = Label::styled(theme::color_style(def.color.as_deref()), display);
    let mut spec = NodeSpec::branch(label)
        .with_tag(kind)
        .with_auto_open(def.auto_open);

    if def.has_children() {
        spec = spec.with_source(Box::new(DriverSource {
            ctx: ctx.clone(),
            driver_key: driver.key.clone(),
            server: server.to_string(),
            def_key: kind.to_string(),
            scope: scope.clone(),
        }));
    }

    let mut actions = Vec::new();
    for a in &def.actions {
        actions.push(NamedCommand {
            name: a.name.clone(),
            command: run_command(server, &scope, a.name.clone(), a.conn, &a.query)?,
        });
    }
    for s in ctx.registry.scripts_for(&driver.key, kind, &scope) {
        actions.push(NamedCommand {
            name: format!("[Script] {}", s.name),
            command: run_command(server, &scope, s.name.clone(), s.conn, &s.query)?,
        });
    }
    spec.actions = actions;

    if let Some(ot) = &def.open_tab {
        spec.open_tab = Some(NodeCommand::OpenTab {
            conn: conn_target(server, &scope, ot.conn)?,
            sql: query::substitute_scope(&ot.query, &scope)?,
        });
    }

    Ok(spec)
}

fn run_command(
    server: &str,
    scope: &Scope,
    title: String,
    cs: ConnScope,
    sql: &str,
) -> Result<NodeCommand, DbError> {
    Ok(NodeCommand::RunQuery {
        title,
        conn: conn_target(server, scope, cs)?,
        sql: query::substitute_scope(sql, scope)?,
        refresh_tag: Some(cs.tag().to_string()),
    })
}

/// Resolve a connection scope against the ancestor data
fn conn_target(server: &str, scope: &Scope, cs: ConnScope) -> Result<ConnTarget, DbError> {
    match cs {
        ConnScope::Server => Ok(ConnTarget {
            server: server.to_string(),
            database: None,
        }),
        ConnScope::Database => {
            let db = scope.get("database").ok_or_else(|| {
                DbError::Driver("database-scoped query with no database ancestor".to_string())
            })?;
            Ok(ConnTarget {
                server: server.to_string(),
                database: Some(db.clone()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::drivers::load_drivers;
    use crate::tree::NodeKind;
    use std::path::Path;

    fn context() -> (Rc<TreeContext>, tokio::runtime::Runtime) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let drivers = load_drivers(Path::new("/nonexistent")).unwrap();
        let registry = Rc::new(Registry::from_parts(drivers, Vec::new()));
        let pool = Rc::new(RefCell::new(ConnectionPool::new(
            rt.handle().clone(),
            Vec::new(),
        )));
        (Rc::new(TreeContext { registry, pool }), rt)
    }

    fn server_cfg() -> ServerConfig {
        ServerConfig {
            driver: "postgres".to_string(),
            host: "db.example.com".to_string(),
            port: 5432,
            user: "app".to_string(),
            password: None,
            database: None,
            ssl_mode: crate::config::servers::SslMode::Disable,
        }
    }

    #[test]
    fn test_server_root_label_and_tag() {
        let (ctx, _rt) = context();
        let spec = server_root(&ctx, "prod", &server_cfg()).unwrap();
        assert_eq!(spec.label.plain_text(), "PostgreSQL <db.example.com:5432>");
        assert_eq!(spec.tag.as_deref(), Some("server"));
        assert_eq!(spec.kind, NodeKind::Branch);
        assert!(spec.source.is_some());
        assert_eq!(spec.actions.len(), 1); // Activity
    }

    #[test]
    fn test_table_node_resolves_actions_and_buttons() {
        let (ctx, _rt) = context();
        let driver = ctx.registry.driver("postgres").unwrap();
        let scope: Scope = [
            ("server", "prod"),
            ("database", "shop"),
            ("schema", "public"),
            ("table", "users"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let spec = build_node(
            &ctx,
            driver,
            "prod",
            "table",
            "users".to_string(),
            scope.clone(),
        )
        .unwrap();

        // actions carry fully scoped sql against the right connection
        let count = spec
            .actions
            .iter()
            .find(|a| a.name == "Count rows")
            .unwrap();
        match &count.command {
            NodeCommand::RunQuery {
                conn, sql, refresh_tag, ..
            } => {
                assert_eq!(conn.database.as_deref(), Some("shop"));
                assert_eq!(sql, "SELECT count(*) FROM \"public\".\"users\"");
                assert_eq!(refresh_tag.as_deref(), Some("database"));
            }
            other => panic!("unexpected command {other:?}"),
        }

        // the open-tab query is scoped too
        match spec.open_tab.as_ref().unwrap() {
            NodeCommand::OpenTab { conn, sql } => {
                assert_eq!(conn.server, "prod");
                assert_eq!(sql, "SELECT * FROM \"public\".\"users\" LIMIT 100");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_extra_children_become_leaf_buttons() {
        let (ctx, _rt) = context();
        let scope: Scope = [("database", "shop"), ("schema", "public"), ("table", "t")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let source = DriverSource {
            ctx: ctx.clone(),
            driver_key: "postgres".to_string(),
            server: "prod".to_string(),
            def_key: "table".to_string(),
            scope,
        };

        // the children query would hit the database; but the table def's
        // buttons alone can be checked through a definition with no
        // children query
        let driver = ctx.registry.driver("postgres").unwrap();
        let def = driver.node("table").unwrap();
        assert_eq!(def.extra_children.len(), 1);
        let extra = &def.extra_children[0];
        let sql = query::substitute_scope(&extra.query, &source.scope).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM \"public\".\"t\" LIMIT ${limit:number}"
        );
    }

    #[test]
    fn test_database_scope_requires_ancestor() {
        let scope = Scope::new();
        assert!(matches!(
            conn_target("prod", &scope, ConnScope::Database),
            Err(DbError::Driver(_))
        ));
        assert!(conn_target("prod", &scope, ConnScope::Server).is_ok());
    }
}
