//! Driver definitions
//!
//! A driver is a TOML description of one database dialect's browse
//! hierarchy: which node kinds exist, the query that produces each kind's
//! children, and the actions a node offers. Definitions are parsed once at
//! startup into typed specs — expansion never re-reads configuration.
//!
//! A PostgreSQL driver ships embedded; files in `<config>/drivers/` are
//! loaded on top and may override it by key.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

/// The embedded default driver
const POSTGRES_DRIVER: &str = include_str!("../../config/drivers/postgres.toml");

/// Which cached connection a query runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnScope {
    /// The server-level connection (maintenance database)
    Server,
    /// The connection to the database named by the nearest `database`
    /// ancestor
    Database,
}

impl ConnScope {
    /// The node kind an ancestor walk resolves this scope against
    pub fn tag(self) -> &'static str {
        match self {
            ConnScope::Server => "server",
            ConnScope::Database => "database",
        }
    }
}

/// Children produced by a query
#[derive(Debug, Clone, Deserialize)]
pub struct ChildQuery {
    pub conn: ConnScope,
    pub query: String,
    /// Node kind of the produced children
    pub node: String,
}

/// A statically declared child
#[derive(Debug, Clone, Deserialize)]
pub struct StaticChild {
    pub node: String,
    pub label: String,
}

/// An always-present leaf appended after the queried children
#[derive(Debug, Clone, Deserialize)]
pub struct ExtraChild {
    pub label: String,
    /// Results tab title
    pub tab: String,
    pub conn: ConnScope,
    pub query: String,
}

/// An entry in a node's actions menu
#[derive(Debug, Clone, Deserialize)]
pub struct ActionDef {
    pub name: String,
    pub conn: ConnScope,
    pub query: String,
}

/// Query tab opened from a node with the `o` key
#[derive(Debug, Clone, Deserialize)]
pub struct OpenTabDef {
    pub conn: ConnScope,
    #[serde(default)]
    pub query: String,
}

/// One node kind of a driver's hierarchy
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeDef {
    /// Label color name (resolved by the theme)
    #[serde(default)]
    pub color: Option<String>,

    /// Queried children
    #[serde(default)]
    pub children: Option<ChildQuery>,

    /// Static children, materialized without touching the database
    #[serde(default)]
    pub children_static: Vec<StaticChild>,

    /// Leaf buttons appended after the children
    #[serde(default)]
    pub extra_children: Vec<ExtraChild>,

    /// Actions menu entries
    #[serde(default)]
    pub actions: Vec<ActionDef>,

    /// Tab opened by the "open connection" key
    #[serde(default)]
    pub open_tab: Option<OpenTabDef>,

    /// Expand this node as soon as it is materialized
    #[serde(default)]
    pub auto_open: bool,
}

impl NodeDef {
    /// Whether nodes of this kind can produce children at all
    pub fn has_children(&self) -> bool {
        self.children.is_some() || !self.children_static.is_empty() || !self.extra_children.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct DriverMeta {
    key: String,
    name: String,
    root: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DriverFile {
    driver: DriverMeta,
    #[serde(default)]
    node: HashMap<String, NodeDef>,
}

/// A fully parsed driver definition
#[derive(Debug, Clone)]
pub struct DriverSpec {
    /// Key servers reference in `driver = "..."`
    pub key: String,
    /// Human-readable name, shown in root labels
    pub name: String,
    /// Node kind of the forest roots
    pub root: String,
    pub nodes: HashMap<String, NodeDef>,
}

impl DriverSpec {
    fn parse(text: &str) -> ConfigResult<Self> {
        let file: DriverFile = toml::from_str(text)?;
        let spec = Self {
            key: file.driver.key,
            name: file.driver.name,
            root: file.driver.root,
            nodes: file.node,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Reject definitions whose node references dangle
    fn validate(&self) -> ConfigResult<()> {
        let check = |kind: &str| -> ConfigResult<()> {
            if self.nodes.contains_key(kind) {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!(
                    "driver '{}' references undefined node kind '{}'",
                    self.key, kind
                )))
            }
        };
        check(&self.root)?;
        for def in self.nodes.values() {
            if let Some(cq) = &def.children {
                check(&cq.node)?;
            }
            for sc in &def.children_static {
                check(&sc.node)?;
            }
        }
        Ok(())
    }

    pub fn node(&self, kind: &str) -> ConfigResult<&NodeDef> {
        self.nodes.get(kind).ok_or_else(|| {
            ConfigError::Invalid(format!("driver '{}' has no node kind '{}'", self.key, kind))
        })
    }
}

/// Load the embedded driver plus any files under `<config_dir>/drivers/`
pub fn load_drivers(config_dir: &Path) -> ConfigResult<HashMap<String, DriverSpec>> {
    let mut drivers = HashMap::new();
    let builtin = DriverSpec::parse(POSTGRES_DRIVER)?;
    drivers.insert(builtin.key.clone(), builtin);

    let dir = config_dir.join("drivers");
    if dir.is_dir() {
        let mut paths: Vec<_> = std::fs::read_dir(&dir)
            .map_err(|e| ConfigError::Read {
                path: dir.display().to_string(),
                source: e,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();
        for path in paths {
            let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
                path: path.display().to_string(),
                source: e,
            })?;
            let spec = DriverSpec::parse(&text)?;
            drivers.insert(spec.key.clone(), spec);
        }
    }
    Ok(drivers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_postgres_driver_parses() {
        let spec = DriverSpec::parse(POSTGRES_DRIVER).unwrap();
        assert_eq!(spec.key, "postgres");
        assert_eq!(spec.root, "server");
        assert!(spec.nodes.contains_key("server"));
        assert!(spec.nodes.contains_key("database"));
        assert!(spec.nodes.contains_key("table"));
    }

    #[test]
    fn test_embedded_driver_hierarchy_links() {
        let spec = DriverSpec::parse(POSTGRES_DRIVER).unwrap();
        let server = spec.node("server").unwrap();
        let children = server.children.as_ref().unwrap();
        assert_eq!(children.node, "database");
        assert_eq!(children.conn, ConnScope::Server);

        let table = spec.node("table").unwrap();
        assert!(!table.extra_children.is_empty());
        assert!(table.open_tab.is_some());
    }

    #[test]
    fn test_dangling_node_reference_rejected() {
        let text = r#"
            [driver]
            key = "broken"
            name = "Broken"
            root = "server"

            [node.server]
            children = { conn = "server", query = "SELECT 1", node = "missing" }
        "#;
        assert!(matches!(
            DriverSpec::parse(text),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_unknown_conn_scope_rejected() {
        let text = r#"
            [driver]
            key = "broken"
            name = "Broken"
            root = "server"

            [node.server]
            children = { conn = "cluster", query = "SELECT 1", node = "server" }
        "#;
        assert!(matches!(
            DriverSpec::parse(text),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_node_without_children_keys_cannot_expand() {
        let spec = DriverSpec::parse(POSTGRES_DRIVER).unwrap();
        let column = spec.node("column").unwrap();
        assert!(!column.has_children());
    }
}
