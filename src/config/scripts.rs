//! User scripts
//!
//! Scripts are saved queries that attach to tree nodes by driver, node kind
//! and optional ancestor conditions. They surface in the node's actions
//! menu as `[Script] <name>`. Loaded once at startup from
//! `<config>/scripts/*.toml`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::config::drivers::ConnScope;
use crate::error::{ConfigError, ConfigResult};

/// One script definition
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptDef {
    pub name: String,

    /// Driver keys this script applies to
    pub drivers: Vec<String>,

    /// Node kind the script attaches to
    pub node_type: String,

    /// Ancestor conditions: node kind → required key value
    #[serde(default)]
    pub conditions: HashMap<String, String>,

    pub conn: ConnScope,

    pub query: String,
}

impl ScriptDef {
    /// Whether this script applies to a node of `node_type` under `scope`
    pub fn matches(&self, driver: &str, node_type: &str, scope: &HashMap<String, String>) -> bool {
        if !self.drivers.iter().any(|d| d == driver) {
            return false;
        }
        if self.node_type != node_type {
            return false;
        }
        self.conditions
            .iter()
            .all(|(kind, value)| scope.get(kind).is_some_and(|v| v == value))
    }
}

#[derive(Debug, Deserialize)]
struct ScriptFile {
    script: ScriptDef,
}

/// Load every script under `<config_dir>/scripts/`, sorted by file name
pub fn load_scripts(config_dir: &Path) -> ConfigResult<Vec<ScriptDef>> {
    let dir = config_dir.join("scripts");
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<_> = std::fs::read_dir(&dir)
        .map_err(|e| ConfigError::Read {
            path: dir.display().to_string(),
            source: e,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    let mut scripts = Vec::new();
    for path in paths {
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let file: ScriptFile = toml::from_str(&text)?;
        scripts.push(file.script);
    }
    Ok(scripts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> ScriptDef {
        let text = r#"
            [script]
            name = "Bloat check"
            drivers = ["postgres"]
            node_type = "table"
            conditions = { schema = "public" }
            conn = "database"
            query = "SELECT 1"
        "#;
        let file: ScriptFile = toml::from_str(text).unwrap();
        file.script
    }

    fn scope(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_script_matches_driver_node_and_conditions() {
        let s = script();
        let ok = scope(&[("schema", "public"), ("table", "users")]);
        assert!(s.matches("postgres", "table", &ok));
    }

    #[test]
    fn test_script_rejects_wrong_driver_or_node() {
        let s = script();
        let ok = scope(&[("schema", "public")]);
        assert!(!s.matches("mysql", "table", &ok));
        assert!(!s.matches("postgres", "schema", &ok));
    }

    #[test]
    fn test_script_rejects_unmet_condition() {
        let s = script();
        assert!(!s.matches("postgres", "table", &scope(&[("schema", "internal")])));
        // condition key absent from scope
        assert!(!s.matches("postgres", "table", &scope(&[("table", "users")])));
    }
}
