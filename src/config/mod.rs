//! Configuration management
//!
//! Servers, driver definitions, scripts and settings, all loaded once at
//! startup. The result is an immutable [`Registry`] handed to the layers
//! that need it — nothing below this module re-reads configuration.

pub mod drivers;
pub mod scripts;
pub mod servers;
pub mod settings;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use drivers::{ConnScope, DriverSpec, NodeDef};
pub use scripts::ScriptDef;
pub use servers::{ServerConfig, SslMode};
pub use settings::Settings;

use crate::error::{ConfigError, ConfigResult};

/// Process-wide immutable configuration: drivers and scripts
#[derive(Debug)]
pub struct Registry {
    drivers: HashMap<String, DriverSpec>,
    scripts: Vec<ScriptDef>,
}

impl Registry {
    /// Load drivers (embedded defaults + user files) and scripts
    pub fn load(config_dir: &Path) -> ConfigResult<Self> {
        Ok(Self {
            drivers: drivers::load_drivers(config_dir)?,
            scripts: scripts::load_scripts(config_dir)?,
        })
    }

    /// Build a registry from parts (tests, embedded-only setups)
    pub fn from_parts(drivers: HashMap<String, DriverSpec>, scripts: Vec<ScriptDef>) -> Self {
        Self { drivers, scripts }
    }

    pub fn driver(&self, key: &str) -> ConfigResult<&DriverSpec> {
        self.drivers
            .get(key)
            .ok_or_else(|| ConfigError::DriverNotFound(key.to_string()))
    }

    /// Scripts applying to a node of `node_type` under `scope`
    pub fn scripts_for(
        &self,
        driver: &str,
        node_type: &str,
        scope: &HashMap<String, String>,
    ) -> Vec<&ScriptDef> {
        self.scripts
            .iter()
            .filter(|s| s.matches(driver, node_type, scope))
            .collect()
    }
}

/// Resolve the configuration directory (`~/.arbordb` unless overridden)
pub fn config_dir(override_dir: Option<PathBuf>) -> ConfigResult<PathBuf> {
    match override_dir {
        Some(dir) => Ok(dir),
        None => {
            let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
            Ok(home.join(".arbordb"))
        }
    }
}
