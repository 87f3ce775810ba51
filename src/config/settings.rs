//! User settings and preferences
//!
//! Application settings stored in `<config>/config.toml`. Every field has a
//! default, so a missing file means default settings.

use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

/// Application settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Poll interval for the input loop, in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// tracing filter directive for the log file
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Cell text is cut to this many characters before display
    #[serde(default = "default_cell_limit")]
    pub cell_limit: usize,
}

fn default_tick_ms() -> u64 {
    100
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_cell_limit() -> usize {
    200
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            log_filter: default_log_filter(),
            cell_limit: default_cell_limit(),
        }
    }
}

/// Load settings from the config file
pub fn load_settings(config_dir: &Path) -> ConfigResult<Settings> {
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    let settings: Settings = toml::from_str(&content)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.tick_ms, 100);
        assert_eq!(s.log_filter, "info");
        assert_eq!(s.cell_limit, 200);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let s: Settings = toml::from_str("tick_ms = 50").unwrap();
        assert_eq!(s.tick_ms, 50);
        assert_eq!(s.cell_limit, 200);
    }
}
