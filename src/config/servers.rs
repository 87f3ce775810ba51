//! Server profiles
//!
//! Named connection entries loaded from `<config>/servers.toml`. Each entry
//! becomes one forest root in the tree panel.

use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

/// One `[servers.<name>]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Driver key (e.g. `postgres`)
    pub driver: String,

    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub user: String,

    #[serde(default)]
    pub password: Option<String>,

    /// Maintenance database for server-scoped connections
    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub ssl_mode: SslMode,
}

/// SSL connection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    Disable,
    #[default]
    Prefer,
    Require,
}

fn default_port() -> u16 {
    5432
}

impl ServerConfig {
    /// Build a PostgreSQL connection string for `database` (without password)
    pub fn connection_string(&self, database: &str) -> String {
        format!(
            "host={} port={} dbname={} user={}",
            self.host, self.port, database, self.user
        )
    }

    /// Full connection string including ssl mode and password
    pub fn connection_string_with_password(&self, database: &str) -> String {
        let with_ssl = format!(
            "{} sslmode={}",
            self.connection_string(database),
            match self.ssl_mode {
                SslMode::Disable => "disable",
                SslMode::Prefer => "prefer",
                SslMode::Require => "require",
            }
        );
        match &self.password {
            Some(pw) => format!("{} password={}", with_ssl, pw),
            None => with_ssl,
        }
    }

    /// Database used for server-scoped connections
    pub fn maintenance_db(&self) -> &str {
        self.database.as_deref().unwrap_or("postgres")
    }
}

#[derive(Debug, Deserialize)]
struct ServersFile {
    #[serde(default)]
    servers: std::collections::HashMap<String, ServerConfig>,
}

/// Load all server profiles, ordered by name for a stable tree layout.
/// A missing file is an empty profile list, not an error.
pub fn load_servers(config_dir: &Path) -> ConfigResult<Vec<(String, ServerConfig)>> {
    let path = config_dir.join("servers.toml");
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    let file: ServersFile = toml::from_str(&content)?;
    let mut servers: Vec<(String, ServerConfig)> = file.servers.into_iter().collect();
    servers.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(servers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ServerConfig {
        ServerConfig {
            driver: "postgres".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            user: "app".to_string(),
            password: Some("secret".to_string()),
            database: None,
            ssl_mode: SslMode::Disable,
        }
    }

    #[test]
    fn test_connection_string() {
        assert_eq!(
            sample().connection_string("mydb"),
            "host=localhost port=5432 dbname=mydb user=app"
        );
    }

    #[test]
    fn test_connection_string_with_password() {
        assert_eq!(
            sample().connection_string_with_password("mydb"),
            "host=localhost port=5432 dbname=mydb user=app sslmode=disable password=secret"
        );
    }

    #[test]
    fn test_maintenance_db_defaults_to_postgres() {
        let mut cfg = sample();
        assert_eq!(cfg.maintenance_db(), "postgres");
        cfg.database = Some("admin".to_string());
        assert_eq!(cfg.maintenance_db(), "admin");
    }

    #[test]
    fn test_parse_servers_file() {
        let text = r#"
            [servers.local]
            driver = "postgres"
            host = "localhost"
            user = "postgres"

            [servers.staging]
            driver = "postgres"
            host = "db.staging.internal"
            port = 6432
            user = "deploy"
            ssl_mode = "require"
        "#;
        let file: ServersFile = toml::from_str(text).unwrap();
        assert_eq!(file.servers.len(), 2);
        let staging = &file.servers["staging"];
        assert_eq!(staging.port, 6432);
        assert_eq!(staging.ssl_mode, SslMode::Require);
        let local = &file.servers["local"];
        assert_eq!(local.port, 5432);
        assert_eq!(local.ssl_mode, SslMode::Prefer);
    }
}
