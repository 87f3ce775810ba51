//! Error types for arbordb
//!
//! This module defines the error hierarchy used throughout the application.
//! We use `thiserror` for library-style errors with clear error chains.

use std::io;

/// Main error type for the arbordb application
#[derive(Debug, thiserror::Error)]
pub enum ArborError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Terminal/UI errors
    #[error("Terminal error: {0}")]
    Terminal(String),
}

/// Database operation errors
///
/// Also carried by tree child sources: expanding a node runs a query, so a
/// failed expansion surfaces as a `DbError` to the caller of `open`/`refresh`.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Failed to establish connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// No server with the given name is configured
    #[error("Unknown server '{0}'")]
    UnknownServer(String),

    /// Driver definition referenced a node kind that does not exist
    #[error("Driver definition error: {0}")]
    Driver(String),

    /// Query template substitution failed
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
}

/// Configuration loading/parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Home directory not found
    #[error("Could not determine home directory")]
    NoHomeDir,

    /// Failed to read a configuration file
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// A server references a driver that is not defined
    #[error("Driver '{0}' not found")]
    DriverNotFound(String),
}

/// Query template substitution errors
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// A `#{key}` placeholder has no value in the surrounding scope
    #[error("No value for placeholder '{0}'")]
    MissingValue(String),

    /// A `:number` placeholder value is not numeric
    #[error("'{0}' is not a number")]
    InvalidNumber(String),
}

/// Specialized Result type for arbordb operations
pub type Result<T> = std::result::Result<T, ArborError>;

/// Specialized Result type for database operations
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Specialized Result type for config operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
