//! arbordb - A keyboard-driven terminal browser for database schemas and
//! query results
//!
//! arbordb shows a lazily loaded tree of servers, databases, schemas,
//! tables and columns next to a tabbed query editor and a scrollable
//! results grid. The browse hierarchy is defined by TOML driver files, so
//! new object kinds and actions are configuration, not code.
//!
//! # Features
//!
//! - **Schema Tree**: Lazy expansion with diff-based refresh — reloading a
//!   node keeps the open state and loaded subtrees of unchanged children
//! - **Search**: Prefix-priority search over the indexed tree with
//!   next/previous match navigation
//! - **Results Grid**: Viewport-windowed browsing of large result sets
//!   with a movable cell cursor
//! - **Driver Definitions**: Node kinds, child queries and actions defined
//!   in TOML, with `#{scope}` and `${param}` query templates
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`tree`]: Lazy tree model, flattened projection, diff-refresh, search
//! - [`grid`]: Viewport-windowed result grid with memoized rendering
//! - [`query`]: Query template placeholders and SQL escaping
//! - [`config`]: Servers, driver definitions, scripts and settings
//! - [`db`]: PostgreSQL backend, connection pool and the tree bridge
//! - [`ui`]: ratatui widgets and frame rendering
//! - [`keymap`]: Data-driven keybindings
//! - [`app`]: Application state and event dispatch
//! - [`error`]: Error types and result aliases

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod grid;
pub mod keymap;
pub mod query;
pub mod tree;
pub mod ui;

pub use error::{ArborError, ConfigError, DbError, Result, TemplateError};
