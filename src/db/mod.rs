//! Database layer
//!
//! The async PostgreSQL backend, the synchronous connection pool the UI
//! calls into, result value types, and the browser module that turns
//! driver definitions into tree child sources.

pub mod browser;
pub mod pool;
pub mod postgres;
pub mod types;

pub use browser::{DriverSource, Scope, TreeContext, server_root};
pub use pool::ConnectionPool;
pub use types::{CellValue, ColumnDef, DataType, QueryResults, Row};
