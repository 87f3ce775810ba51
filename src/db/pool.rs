//! Connection pool: the synchronous facade over the async backend
//!
//! The UI loop is single-threaded and expects expansion and execution to
//! block until complete. The pool owns a handle to the tokio runtime that
//! drives tokio-postgres, keeps one connection per [`ConnTarget`], and
//! replays a query once after reconnecting when the cached connection
//! turns out to be dead.

use std::collections::HashMap;

use crate::config::servers::ServerConfig;
use crate::db::postgres::PostgresConnection;
use crate::db::types::QueryResults;
use crate::error::{DbError, DbResult};
use crate::tree::ConnTarget;

pub struct ConnectionPool {
    handle: tokio::runtime::Handle,
    servers: HashMap<String, ServerConfig>,
    conns: HashMap<ConnTarget, PostgresConnection>,
}

impl ConnectionPool {
    pub fn new(handle: tokio::runtime::Handle, servers: Vec<(String, ServerConfig)>) -> Self {
        Self {
            handle,
            servers: servers.into_iter().collect(),
            conns: HashMap::new(),
        }
    }

    pub fn server(&self, name: &str) -> DbResult<&ServerConfig> {
        self.servers
            .get(name)
            .ok_or_else(|| DbError::UnknownServer(name.to_string()))
    }

    /// Execute `sql` on the connection identified by `target`, opening it
    /// on first use. Blocks the caller until the query completes.
    pub fn execute(&mut self, target: &ConnTarget, sql: &str) -> DbResult<QueryResults> {
        tracing::debug!(server = %target.server, db = ?target.database, "execute: {sql}");

        if self.conns.get(target).is_some_and(|c| c.is_closed()) {
            self.conns.remove(target);
        }
        if !self.conns.contains_key(target) {
            let conn = self.connect(target)?;
            self.conns.insert(target.clone(), conn);
        }

        let Some(conn) = self.conns.get(target) else {
            return Err(DbError::ConnectionFailed("connection vanished".to_string()));
        };
        match self.handle.block_on(conn.execute_query(sql)) {
            Ok(results) => Ok(results),
            Err(e) if conn.is_closed() => {
                // server went away under us: reconnect once and retry
                tracing::info!(server = %target.server, "reconnecting after: {e}");
                let fresh = self.connect(target)?;
                let retried = self.handle.block_on(fresh.execute_query(sql));
                self.conns.insert(target.clone(), fresh);
                retried
            }
            Err(e) => Err(e),
        }
    }

    /// Drop every cached connection (e.g. before shutdown)
    pub fn disconnect_all(&mut self) {
        self.conns.clear();
    }

    fn connect(&self, target: &ConnTarget) -> DbResult<PostgresConnection> {
        let cfg = self.server(&target.server)?;
        let database = database_for(target, cfg);
        tracing::info!(server = %target.server, %database, "opening connection");
        self.handle
            .block_on(PostgresConnection::connect(cfg, database))
    }
}

/// The database a target resolves to: the named one, else the server's
/// maintenance database
fn database_for<'a>(target: &'a ConnTarget, cfg: &'a ServerConfig) -> &'a str {
    target.database.as_deref().unwrap_or(cfg.maintenance_db())
}
