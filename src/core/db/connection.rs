/// Connection Management Module
///
/// This module provides the session boundary (`Session`), its SQLite
/// implementation, and the connect/close lifecycle.
///
/// Library operations borrow a session and never close it; the owner closes
/// it exactly once with [`close`] (or by dropping it).

use crate::config::{DatabaseConfig, SqliteConfig};
use crate::core::{BridgeError, Result, SqlValue};
use rusqlite::{params_from_iter, Connection};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// SQL dialect spoken by a session; selects the schema-description query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    MySql,
}

/// Rows fetched by a session before they are turned into a `Frame`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRows {
    /// Column labels, or `None` when the backend's cursor yields bare tuples
    pub columns: Option<Vec<String>>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl RawRows {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A live database session.
///
/// Mutations run inside a client-side transaction which stays open until
/// [`Session::commit`] or [`Session::rollback`]. Reads do not open one.
pub trait Session {
    fn dialect(&self) -> Dialect;

    fn is_alive(&self) -> bool;

    /// Whether a transaction is open. The engine may end one on its own,
    /// e.g. when a trigger raises ROLLBACK.
    fn in_transaction(&self) -> bool;

    /// Runs a read statement. Statement and cursor resources are released
    /// before this returns.
    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<RawRows>;

    /// Runs a write statement and returns the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<usize>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// Releases the session. Idempotent and infallible.
    fn close(&mut self);
}

/// A session backed by a `rusqlite::Connection`.
#[derive(Debug)]
pub struct SqliteSession {
    /// Active connection (None once closed)
    connection: Option<Connection>,
    /// Path to the database file (None for in-memory databases)
    path: Option<String>,
}

impl SqliteSession {
    /// Wraps an already opened connection.
    pub fn from_connection(connection: Connection) -> Self {
        let path = connection
            .path()
            .filter(|p| !p.is_empty())
            .map(|p| p.to_string());
        SqliteSession {
            connection: Some(connection),
            path,
        }
    }

    /// Path of the database file, `None` for in-memory databases.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Borrows the underlying connection, e.g. for schema setup.
    pub fn connection(&self) -> Result<&Connection> {
        self.connection
            .as_ref()
            .ok_or_else(|| BridgeError::Connection("session is closed".to_string()))
    }

    /// Runs one or more statements without parameters or results (DDL).
    pub fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.connection()?
            .execute_batch(sql)
            .map_err(|e| BridgeError::execution("Batch execution", e))
    }

    fn apply_pragmas(&self, settings: &SqliteConfig) -> Result<()> {
        let conn = self.connection()?;
        if let Some(on) = settings.foreign_keys {
            conn.pragma_update(None, "foreign_keys", on)
                .map_err(|e| BridgeError::Connection(format!("PRAGMA foreign_keys failed: {}", e)))?;
        }
        if let Some(mode) = &settings.journal_mode {
            let applied: String = conn
                .pragma_update_and_check(None, "journal_mode", mode, |row| row.get(0))
                .map_err(|e| BridgeError::Connection(format!("PRAGMA journal_mode failed: {}", e)))?;
            debug!("journal_mode requested {}, engine reports {}", mode, applied);
        }
        if let Some(ms) = settings.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(u64::from(ms)))
                .map_err(|e| BridgeError::Connection(format!("busy_timeout failed: {}", e)))?;
        }
        Ok(())
    }
}

impl Session for SqliteSession {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn is_alive(&self) -> bool {
        self.connection.is_some()
    }

    fn in_transaction(&self) -> bool {
        self.connection
            .as_ref()
            .map(|c| !c.is_autocommit())
            .unwrap_or(false)
    }

    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<RawRows> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| BridgeError::execution("Statement preparation", e))?;

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let column_count = stmt.column_count();

        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                let mut values = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    values.push(SqlValue::from(row.get_ref(i)?));
                }
                Ok(values)
            })
            .map_err(|e| BridgeError::execution("Query execution", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| BridgeError::execution("Result processing", e))?;

        Ok(RawRows {
            columns: Some(columns),
            rows,
        })
    }

    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<usize> {
        let conn = self.connection()?;
        if conn.is_autocommit() {
            conn.execute_batch("BEGIN")
                .map_err(|e| BridgeError::execution("BEGIN", e))?;
        }
        conn.execute(sql, params_from_iter(params.iter()))
            .map_err(|e| BridgeError::execution("Statement execution", e))
    }

    fn commit(&mut self) -> Result<()> {
        let conn = self.connection()?;
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")
                .map_err(|e| BridgeError::execution("Commit", e))?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let conn = self.connection()?;
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK")
                .map_err(|e| BridgeError::execution("Rollback", e))?;
        }
        Ok(())
    }

    fn close(&mut self) {
        let Some(conn) = self.connection.take() else {
            return;
        };
        if !conn.is_autocommit() {
            warn!("Closing connection with an open transaction; uncommitted changes are discarded");
        }
        match conn.close() {
            Ok(()) => info!("Connection closed"),
            Err((_, e)) => warn!("Error while closing connection: {}", e),
        }
    }
}

/// Opens a SQLite session described by `config`.
///
/// # Errors
///
/// Returns `BridgeError::Connection` if the database cannot be opened or a
/// configured pragma cannot be applied.
///
/// # Examples
///
/// ```
/// use rowbridge::config::DatabaseConfig;
/// use rowbridge::core::db::{close, connect, Session};
///
/// let mut session = connect(&DatabaseConfig::sqlite(":memory:")).unwrap();
/// assert!(session.is_alive());
/// close(&mut session);
/// ```
pub fn connect(config: &DatabaseConfig) -> Result<SqliteSession> {
    if config.host.is_some() || config.user.is_some() || config.password.is_some() {
        debug!("host/user/password settings are not used by the SQLite backend");
    }

    let conn = Connection::open(&config.database).map_err(|e| {
        error!("Failed to connect to database {}: {}", config.database, e);
        BridgeError::Connection(format!("cannot open '{}': {}", config.database, e))
    })?;

    let session = SqliteSession::from_connection(conn);
    session.apply_pragmas(&config.sqlite)?;

    info!("Connected to database {}", config.database);
    Ok(session)
}

/// Opens a private in-memory SQLite session.
pub fn connect_in_memory() -> Result<SqliteSession> {
    connect(&DatabaseConfig::sqlite(":memory:"))
}

/// Closes `session`; a no-op if it is already closed.
pub fn close<S: Session + ?Sized>(session: &mut S) {
    session.close();
}
