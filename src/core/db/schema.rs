/// Schema Introspection Module
///
/// Resolves a table's ordered column names through the dialect's
/// schema-description query. The executor uses this to label result sets
/// whose cursor carried no column names.

use super::connection::{Dialect, Session};
use crate::core::{BridgeError, Result, SqlValue};
use tracing::{debug, error};

/// Returns the description statement and the position of the column name in
/// each of its rows.
fn describe_statement(dialect: Dialect, table: &str) -> (String, usize) {
    match dialect {
        Dialect::Sqlite => (format!("PRAGMA table_info('{}')", table.replace('\'', "''")), 1),
        Dialect::MySql => (format!("DESCRIBE {}", table), 0),
    }
}

fn describe<S: Session + ?Sized>(session: &mut S, table: &str) -> Result<Vec<String>> {
    let (sql, name_index) = describe_statement(session.dialect(), table);
    let raw = match session.query(&sql, &[]) {
        Ok(raw) => raw,
        Err(e) => {
            error!("Failed to describe table {}: {}", table, e);
            let _ = session.rollback();
            return Err(e);
        }
    };

    raw.rows
        .into_iter()
        .map(|row| match row.into_iter().nth(name_index) {
            Some(SqlValue::Text(name)) => Ok(name),
            other => Err(BridgeError::Schema(format!(
                "unexpected column name {:?} in description of '{}'",
                other, table
            ))),
        })
        .collect()
}

/// Returns the column names of `table` in declaration order.
///
/// # Errors
///
/// `BridgeError::Schema` if the table has no columns (usually: it does not
/// exist), or any error the session reports while describing it.
pub fn table_columns<S: Session + ?Sized>(session: &mut S, table: &str) -> Result<Vec<String>> {
    let columns = describe(session, table)?;
    if columns.is_empty() {
        return Err(BridgeError::Schema(format!(
            "table '{}' has no columns or does not exist",
            table
        )));
    }
    debug!("Table {} columns: {:?}", table, columns);
    Ok(columns)
}

/// Whether `table` exists and has at least one column.
pub fn table_exists<S: Session + ?Sized>(session: &mut S, table: &str) -> Result<bool> {
    Ok(!describe(session, table)?.is_empty())
}
