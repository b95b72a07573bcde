//! Table-level read and write operations.
//!
//! Each function builds one statement, runs it through a [`QueryExecutor`]
//! and returns a frame or an affected-row count. The session is borrowed,
//! never closed, so one session can serve any number of calls.

use crate::core::db::{builder, ColumnFilter, FilterValues, QueryExecutor, Session, UpdateSpec};
use crate::core::{Result, SqlValue};
use crate::frame::Frame;

/// Every row of `table`.
pub fn read_all<S: Session + ?Sized>(session: &mut S, table: &str) -> Result<Frame> {
    let stmt = builder::select_all(table)?;
    QueryExecutor::new(session).run_query(&stmt)
}

/// Rows of `table` whose `column` is one of `values`.
///
/// A bare scalar is treated as a one-element list. No match yields an empty
/// frame.
pub fn read_where_in<S: Session + ?Sized>(
    session: &mut S,
    table: &str,
    column: &str,
    values: impl Into<FilterValues>,
) -> Result<Frame> {
    let stmt = builder::select_where_in(table, column, values)?;
    QueryExecutor::new(session).run_query(&stmt)
}

/// Rows of `table` matching every `column = value` pair.
///
/// # Example
///
/// ```
/// # use rowbridge::core::db::connect_in_memory;
/// # let mut session = connect_in_memory().unwrap();
/// # session.execute_batch("CREATE TABLE charging_location_details (location_id INTEGER, district TEXT);
/// #     INSERT INTO charging_location_details VALUES (3, 'Hougang');").unwrap();
/// let frame = rowbridge::db::read_where_equals(
///     &mut session,
///     "charging_location_details",
///     &["location_id", "district"],
///     (3, "Hougang"),
/// )
/// .unwrap();
/// assert_eq!(frame.len(), 1);
/// ```
pub fn read_where_equals<S: Session + ?Sized, C: AsRef<str>>(
    session: &mut S,
    table: &str,
    columns: &[C],
    values: impl Into<FilterValues>,
) -> Result<Frame> {
    let stmt = builder::select_where_equals(table, columns, values)?;
    QueryExecutor::new(session).run_query(&stmt)
}

pub fn read_where<S: Session + ?Sized>(
    session: &mut S,
    table: &str,
    filter: &ColumnFilter,
) -> Result<Frame> {
    let stmt = builder::select_where(table, filter)?;
    QueryExecutor::new(session).run_query(&stmt)
}

/// Inserts and commits one row; returns the affected row count.
pub fn insert_row<S: Session + ?Sized, C: AsRef<str>>(
    session: &mut S,
    table: &str,
    columns: &[C],
    values: Vec<SqlValue>,
) -> Result<usize> {
    let stmt = builder::insert_row(table, columns, values)?;
    QueryExecutor::new(session).run_mutation(&stmt)
}

/// Sets `update_columns` on every row matching the equality filter and
/// commits. Matching zero rows is not an error.
pub fn update_where_equals<S: Session + ?Sized, F: AsRef<str>, U: AsRef<str>>(
    session: &mut S,
    table: &str,
    filter_columns: &[F],
    filter_values: impl Into<FilterValues>,
    update_columns: &[U],
    update_values: Vec<SqlValue>,
) -> Result<usize> {
    let stmt = builder::update_where_equals(
        table,
        filter_columns,
        filter_values,
        update_columns,
        update_values,
    )?;
    QueryExecutor::new(session).run_mutation(&stmt)
}

pub fn update_where<S: Session + ?Sized>(
    session: &mut S,
    table: &str,
    filter: &ColumnFilter,
    update: &UpdateSpec,
) -> Result<usize> {
    let stmt = builder::update_where(table, filter, update)?;
    QueryExecutor::new(session).run_mutation(&stmt)
}
