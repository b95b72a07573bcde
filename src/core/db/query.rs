/// Query Execution Module
///
/// Runs built statements against a session and turns raw rows into frames.
/// Every failure path rolls back the session's open transaction before the
/// error is returned; statement resources never outlive a single call.

use super::builder::Statement;
use super::connection::Session;
use super::schema;
use crate::core::{BridgeError, Result, SqlValue};
use crate::frame::Frame;
use tracing::{debug, error, info, warn};

/// Represents different SQL statement types for introspection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatementType {
    /// SELECT statement
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// Other statement types
    Other,
}

impl StatementType {
    /// Determines the statement type from a SQL string
    pub fn from_sql(sql: &str) -> Self {
        let sql_upper = sql.trim_start().to_uppercase();

        if sql_upper.starts_with("SELECT") {
            StatementType::Select
        } else if sql_upper.starts_with("INSERT") {
            StatementType::Insert
        } else if sql_upper.starts_with("UPDATE") {
            StatementType::Update
        } else if sql_upper.starts_with("DELETE") {
            StatementType::Delete
        } else {
            StatementType::Other
        }
    }

    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            StatementType::Insert | StatementType::Update | StatementType::Delete
        )
    }
}

/// A row of a batch whose execution failed.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    /// Zero-based position of the row in the batch
    pub row: usize,
    pub message: String,
}

/// Result of executing one statement shape once per row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub attempted: usize,
    pub succeeded: usize,
    pub rows_affected: usize,
    pub failures: Vec<RowFailure>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Statement execution service that borrows a session
pub struct QueryExecutor<'a, S: Session + ?Sized> {
    session: &'a mut S,
}

impl<'a, S: Session + ?Sized> QueryExecutor<'a, S> {
    /// Creates a new QueryExecutor for the given session
    pub fn new(session: &'a mut S) -> Self {
        QueryExecutor { session }
    }

    fn ensure_ready(&self, stmt: &Statement) -> Result<()> {
        if !stmt.is_balanced() {
            return Err(BridgeError::Contract(format!(
                "statement has {} placeholders but {} parameters",
                stmt.placeholder_count(),
                stmt.params.len()
            )));
        }
        if !self.session.is_alive() {
            return Err(BridgeError::Connection("session is closed".to_string()));
        }
        Ok(())
    }

    /// Rolls back after a failed statement and hands the error back.
    fn abort(&mut self, stmt_sql: &str, err: BridgeError) -> BridgeError {
        error!("Error running `{}`: {}", stmt_sql, err);
        if let Err(rollback_err) = self.session.rollback() {
            warn!("Rollback after failure also failed: {}", rollback_err);
        }
        err
    }

    /// Executes a read statement and returns a labeled frame.
    ///
    /// An empty result is an empty frame, not an error, and is never sent
    /// through introspection. A non-empty result without column names is
    /// labeled with the columns of `stmt.table`.
    ///
    /// # Errors
    ///
    /// `Contract` for unbalanced statements or non-SELECT text, `Connection`
    /// for a closed session, `Execution` for engine failures and `Schema`
    /// when labels cannot be resolved.
    pub fn run_query(&mut self, stmt: &Statement) -> Result<Frame> {
        self.ensure_ready(stmt)?;
        if StatementType::from_sql(&stmt.sql) != StatementType::Select {
            return Err(BridgeError::Contract(format!("not a query: {}", stmt.sql)));
        }
        debug!("Running query `{}` with {} parameters", stmt.sql, stmt.params.len());

        let raw = match self.session.query(&stmt.sql, &stmt.params) {
            Ok(raw) => raw,
            Err(e) => return Err(self.abort(&stmt.sql, e)),
        };

        if raw.is_empty() {
            debug!("No results from {}", stmt.table);
            return Ok(raw.columns.map(|c| Frame::with_columns(c)).unwrap_or_default());
        }

        let mut frame = Frame::unlabeled(raw.rows)?;
        let labels = match raw.columns {
            Some(columns) => columns,
            None => schema::table_columns(&mut *self.session, &stmt.table)?,
        };
        frame.label(labels)?;
        Ok(frame)
    }

    /// Executes a write statement, commits, and returns the affected row count.
    pub fn run_mutation(&mut self, stmt: &Statement) -> Result<usize> {
        self.ensure_ready(stmt)?;
        if !StatementType::from_sql(&stmt.sql).is_mutation() {
            return Err(BridgeError::Contract(format!("not a mutation: {}", stmt.sql)));
        }
        debug!("Running mutation `{}` with {} parameters", stmt.sql, stmt.params.len());

        let affected = match self.session.execute(&stmt.sql, &stmt.params) {
            Ok(n) => n,
            Err(e) => return Err(self.abort(&stmt.sql, e)),
        };
        if let Err(e) = self.session.commit() {
            return Err(self.abort(&stmt.sql, e));
        }
        debug!("{} rows affected in {}", affected, stmt.table);
        Ok(affected)
    }

    /// Executes `template` once per parameter row inside one transaction.
    ///
    /// Rows that fail are logged and collected; the loop carries on and a
    /// single commit is issued at the end, so every row that succeeded is
    /// kept. If a failure makes the engine roll back the whole transaction,
    /// the rows applied before it are lost and are reported as failures too.
    ///
    /// # Errors
    ///
    /// `Contract` for non-mutation text, `Connection` for a closed session and
    /// `Execution` if the final commit fails (after rolling back).
    pub fn run_each<I>(&mut self, template: &Statement, rows: I) -> Result<BatchOutcome>
    where
        I: IntoIterator<Item = Vec<SqlValue>>,
    {
        if !StatementType::from_sql(&template.sql).is_mutation() {
            return Err(BridgeError::Contract(format!("not a mutation: {}", template.sql)));
        }
        if !self.session.is_alive() {
            return Err(BridgeError::Connection("session is closed".to_string()));
        }
        let expected = template.placeholder_count();

        let mut outcome = BatchOutcome::default();
        // (row, affected) for rows applied in the open transaction
        let mut pending: Vec<(usize, usize)> = Vec::new();
        for (row, params) in rows.into_iter().enumerate() {
            outcome.attempted += 1;
            let result = if params.len() != expected {
                Err(BridgeError::Contract(format!(
                    "row has {} values for {} placeholders",
                    params.len(),
                    expected
                )))
            } else {
                self.session.execute(&template.sql, &params)
            };

            match result {
                Ok(affected) => pending.push((row, affected)),
                Err(e) => {
                    warn!("Error executing row {}: {}", row, e);
                    if !pending.is_empty() && !self.session.in_transaction() {
                        warn!(
                            "Row {} ended the transaction; {} earlier rows were rolled back",
                            row,
                            pending.len()
                        );
                        outcome.failures.extend(pending.drain(..).map(|(lost, _)| RowFailure {
                            row: lost,
                            message: format!("rolled back when row {} failed: {}", row, e),
                        }));
                    }
                    outcome.failures.push(RowFailure {
                        row,
                        message: e.to_string(),
                    });
                }
            }
        }
        outcome.failures.sort_by_key(|f| f.row);
        outcome.succeeded = pending.len();
        outcome.rows_affected = pending.iter().map(|(_, affected)| affected).sum();

        if let Err(e) = self.session.commit() {
            return Err(self.abort(&template.sql, e));
        }
        info!(
            "Batch committed: {} of {} rows succeeded",
            outcome.succeeded, outcome.attempted
        );
        Ok(outcome)
    }
}
