//! Bulk operations that push a tabular dataset into a table.
//!
//! The two operations fail differently:
//!
//! - [`sync_rows`] is **fail-fast**. Each row is its own committed update; the
//!   first failing row stops the batch. Rows before it stay committed and the
//!   error reports how many, so partial application is visible to the caller.
//! - [`insert_all`] is **best-effort**. Every row is attempted inside one
//!   transaction, failing rows are collected, and whatever succeeded is
//!   committed once at the end.

use crate::core::db::{builder, ColumnFilter, QueryExecutor, RowFailure, Session, Statement, UpdateSpec};
use crate::core::{BridgeError, Result, SqlValue};
use crate::frame::Tabular;
use tracing::{debug, error, info, warn};

/// One dataset row turned into a keyed update.
#[derive(Debug, Clone, PartialEq)]
pub struct RowUpdate {
    /// Position of the row in the dataset
    pub row: usize,
    /// Value of the filter column
    pub key: SqlValue,
    pub update: UpdateSpec,
}

/// Outcome of a completed [`sync_rows`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub rows_synced: usize,
    pub rows_affected: usize,
    /// Dataset rows whose key matched nothing in the table
    pub unmatched_rows: Vec<usize>,
}

/// Outcome of an [`insert_all`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertReport {
    pub attempted: usize,
    pub inserted: usize,
    pub failures: Vec<RowFailure>,
}

impl InsertReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Maps every dataset row to a keyed update, in row order.
///
/// The filter column supplies the key; every other column becomes part of
/// the update.
///
/// # Errors
///
/// `Contract` if `filter_column` is missing, if it is the dataset's only
/// column, or if a row is shorter than the column list.
pub fn plan_updates<T: Tabular + ?Sized>(dataset: &T, filter_column: &str) -> Result<Vec<RowUpdate>> {
    let key_index = dataset.column_index(filter_column).ok_or_else(|| {
        BridgeError::Contract(format!("dataset has no filter column '{}'", filter_column))
    })?;

    let update_columns: Vec<&str> = dataset
        .column_names()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != key_index)
        .map(|(_, c)| c.as_str())
        .collect();
    if update_columns.is_empty() {
        return Err(BridgeError::Contract(format!(
            "dataset has no columns to update besides '{}'",
            filter_column
        )));
    }

    dataset
        .iter_rows()
        .enumerate()
        .map(|(row, values)| -> Result<RowUpdate> {
            let key = values.get(key_index).cloned().ok_or_else(|| {
                BridgeError::Contract(format!("row {} has no value for '{}'", row, filter_column))
            })?;
            let update_values = values
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != key_index)
                .map(|(_, v)| v.clone())
                .collect();
            Ok(RowUpdate {
                row,
                key,
                update: UpdateSpec::new(update_columns.as_slice(), update_values)?,
            })
        })
        .collect()
}

/// Updates `table` so each row keyed by `filter_column` matches the dataset.
///
/// Every statement is built before the first write, so malformed input never
/// causes partial application. Execution is fail-fast: the first row that
/// fails aborts the batch with [`BridgeError::SyncAborted`]; earlier rows
/// are already committed and are not rolled back. A key that matches no row
/// is recorded in [`SyncReport::unmatched_rows`], not treated as a failure.
///
/// # Errors
///
/// `EmptyDataset` without touching the session when the dataset has no rows,
/// `Contract` for malformed input, `SyncAborted` for a failing row.
pub fn sync_rows<S, T>(session: &mut S, dataset: &T, filter_column: &str, table: &str) -> Result<SyncReport>
where
    S: Session + ?Sized,
    T: Tabular + ?Sized,
{
    if dataset.is_empty() {
        warn!("Empty dataset passed for {}", table);
        return Err(BridgeError::EmptyDataset);
    }

    let filter_columns = [filter_column];
    let statements = plan_updates(dataset, filter_column)?
        .into_iter()
        .map(|planned| {
            let filter = ColumnFilter::equals(&filter_columns, planned.key);
            builder::update_where(table, &filter, &planned.update).map(|stmt| (planned.row, stmt))
        })
        .collect::<Result<Vec<(usize, Statement)>>>()?;
    debug!("Synchronizing {} rows into {} by {}", statements.len(), table, filter_column);

    let report = statements
        .iter()
        .try_fold(SyncReport::default(), |mut report, (row, stmt)| {
            match QueryExecutor::new(&mut *session).run_mutation(stmt) {
                Ok(affected) => {
                    if affected == 0 {
                        report.unmatched_rows.push(*row);
                    }
                    report.rows_synced += 1;
                    report.rows_affected += affected;
                    Ok(report)
                }
                Err(e) => {
                    error!(
                        "Synchronization of {} stopped at row {} ({} rows committed): {}",
                        table, row, report.rows_synced, e
                    );
                    Err(BridgeError::SyncAborted {
                        row: *row,
                        committed: report.rows_synced,
                        source: Box::new(e),
                    })
                }
            }
        })?;

    info!("Synchronized {} rows into {}", report.rows_synced, table);
    Ok(report)
}

/// Inserts every dataset row into `table`, best-effort.
///
/// One INSERT shape is built from the dataset's column names and executed
/// per row in a single transaction. Failing rows are logged and reported in
/// [`InsertReport::failures`]; they do not stop the loop, and the rows that
/// succeeded are committed together at the end. An empty dataset inserts
/// nothing and does not touch the session.
pub fn insert_all<S, T>(session: &mut S, dataset: &T, table: &str) -> Result<InsertReport>
where
    S: Session + ?Sized,
    T: Tabular + ?Sized,
{
    if dataset.is_empty() {
        debug!("Nothing to insert into {}", table);
        return Ok(InsertReport::default());
    }

    let template = builder::insert_template(table, dataset.column_names())?;
    let rows = dataset.iter_rows().map(<[SqlValue]>::to_vec);
    let outcome = QueryExecutor::new(session).run_each(&template, rows)?;

    if outcome.is_complete() {
        info!("Data inserted successfully into {}", table);
    } else {
        warn!(
            "{} of {} rows could not be inserted into {}",
            outcome.failures.len(),
            outcome.attempted,
            table
        );
    }

    Ok(InsertReport {
        attempted: outcome.attempted,
        inserted: outcome.succeeded,
        failures: outcome.failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::Dialect;
    use crate::db;
    use crate::frame::Frame;
    use crate::test_utils::{DatabaseFixture, RecordingSession};

    const TABLE: &str = "charging_location_details";

    fn chargers_by_location(fixture: &mut DatabaseFixture) -> Vec<(i64, i64)> {
        let frame = db::read_all(&mut fixture.session, TABLE).unwrap();
        frame
            .rows()
            .iter()
            .map(|row| (row[0].as_i64().unwrap(), row[3].as_i64().unwrap()))
            .collect()
    }

    fn updates_with_bad_second_row() -> Frame {
        Frame::new(
            ["location_id", "district", "chargers"],
            vec![
                vec![1.into(), "Hougang".into(), 5.into()],
                vec![2.into(), "Bedok".into(), (-1).into()],
                vec![3.into(), "Hougang".into(), 9.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_plan_updates_splits_key_from_values() {
        let plan = plan_updates(&updates_with_bad_second_row(), "district").unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[1].row, 1);
        assert_eq!(plan[1].key, SqlValue::from("Bedok"));
        assert_eq!(plan[1].update.columns(), &["location_id", "chargers"]);
        assert_eq!(plan[1].update.values(), &[SqlValue::Integer(2), SqlValue::Integer(-1)]);
    }

    #[test]
    fn test_plan_updates_contract_violations() {
        let dataset = updates_with_bad_second_row();
        assert!(matches!(plan_updates(&dataset, "missing"), Err(BridgeError::Contract(_))));

        let keys_only = Frame::new(["location_id"], vec![vec![1.into()]]).unwrap();
        assert!(matches!(plan_updates(&keys_only, "location_id"), Err(BridgeError::Contract(_))));
    }

    #[test]
    fn test_sync_rows_empty_dataset_does_no_io() {
        let mut session = RecordingSession::new(Dialect::Sqlite);
        let empty = Frame::with_columns(["location_id", "chargers"]);

        let result = sync_rows(&mut session, &empty, "location_id", TABLE);
        assert!(matches!(result, Err(BridgeError::EmptyDataset)));
        assert!(session.is_untouched());
    }

    #[test]
    fn test_sync_rows_updates_every_row() {
        let mut fixture = DatabaseFixture::with_sample_data("sync_ok").unwrap();
        let dataset = Frame::new(
            ["location_id", "chargers"],
            vec![
                vec![1.into(), 8.into()],
                vec![4.into(), 2.into()],
                vec![99.into(), 1.into()],
            ],
        )
        .unwrap();

        let report = sync_rows(&mut fixture.session, &dataset, "location_id", TABLE).unwrap();
        assert_eq!(report.rows_synced, 3);
        assert_eq!(report.rows_affected, 2);
        assert_eq!(report.unmatched_rows, vec![2]);
        assert_eq!(chargers_by_location(&mut fixture), vec![(1, 8), (2, 2), (3, 6), (4, 2)]);
    }

    #[test]
    fn test_sync_rows_fails_fast_and_keeps_earlier_rows() {
        let mut fixture = DatabaseFixture::with_sample_data("sync_fail").unwrap();
        let dataset = updates_with_bad_second_row();

        let err = sync_rows(&mut fixture.session, &dataset, "location_id", TABLE).unwrap_err();
        match err {
            BridgeError::SyncAborted { row, committed, source } => {
                assert_eq!(row, 1);
                assert_eq!(committed, 1);
                assert!(matches!(*source, BridgeError::Execution(_)));
            }
            other => panic!("Expected SyncAborted, got {:?}", other),
        }

        // Row 0 committed, row 1 rolled back, row 2 never attempted
        assert_eq!(chargers_by_location(&mut fixture), vec![(1, 5), (2, 2), (3, 6), (4, 0)]);
        assert!(!fixture.session.in_transaction());
    }

    #[test]
    fn test_sync_rows_stops_issuing_statements_after_failure() {
        let mut session = RecordingSession::new(Dialect::Sqlite);
        session.push_execution(Ok(1));
        session.push_execution(Err(BridgeError::Execution("CHECK constraint failed".to_string())));

        let result = sync_rows(&mut session, &updates_with_bad_second_row(), "location_id", TABLE);
        assert!(matches!(result, Err(BridgeError::SyncAborted { row: 1, .. })));
        assert_eq!(session.statements().len(), 2);
        assert_eq!(session.commits(), 1);
        assert_eq!(session.rollbacks(), 1);
        assert_eq!(session.closes(), 0);
    }

    #[test]
    fn test_insert_all_is_best_effort() {
        let mut fixture = DatabaseFixture::with_sample_data("insert_partial").unwrap();
        let dataset = Frame::new(
            ["location_id", "district", "chargers"],
            vec![
                vec![10.into(), "Tampines".into(), 2.into()],
                vec![11.into(), "Changi".into(), (-5).into()],
                vec![12.into(), "Yishun".into(), 1.into()],
            ],
        )
        .unwrap();

        let report = insert_all(&mut fixture.session, &dataset, TABLE).unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.inserted, 2);
        assert!(!report.is_complete());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].row, 1);

        let inserted = db::read_where_in(&mut fixture.session, TABLE, "location_id", [10, 11, 12]).unwrap();
        let ids: Vec<i64> = inserted.rows().iter().filter_map(|r| r[0].as_i64()).collect();
        assert_eq!(ids, vec![10, 12]);
    }

    #[test]
    fn test_insert_all_commits_once() {
        let mut session = RecordingSession::new(Dialect::Sqlite);
        session.push_execution(Ok(1));
        session.push_execution(Err(BridgeError::Execution("NOT NULL constraint failed".to_string())));

        let dataset = updates_with_bad_second_row();
        let report = insert_all(&mut session, &dataset, TABLE).unwrap();

        assert_eq!(report.inserted, 2);
        assert_eq!(session.statements().len(), 3);
        assert_eq!(session.commits(), 1);
        assert_eq!(session.rollbacks(), 0);
    }

    #[test]
    fn test_insert_all_empty_dataset() {
        let mut session = RecordingSession::new(Dialect::Sqlite);
        let report = insert_all(&mut session, &Frame::with_columns(["a"]), TABLE).unwrap();
        assert_eq!(report, InsertReport::default());
        assert!(session.is_untouched());
    }
}
