/// # Test Utilities Module
///
/// Testing infrastructure for rowbridge:
/// - Isolated SQLite fixtures with a sample schema
/// - `RecordingSession`, a scripted `Session` that records every call
/// - Error assertion helpers and macros
/// - A one-time tracing subscriber for tests that want log output

use crate::core::db::{connect_in_memory, Dialect, RawRows, Session, SqliteSession};
use crate::core::{BridgeError, Result, SqlValue};
use std::collections::VecDeque;
use std::sync::Once;

/// Installs a test-friendly tracing subscriber once per process.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Isolated database test fixture
pub struct DatabaseFixture {
    pub name: String,
    pub session: SqliteSession,
}

impl DatabaseFixture {
    /// Create a new empty in-memory database
    pub fn new(name: &str) -> Result<Self> {
        init_test_logging();
        let mut session = connect_in_memory()?;
        session.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(DatabaseFixture {
            name: name.to_string(),
            session,
        })
    }

    /// Create fixture with sample data schema
    pub fn with_sample_data(name: &str) -> Result<Self> {
        let mut fixture = Self::new(name)?;
        fixture.setup_standard_schema()?;
        fixture.populate_sample_data()?;
        Ok(fixture)
    }

    /// Set up standard test schema
    ///
    /// `chargers` carries a CHECK constraint so tests can provoke a
    /// per-row failure with a negative count.
    pub fn setup_standard_schema(&mut self) -> Result<()> {
        self.session.execute_batch(
            "
            CREATE TABLE charging_location_details (
                location_id INTEGER PRIMARY KEY,
                district TEXT NOT NULL,
                address TEXT,
                chargers INTEGER NOT NULL DEFAULT 0 CHECK (chargers >= 0)
            );

            CREATE TABLE charger_status (
                charger_id TEXT PRIMARY KEY,
                location_id INTEGER NOT NULL,
                status TEXT NOT NULL,
                FOREIGN KEY (location_id) REFERENCES charging_location_details (location_id)
            );
        ",
        )
    }

    /// Populate with realistic sample data
    pub fn populate_sample_data(&mut self) -> Result<()> {
        self.session.execute_batch(
            "
            INSERT INTO charging_location_details (location_id, district, address, chargers) VALUES
                (1, 'Hougang', '12 Hougang Ave 3', 4),
                (2, 'Bedok', '5 Bedok North Rd', 2),
                (3, 'Hougang', '90 Upper Serangoon Rd', 6),
                (4, 'Punggol', NULL, 0);

            INSERT INTO charger_status (charger_id, location_id, status) VALUES
                ('HG-1', 1, 'available'),
                ('HG-2', 1, 'charging'),
                ('BD-1', 2, 'offline');
        ",
        )
    }

    /// Number of rows currently in `table`
    pub fn count(&self, table: &str) -> i64 {
        self.session
            .connection()
            .and_then(|c| {
                c.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                    .map_err(|e| BridgeError::execution("Row count", e))
            })
            .expect("Failed to count rows")
    }
}

/// A scripted session that records what the code under test asks of it.
///
/// Queries, executions and commits pop pre-seeded results in order; once a
/// queue is exhausted, queries return no rows, executions affect one row and
/// commits succeed. Any execution opens a transaction; commit and rollback
/// close it.
#[derive(Debug)]
pub struct RecordingSession {
    dialect: Dialect,
    alive: bool,
    open_transaction: bool,
    query_results: VecDeque<Result<RawRows>>,
    execution_results: VecDeque<Result<usize>>,
    commit_results: VecDeque<Result<()>>,
    statements: Vec<String>,
    params: Vec<Vec<SqlValue>>,
    commits: usize,
    rollbacks: usize,
    closes: usize,
}

impl RecordingSession {
    pub fn new(dialect: Dialect) -> Self {
        RecordingSession {
            dialect,
            alive: true,
            open_transaction: false,
            query_results: VecDeque::new(),
            execution_results: VecDeque::new(),
            commit_results: VecDeque::new(),
            statements: Vec::new(),
            params: Vec::new(),
            commits: 0,
            rollbacks: 0,
            closes: 0,
        }
    }

    pub fn push_result(&mut self, result: Result<RawRows>) {
        self.query_results.push_back(result);
    }

    pub fn push_execution(&mut self, result: Result<usize>) {
        self.execution_results.push_back(result);
    }

    pub fn push_commit(&mut self, result: Result<()>) {
        self.commit_results.push_back(result);
    }

    /// Every statement text received, in order
    pub fn statements(&self) -> Vec<&str> {
        self.statements.iter().map(String::as_str).collect()
    }

    pub fn params(&self) -> &[Vec<SqlValue>] {
        &self.params
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    pub fn closes(&self) -> usize {
        self.closes
    }

    /// Whether the session saw any I/O at all
    pub fn is_untouched(&self) -> bool {
        self.statements.is_empty() && self.commits == 0 && self.rollbacks == 0
    }

    fn record(&mut self, sql: &str, params: &[SqlValue]) -> Result<()> {
        if !self.alive {
            return Err(BridgeError::Connection("session is closed".to_string()));
        }
        self.statements.push(sql.to_string());
        self.params.push(params.to_vec());
        Ok(())
    }
}

impl Session for RecordingSession {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn in_transaction(&self) -> bool {
        self.open_transaction
    }

    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<RawRows> {
        self.record(sql, params)?;
        self.query_results.pop_front().unwrap_or_else(|| Ok(RawRows::default()))
    }

    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<usize> {
        self.record(sql, params)?;
        self.open_transaction = true;
        self.execution_results.pop_front().unwrap_or(Ok(1))
    }

    /// Counts every attempt, including scripted failures.
    fn commit(&mut self) -> Result<()> {
        self.commits += 1;
        let result = self.commit_results.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.open_transaction = false;
        }
        result
    }

    fn rollback(&mut self) -> Result<()> {
        self.rollbacks += 1;
        self.open_transaction = false;
        Ok(())
    }

    fn close(&mut self) {
        if self.alive {
            self.alive = false;
            self.closes += 1;
        }
    }
}

/// Error testing utilities specific to BridgeError patterns
pub mod error_testing {
    /// Verify error message quality (contains helpful information)
    pub fn verify_error_message_quality<T, E>(result: &std::result::Result<T, E>, context: &str)
    where
        T: std::fmt::Debug,
        E: std::fmt::Display,
    {
        if let Err(ref error) = result {
            let error_str = error.to_string();

            assert!(!error_str.is_empty(), "Error message should not be empty in {}", context);
            assert!(error_str.len() > 10, "Error message should be descriptive in {}", context);

            let lower = error_str.to_lowercase();
            let has_operation_context = lower.contains("failed")
                || lower.contains("error")
                || lower.contains("violation")
                || lower.contains("aborted");

            assert!(
                has_operation_context,
                "Error should indicate what operation failed: '{}' in {}",
                error_str, context
            );
        } else {
            panic!("Expected an error in {}", context);
        }
    }
}

#[macro_export]
macro_rules! assert_bridge_error {
    ($result:expr, $expected_type:ident, $context:expr) => {
        match $result {
            Err($crate::core::BridgeError::$expected_type { .. }) => {}
            Ok(_) => panic!("Expected {} error but got Ok in {}", stringify!($expected_type), $context),
            Err(other) => panic!("Expected {} but got {:?} in {}", stringify!($expected_type), other, $context),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_data_fixture() {
        let fixture = DatabaseFixture::with_sample_data("test_sample").unwrap();
        assert_eq!(fixture.name, "test_sample");
        assert_eq!(fixture.count("charging_location_details"), 4);
        assert_eq!(fixture.count("charger_status"), 3);
    }

    #[test]
    fn test_recording_session_scripts_results() {
        let mut session = RecordingSession::new(Dialect::Sqlite);
        session.push_execution(Err(BridgeError::Execution("boom".to_string())));

        assert!(session.execute("UPDATE t SET a = ?", &[1.into()]).is_err());
        assert_eq!(session.execute("UPDATE t SET a = ?", &[2.into()]).unwrap(), 1);
        assert!(session.query("SELECT * FROM t", &[]).unwrap().is_empty());
        assert_eq!(session.statements().len(), 3);
        assert_eq!(session.params()[1], vec![SqlValue::Integer(2)]);
        assert!(session.in_transaction());

        session.push_commit(Err(BridgeError::Execution("Commit failed: busy".to_string())));
        assert!(session.commit().is_err());
        assert!(session.in_transaction());
        session.commit().unwrap();
        assert!(!session.in_transaction());
        assert_eq!(session.commits(), 2);

        session.close();
        session.close();
        assert_eq!(session.closes(), 1);
        assert!(matches!(session.query("SELECT 1", &[]), Err(BridgeError::Connection(_))));
    }

    #[test]
    fn test_error_assertion_macros() {
        let result: Result<i32> = Err(BridgeError::Contract("Test error".to_string()));
        assert_bridge_error!(result, Contract, "macro test");

        let result: Result<i32> = Err(BridgeError::EmptyDataset);
        assert_bridge_error!(result, EmptyDataset, "unit variant");
    }

    #[test]
    fn test_error_message_quality() {
        let result: Result<i32> = Err(BridgeError::Execution("UNIQUE constraint failed".to_string()));
        error_testing::verify_error_message_quality(&result, "execution error test");
    }
}
