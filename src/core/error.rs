/// Rowbridge Error Module
///
/// This module defines the error taxonomy shared by every layer of the crate.
/// Pure builders only ever produce `Contract` errors; the I/O-facing layers
/// (connection, executor, introspection) translate engine failures into
/// `Connection` or `Execution` after rolling back.
use thiserror::Error;

/// Comprehensive error type for rowbridge.
///
/// An empty result set is not represented here: a query that matches no rows
/// returns an empty `Frame`.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A session could not be established, or was used after being closed
    #[error("Connection error: {0}")]
    Connection(String),

    /// A statement failed on the engine side (syntax, constraint, type mismatch)
    #[error("Execution error: {0}")]
    Execution(String),

    /// The caller supplied malformed input; raised before any I/O
    #[error("Contract violation: {0}")]
    Contract(String),

    /// Column introspection or result labeling failed
    #[error("Schema error: {0}")]
    Schema(String),

    /// Bulk synchronization was asked to process an empty dataset
    #[error("Nothing to synchronize: dataset is empty")]
    EmptyDataset,

    /// Fail-fast bulk synchronization stopped at `row`.
    ///
    /// `committed` rows before it were already committed and are not rolled back.
    #[error("Synchronization aborted at row {row} after {committed} committed rows: {source}")]
    SyncAborted {
        row: usize,
        committed: usize,
        #[source]
        source: Box<BridgeError>,
    },

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// Wraps an engine error raised while executing a statement.
    pub(crate) fn execution(context: &str, err: impl std::fmt::Display) -> Self {
        BridgeError::Execution(format!("{} failed: {}", context, err))
    }

    /// Returns true for errors raised before any I/O was attempted.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, BridgeError::Contract(_) | BridgeError::EmptyDataset)
    }
}

/// Type alias for Result to use BridgeError as the error type.
pub type Result<T> = std::result::Result<T, BridgeError>;
