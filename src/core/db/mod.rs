/// Database Module
///
/// This module provides the database layer of rowbridge, organized into
/// focused submodules.
///
/// ## Architecture
///
/// - **Connection Management** (`connection.rs`): the `Session` boundary, the SQLite session and the connect/close lifecycle
/// - **Schema Introspection** (`schema.rs`): ordered column names of a table
/// - **Statement Building** (`builder.rs`): pure SELECT/INSERT/UPDATE rendering with bound parameters
/// - **Query Execution** (`query.rs`): running statements, commit/rollback and result labeling
///
/// ## Error Handling
///
/// All database operations use `BridgeError`. Builders only raise
/// `Contract`; everything that performs I/O rolls back before returning an
/// error.
pub mod builder;
pub mod connection;
pub mod query;
pub mod schema;

pub use builder::*;
pub use connection::*;
pub use query::*;
pub use schema::*;
