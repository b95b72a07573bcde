/// Core Module for rowbridge
///
/// This module contains the shared infrastructure the rest of the crate is
/// built on: the error taxonomy, the scalar value type and the database layer
/// (sessions, statement building, execution and introspection).

pub mod db;
pub mod error;
pub mod value;

// Re-export commonly used types for convenience
pub use error::{BridgeError, Result};
pub use value::SqlValue;
