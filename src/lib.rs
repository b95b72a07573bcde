// Core infrastructure modules
pub mod core;

// Feature-specific modules
pub mod config;
pub mod db;
pub mod frame;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_utils;

pub use crate::core::{BridgeError, Result, SqlValue};
pub use crate::frame::{Frame, Tabular};
