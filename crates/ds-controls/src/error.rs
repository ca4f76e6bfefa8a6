//! Error types for control system operations.

use thiserror::Error;

/// Result type for control system operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur in control system operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid or inconsistent controller parameters.
    #[error("Invalid controller configuration: {what}")]
    Configuration { what: String },

    /// Measurement, actuation or memory does not match what the controller expects.
    #[error("Invalid controller state: {what} (expected {expected}, got {actual})")]
    InvalidState {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A named memory entry is missing.
    #[error("Controller memory has no entry '{key}'")]
    MissingMemory { key: String },
}

impl From<ds_core::CoreError> for ControlError {
    fn from(e: ds_core::CoreError) -> Self {
        ControlError::Configuration {
            what: e.to_string(),
        }
    }
}
