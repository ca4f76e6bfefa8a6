//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered while building or running a simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Invalid or inconsistent construction parameters.
    #[error("Invalid configuration: {what}")]
    Configuration { what: String },

    /// A vector does not have the dimension the plant or controller expects.
    #[error("Invalid state: {what} (expected dimension {expected}, got {actual})")]
    InvalidState {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Numerical divergence or non-convergence inside a sampling interval.
    #[error("Integration failed at t = {t}: {what}")]
    IntegrationFailure { t: f64, what: String },

    #[error("Controller error: {0}")]
    Control(#[from] ds_controls::ControlError),
}

pub type SimResult<T> = Result<T, SimError>;

impl From<ds_core::CoreError> for SimError {
    fn from(e: ds_core::CoreError) -> Self {
        SimError::Configuration {
            what: e.to_string(),
        }
    }
}
