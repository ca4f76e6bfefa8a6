//! Sampled execution primitives for digital controllers.
//!
//! Controllers operate in sampled/digital mode with a configured period.
//! Between samples, controller outputs are held constant (zero-order hold) by
//! the simulation harness.

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

/// Sample configuration for a controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleConfig {
    /// Sample period in seconds.
    pub ts: f64,
}

impl SampleConfig {
    /// Create a new sample configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `ts` is not positive and finite.
    pub fn new(ts: f64) -> ControlResult<Self> {
        if !(ts.is_finite() && ts > 0.0) {
            return Err(ControlError::Configuration {
                what: format!("sample period must be positive and finite (got {ts})"),
            });
        }
        Ok(Self { ts })
    }
}
