//! The discrete-time controller contract.

use nalgebra::DVector;

use crate::error::{ControlError, ControlResult};
use crate::memory::ControllerMemory;
use crate::sampled::SampleConfig;
use crate::saturation::SaturationWarning;

/// Result of one controller invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlStep {
    /// New actuation command.
    pub actuation: DVector<f64>,
    /// Memory to pass to the next call.
    pub memory: ControllerMemory,
    /// Limits hit while computing `actuation`.
    pub saturation: Vec<SaturationWarning>,
}

/// Discrete-time controller invoked once per sampling period.
///
/// Implementations must keep every piece of persistent state in the
/// [`ControllerMemory`] they return; `step` takes `&self` and must be a pure
/// function of its arguments and of the reference signals configured at
/// construction.
pub trait Controller: Send {
    /// Sampling period the controller was designed for.
    fn sample_config(&self) -> SampleConfig;

    /// Length of the measurement vector `step` expects.
    fn measurement_dim(&self) -> usize;

    /// Length of the actuation vector `step` produces.
    fn actuation_dim(&self) -> usize;

    /// Actuation applied before the first command takes effect.
    fn initial_actuation(&self) -> DVector<f64> {
        DVector::zeros(self.actuation_dim())
    }

    /// Memory at the start of a run.
    fn initial_memory(&self) -> ControllerMemory;

    /// Compute the next actuation.
    ///
    /// # Arguments
    ///
    /// * `t` - Sample time (seconds)
    /// * `measurement` - Plant output sampled at `t`
    /// * `prev_actuation` - Actuation applied over the interval ending at `t`
    /// * `memory` - Memory returned by the previous call
    fn step(
        &self,
        t: f64,
        measurement: &DVector<f64>,
        prev_actuation: &DVector<f64>,
        memory: &ControllerMemory,
    ) -> ControlResult<ControlStep>;
}

/// Reject vectors whose length differs from what a controller expects.
pub fn check_dim(what: &'static str, v: &DVector<f64>, expected: usize) -> ControlResult<()> {
    if v.len() == expected {
        Ok(())
    } else {
        Err(ControlError::InvalidState {
            what,
            expected,
            actual: v.len(),
        })
    }
}

impl<C: Controller + ?Sized> Controller for Box<C> {
    fn sample_config(&self) -> SampleConfig {
        (**self).sample_config()
    }

    fn measurement_dim(&self) -> usize {
        (**self).measurement_dim()
    }

    fn actuation_dim(&self) -> usize {
        (**self).actuation_dim()
    }

    fn initial_actuation(&self) -> DVector<f64> {
        (**self).initial_actuation()
    }

    fn initial_memory(&self) -> ControllerMemory {
        (**self).initial_memory()
    }

    fn step(
        &self,
        t: f64,
        measurement: &DVector<f64>,
        prev_actuation: &DVector<f64>,
        memory: &ControllerMemory,
    ) -> ControlResult<ControlStep> {
        (**self).step(t, measurement, prev_actuation, memory)
    }
}
