//! Plant trait for pluggable continuous-time systems.

use nalgebra::DVector;

use crate::error::{SimError, SimResult};

/// Continuous-time dynamical system `dx/dt = f(t, x, u)`.
///
/// A plant holds parameters and disturbance hooks only; all simulation
/// progress lives in the state vector owned by the harness. `derivative` must
/// be a pure function of `(t, x, u)` and the plant's configured disturbance
/// signals.
pub trait Plant: Send {
    /// Length of the state vector. Fixed for the lifetime of the plant.
    fn state_dim(&self) -> usize;

    /// Length of the input (actuation) vector.
    fn input_dim(&self) -> usize;

    /// Length of the measurement vector returned by [`output`](Self::output).
    fn output_dim(&self) -> usize {
        self.state_dim()
    }

    /// Return the initial state at t=0.
    fn initial_state(&self) -> DVector<f64>;

    /// Compute state derivative `dx/dt = f(t, x, u)`.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidState`] when `x` or `u` has the wrong dimension.
    /// Non-finite results are not checked here; the integrator does that.
    fn derivative(&self, t: f64, x: &DVector<f64>, u: &DVector<f64>) -> SimResult<DVector<f64>>;

    /// Measurement available to the controller. Defaults to the full state.
    fn output(&self, _t: f64, x: &DVector<f64>) -> DVector<f64> {
        x.clone()
    }
}

/// Check `x` and `u` against the plant's declared dimensions.
pub fn check_plant_dims<P: Plant + ?Sized>(
    plant: &P,
    x: &DVector<f64>,
    u: &DVector<f64>,
) -> SimResult<()> {
    if x.len() != plant.state_dim() {
        return Err(SimError::InvalidState {
            what: "plant state",
            expected: plant.state_dim(),
            actual: x.len(),
        });
    }
    if u.len() != plant.input_dim() {
        return Err(SimError::InvalidState {
            what: "plant input",
            expected: plant.input_dim(),
            actual: u.len(),
        });
    }
    Ok(())
}

impl<P: Plant + ?Sized> Plant for Box<P> {
    fn state_dim(&self) -> usize {
        (**self).state_dim()
    }

    fn input_dim(&self) -> usize {
        (**self).input_dim()
    }

    fn output_dim(&self) -> usize {
        (**self).output_dim()
    }

    fn initial_state(&self) -> DVector<f64> {
        (**self).initial_state()
    }

    fn derivative(&self, t: f64, x: &DVector<f64>, u: &DVector<f64>) -> SimResult<DVector<f64>> {
        (**self).derivative(t, x, u)
    }

    fn output(&self, t: f64, x: &DVector<f64>) -> DVector<f64> {
        (**self).output(t, x)
    }
}
