//! Discrete PI block.
//!
//! Forward-Euler integral, symmetric output limit, and anti-windup by
//! conditional integration: while the output is saturated the integral is
//! frozen.

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};
use crate::memory::ControllerMemory;
use crate::saturation::{SaturationWarning, clamp_symmetric};

/// PI controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiController {
    /// Name used in saturation warnings.
    pub name: String,
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain (1/s times proportional units).
    pub ki: f64,
    /// Symmetric output limit.
    pub limit: f64,
}

/// PI controller state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PiState {
    /// Integral accumulator.
    pub integral: f64,
}

impl PiState {
    /// Read the accumulator stored under `key`.
    pub fn load(memory: &ControllerMemory, key: &str) -> ControlResult<Self> {
        Ok(Self {
            integral: memory.value(key)?,
        })
    }

    /// Write the accumulator under `key`.
    pub fn store(&self, memory: &mut ControllerMemory, key: &str) {
        memory.set(key, self.integral);
    }
}

impl PiController {
    /// Create a new PI controller.
    ///
    /// # Arguments
    ///
    /// * `name` - Quantity name for saturation warnings
    /// * `kp` - Proportional gain (non-negative)
    /// * `ki` - Integral gain (non-negative)
    /// * `limit` - Symmetric output limit (positive)
    pub fn new(name: impl Into<String>, kp: f64, ki: f64, limit: f64) -> ControlResult<Self> {
        if !(kp.is_finite() && kp >= 0.0) {
            return Err(ControlError::Configuration {
                what: format!("kp must be non-negative (got {kp})"),
            });
        }
        if !(ki.is_finite() && ki >= 0.0) {
            return Err(ControlError::Configuration {
                what: format!("ki must be non-negative (got {ki})"),
            });
        }
        if !(limit.is_finite() && limit > 0.0) {
            return Err(ControlError::Configuration {
                what: format!("limit must be positive (got {limit})"),
            });
        }
        Ok(Self {
            name: name.into(),
            kp,
            ki,
            limit,
        })
    }

    /// Compute controller output.
    ///
    /// # Arguments
    ///
    /// * `state` - Controller state (contains integral)
    /// * `error` - Reference minus feedback
    /// * `feedforward` - Added to the PI terms before limiting
    /// * `ts` - Time since last update (seconds)
    ///
    /// # Returns
    ///
    /// Updated state, limited output and the saturation notice if any.
    pub fn update(
        &self,
        state: &PiState,
        error: f64,
        feedforward: f64,
        ts: f64,
    ) -> (PiState, f64, Option<SaturationWarning>) {
        let p_term = self.kp * error;
        let i_term = self.ki * state.integral;

        let output_raw = p_term + i_term + feedforward;
        let (output, saturation) = clamp_symmetric(output_raw, self.limit, &self.name);

        // Anti-windup: if output is saturated, don't accumulate integral
        let new_state = if saturation.is_none() {
            PiState {
                integral: state.integral + error * ts,
            }
        } else {
            *state
        };

        (new_state, output, saturation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pi_controller_creation() {
        let pi = PiController::new("tau_ref", 1.0, 2.0, 10.0).unwrap();
        assert_eq!(pi.kp, 1.0);
        assert_eq!(pi.ki, 2.0);
    }

    #[test]
    fn pi_controller_proportional_only() {
        let pi = PiController::new("u", 2.0, 0.0, 10.0).unwrap();
        let (_, output, warn) = pi.update(&PiState::default(), 0.5, 0.0, 0.1);
        assert!((output - 1.0).abs() < 1e-12);
        assert!(warn.is_none());
    }

    #[test]
    fn pi_controller_integral_action() {
        let pi = PiController::new("u", 1.0, 1.0, 10.0).unwrap();
        let mut state = PiState::default();

        // Constant error of 1.0
        for _ in 0..10 {
            let (new_state, _, _) = pi.update(&state, 1.0, 0.0, 0.1);
            state = new_state;
        }

        assert!((state.integral - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pi_controller_output_clamping_freezes_integral() {
        let pi = PiController::new("u", 10.0, 1.0, 1.0).unwrap();
        let state = PiState { integral: 0.25 };

        let (new_state, output, warn) = pi.update(&state, 10.0, 0.0, 0.1);
        assert_eq!(output, 1.0);
        assert!(warn.is_some());
        assert_eq!(new_state, state);
    }

    #[test]
    fn feedforward_is_added() {
        let pi = PiController::new("u", 1.0, 0.0, 100.0).unwrap();
        let (_, output, _) = pi.update(&PiState::default(), 1.0, 5.0, 0.1);
        assert!((output - 6.0).abs() < 1e-12);
    }

    #[test]
    fn state_round_trips_through_memory() {
        let mut memory = ControllerMemory::new();
        PiState { integral: 0.75 }.store(&mut memory, "speed.integral");
        let state = PiState::load(&memory, "speed.integral").unwrap();
        assert_eq!(state.integral, 0.75);
    }

    #[test]
    fn invalid_controller_params() {
        assert!(PiController::new("u", -1.0, 1.0, 1.0).is_err());
        assert!(PiController::new("u", 1.0, -1.0, 1.0).is_err());
        assert!(PiController::new("u", 1.0, 1.0, 0.0).is_err());
        assert!(PiController::new("u", 1.0, 1.0, f64::NAN).is_err());
    }
}
