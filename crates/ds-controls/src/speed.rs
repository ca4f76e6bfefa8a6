//! PI speed control for a rigid-body mechanical plant.
//!
//! Measurement: `[w_m, theta_m]`. Actuation: `[tau_m]` (torque command).
//! Gains follow bandwidth tuning against the inertia estimate `j`:
//! `kp = 2 * alpha_s * j`, `ki = alpha_s^2 * j`.

use std::f64::consts::PI;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::trace;

use ds_core::{Signal, ensure_positive};

use crate::controller::{ControlStep, Controller, check_dim};
use crate::error::ControlResult;
use crate::memory::ControllerMemory;
use crate::pi::{PiController, PiState};
use crate::sampled::SampleConfig;

const SPEED_INTEGRAL: &str = "speed.integral";

/// Speed controller tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedControlParams {
    /// Sampling period (s). Default 250 us.
    pub ts: f64,
    /// Speed-loop bandwidth (rad/s). Default 2*pi*4.
    pub alpha_s: f64,
    /// Inertia estimate (kg m^2). Default 0.015.
    pub j: f64,
    /// Torque limit (N m). Default 21.9.
    pub tau_max: f64,
}

impl Default for SpeedControlParams {
    fn default() -> Self {
        Self {
            ts: 250e-6,
            alpha_s: 2.0 * PI * 4.0,
            j: 0.015,
            tau_max: 21.9,
        }
    }
}

impl SpeedControlParams {
    pub fn validate(&self) -> ControlResult<()> {
        ensure_positive(self.ts, "ts")?;
        ensure_positive(self.alpha_s, "alpha_s")?;
        ensure_positive(self.j, "j")?;
        ensure_positive(self.tau_max, "tau_max")?;
        Ok(())
    }
}

/// Torque-producing speed controller with a time-varying speed reference.
pub struct SpeedControl {
    params: SpeedControlParams,
    sample: SampleConfig,
    pi: PiController,
    w_m_ref: Box<dyn Signal>,
}

impl std::fmt::Debug for SpeedControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeedControl")
            .field("params", &self.params)
            .field("pi", &self.pi)
            .finish_non_exhaustive()
    }
}

impl SpeedControl {
    /// Create a speed controller.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for non-positive or non-finite tuning.
    pub fn new(params: SpeedControlParams, w_m_ref: Box<dyn Signal>) -> ControlResult<Self> {
        params.validate()?;
        let sample = SampleConfig::new(params.ts)?;
        let kp = 2.0 * params.alpha_s * params.j;
        let ki = params.alpha_s * params.alpha_s * params.j;
        let pi = PiController::new("tau_ref", kp, ki, params.tau_max)?;
        Ok(Self {
            params,
            sample,
            pi,
            w_m_ref,
        })
    }

    pub fn params(&self) -> &SpeedControlParams {
        &self.params
    }

    pub fn pi(&self) -> &PiController {
        &self.pi
    }
}

impl Controller for SpeedControl {
    fn sample_config(&self) -> SampleConfig {
        self.sample
    }

    fn measurement_dim(&self) -> usize {
        2
    }

    fn actuation_dim(&self) -> usize {
        1
    }

    fn initial_memory(&self) -> ControllerMemory {
        ControllerMemory::new().with(SPEED_INTEGRAL, 0.0)
    }

    fn step(
        &self,
        t: f64,
        measurement: &DVector<f64>,
        prev_actuation: &DVector<f64>,
        memory: &ControllerMemory,
    ) -> ControlResult<ControlStep> {
        check_dim("measurement", measurement, 2)?;
        check_dim("prev_actuation", prev_actuation, 1)?;

        let w_m = measurement[0];
        let w_m_ref = self.w_m_ref.value(t);

        let state = PiState::load(memory, SPEED_INTEGRAL)?;
        let (state, tau_ref, saturation) =
            self.pi.update(&state, w_m_ref - w_m, 0.0, self.params.ts);
        trace!(t, w_m, w_m_ref, tau_ref, "speed control step");

        let mut memory = memory.clone();
        state.store(&mut memory, SPEED_INTEGRAL);

        Ok(ControlStep {
            actuation: DVector::from_element(1, tau_ref),
            memory,
            saturation: saturation.into_iter().collect(),
        })
    }
}
