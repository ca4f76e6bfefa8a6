//! Cascaded speed/current control of a DC machine drive.
//!
//! Measurement: `[i_a, w_m]`. Actuation: `[u_a]` (armature voltage command).
//!
//! ```text
//! w_m_ref ─► speed PI ─► tau_ref ─► /k_f ─► i_ref ─► current PI (+ k_f w_m) ─► u_a
//! ```
//!
//! The torque reference is limited to `tau_max`, the current reference to
//! `i_max` and the voltage command to `u_max`. In sensorless mode the speed
//! is not read from the measurement: it is estimated from the measured
//! current and the voltage actually applied over the last interval, using the
//! armature voltage equation and a first-order filter of bandwidth `alpha_o`.

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
use crate::saturation::clamp_symmetric;

const SPEED_INTEGRAL: &str = "speed.integral";
const CURRENT_INTEGRAL: &str = "current.integral";
const OBSERVER_SPEED: &str = "observer.w_m";
const OBSERVER_CURRENT: &str = "observer.i_prev";

/// Where the speed feedback comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementMode {
    /// Use the measured speed.
    Sensor,
    /// Estimate the speed from current and applied voltage.
    #[default]
    Sensorless,
}

/// Cascade controller tuning and model estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeParams {
    /// Sampling period (s). Default 250 us.
    pub ts: f64,
    /// Speed feedback source. Default sensorless.
    pub mode: MeasurementMode,
    /// Current-control bandwidth (rad/s). Default 2*pi*200.
    pub alpha_c: f64,
    /// Speed-observer bandwidth (rad/s). Default 2*pi*40.
    pub alpha_o: f64,
    /// Speed-control bandwidth (rad/s). Default 2*pi*4.
    pub alpha_s: f64,
    /// Current limit (A). Default 7.5.
    pub i_max: f64,
    /// Torque limit for the speed controller (N m). Default 21.9.
    pub tau_max: f64,
    /// Voltage limit (V). Default 540.
    pub u_max: f64,
    /// Armature resistance estimate (ohm). Default 3.7.
    pub r_a: f64,
    /// Armature inductance estimate (H). Default 0.023.
    pub l_a: f64,
    /// Torque/back-EMF constant estimate (V s/rad = N m/A). Default 2.9.
    pub k_f: f64,
    /// Inertia estimate (kg m^2). Default 0.015.
    pub j: f64,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            ts: 250e-6,
            mode: MeasurementMode::Sensorless,
            alpha_c: 2.0 * PI * 200.0,
            alpha_o: 2.0 * PI * 40.0,
            alpha_s: 2.0 * PI * 4.0,
            i_max: 7.5,
            tau_max: 21.9,
            u_max: 540.0,
            r_a: 3.7,
            l_a: 0.023,
            k_f: 2.9,
            j: 0.015,
        }
    }
}

impl CascadeParams {
    pub fn validate(&self) -> ControlResult<()> {
        ensure_positive(self.ts, "ts")?;
        ensure_positive(self.alpha_c, "alpha_c")?;
        ensure_positive(self.alpha_o, "alpha_o")?;
        ensure_positive(self.alpha_s, "alpha_s")?;
        ensure_positive(self.i_max, "i_max")?;
        ensure_positive(self.tau_max, "tau_max")?;
        ensure_positive(self.u_max, "u_max")?;
        ensure_positive(self.r_a, "r_a")?;
        ensure_positive(self.l_a, "l_a")?;
        ensure_positive(self.k_f, "k_f")?;
        ensure_positive(self.j, "j")?;
        Ok(())
    }
}

/// Speed loop around a current loop, with optional sensorless speed estimate.
pub struct CascadeControl {
    params: CascadeParams,
    sample: SampleConfig,
    speed_pi: PiController,
    current_pi: PiController,
    w_m_ref: Box<dyn Signal>,
}

impl std::fmt::Debug for CascadeControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CascadeControl")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl CascadeControl {
    /// Create a cascade controller.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for non-positive or non-finite tuning.
    pub fn new(params: CascadeParams, w_m_ref: Box<dyn Signal>) -> ControlResult<Self> {
        params.validate()?;
        let sample = SampleConfig::new(params.ts)?;
        let speed_pi = PiController::new(
            "tau_ref",
            2.0 * params.alpha_s * params.j,
            params.alpha_s * params.alpha_s * params.j,
            params.tau_max,
        )?;
        // Internal-model tuning: the closed current loop is first order at alpha_c.
        let current_pi = PiController::new(
            "u_a",
            params.alpha_c * params.l_a,
            params.alpha_c * params.r_a,
            params.u_max,
        )?;
        Ok(Self {
            params,
            sample,
            speed_pi,
            current_pi,
            w_m_ref,
        })
    }

    pub fn params(&self) -> &CascadeParams {
        &self.params
    }

    pub fn speed_pi(&self) -> &PiController {
        &self.speed_pi
    }

    pub fn current_pi(&self) -> &PiController {
        &self.current_pi
    }

    /// Back-EMF speed estimate update.
    ///
    /// Uses `L di/dt = u - R i - k_f w` over the interval that just ended.
    fn observe_speed(&self, memory: &ControllerMemory, i_a: f64, u_prev: f64) -> ControlResult<f64> {
        let p = &self.params;
        let w_hat = memory.value(OBSERVER_SPEED)?;
        let i_prev = memory.value(OBSERVER_CURRENT)?;
        let di_dt = (i_a - i_prev) / p.ts;
        let i_mid = 0.5 * (i_a + i_prev);
        let w_raw = (u_prev - p.r_a * i_mid - p.l_a * di_dt) / p.k_f;
        Ok(w_hat + p.ts * p.alpha_o * (w_raw - w_hat))
    }
}

impl Controller for CascadeControl {
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
        ControllerMemory::new()
            .with(SPEED_INTEGRAL, 0.0)
            .with(CURRENT_INTEGRAL, 0.0)
            .with(OBSERVER_SPEED, 0.0)
            .with(OBSERVER_CURRENT, 0.0)
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
        let p = &self.params;

        let i_a = measurement[0];
        let w_m = match p.mode {
            MeasurementMode::Sensor => measurement[1],
            MeasurementMode::Sensorless => self.observe_speed(memory, i_a, prev_actuation[0])?,
        };

        let mut saturation = Vec::new();

        // Speed loop
        let w_m_ref = self.w_m_ref.value(t);
        let speed_prev = PiState::load(memory, SPEED_INTEGRAL)?;
        let (speed_state, tau_ref, warn) =
            self.speed_pi.update(&speed_prev, w_m_ref - w_m, 0.0, p.ts);
        saturation.extend(warn);

        let (i_ref, warn) = clamp_symmetric(tau_ref / p.k_f, p.i_max, "i_ref");
        // A limited current reference freezes the speed integral as well.
        let speed_state = if warn.is_some() { speed_prev } else { speed_state };
        saturation.extend(warn);

        // Current loop with back-EMF feedforward
        let current_state = PiState::load(memory, CURRENT_INTEGRAL)?;
        let (current_state, u_a, warn) =
            self.current_pi
                .update(&current_state, i_ref - i_a, p.k_f * w_m, p.ts);
        saturation.extend(warn);

        trace!(t, i_a, w_m, w_m_ref, i_ref, u_a, "cascade control step");

        let mut memory = memory.clone();
        speed_state.store(&mut memory, SPEED_INTEGRAL);
        current_state.store(&mut memory, CURRENT_INTEGRAL);
        memory.set(OBSERVER_SPEED, w_m);
        memory.set(OBSERVER_CURRENT, i_a);

        Ok(ControlStep {
            actuation: DVector::from_element(1, u_a),
            memory,
            saturation,
        })
    }
}
