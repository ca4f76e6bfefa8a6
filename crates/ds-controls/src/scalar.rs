//! Open-loop scalar control of a DC machine drive.
//!
//! Measurement: `[i_a, w_m]`. Actuation: `[u_a]`.
//! The voltage follows the speed reference through the back-EMF constant,
//! plus resistive-drop compensation from the measured current:
//! `u_a = k_f * w_m_ref + r_a * i_a`, limited to `u_max`. Measured speed is
//! never used.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::trace;

use ds_core::{Signal, ensure_non_negative, ensure_positive};

use crate::controller::{ControlStep, Controller, check_dim};
use crate::error::ControlResult;
use crate::memory::ControllerMemory;
use crate::sampled::SampleConfig;
use crate::saturation::clamp_symmetric;

/// Scalar controller model estimates and limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalarParams {
    /// Sampling period (s). Default 250 us.
    pub ts: f64,
    /// Voltage limit (V). Default 540.
    pub u_max: f64,
    /// Back-EMF constant estimate (V s/rad). Default 2.9.
    pub k_f: f64,
    /// Resistance used for IR compensation (ohm); zero disables it. Default 3.7.
    pub r_a: f64,
}

impl Default for ScalarParams {
    fn default() -> Self {
        Self {
            ts: 250e-6,
            u_max: 540.0,
            k_f: 2.9,
            r_a: 3.7,
        }
    }
}

impl ScalarParams {
    pub fn validate(&self) -> ControlResult<()> {
        ensure_positive(self.ts, "ts")?;
        ensure_positive(self.u_max, "u_max")?;
        ensure_positive(self.k_f, "k_f")?;
        ensure_non_negative(self.r_a, "r_a")?;
        Ok(())
    }
}

/// Voltage-per-speed control without a speed loop.
pub struct ScalarControl {
    params: ScalarParams,
    sample: SampleConfig,
    w_m_ref: Box<dyn Signal>,
}

impl std::fmt::Debug for ScalarControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalarControl")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl ScalarControl {
    pub fn new(params: ScalarParams, w_m_ref: Box<dyn Signal>) -> ControlResult<Self> {
        params.validate()?;
        let sample = SampleConfig::new(params.ts)?;
        Ok(Self {
            params,
            sample,
            w_m_ref,
        })
    }

    pub fn params(&self) -> &ScalarParams {
        &self.params
    }
}

impl Controller for ScalarControl {
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
        let w_m_ref = self.w_m_ref.value(t);
        let (u_a, warn) = clamp_symmetric(p.k_f * w_m_ref + p.r_a * i_a, p.u_max, "u_a");
        trace!(t, i_a, w_m_ref, u_a, "scalar control step");

        Ok(ControlStep {
            actuation: DVector::from_element(1, u_a),
            memory: memory.clone(),
            saturation: warn.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ds_core::Constant;

    fn step_at(c: &ScalarControl, i_a: f64, w_m: f64) -> ControlStep {
        c.step(
            0.0,
            &DVector::from_vec(vec![i_a, w_m]),
            &c.initial_actuation(),
            &c.initial_memory(),
        )
        .unwrap()
    }

    #[test]
    fn voltage_follows_reference_with_ir_compensation() {
        let c = ScalarControl::new(ScalarParams::default(), Box::new(Constant(100.0))).unwrap();
        let step = step_at(&c, 2.0, 0.0);
        assert!((step.actuation[0] - (2.9 * 100.0 + 3.7 * 2.0)).abs() < 1e-9);
        assert!(step.saturation.is_empty());
    }

    #[test]
    fn measured_speed_is_ignored() {
        let c = ScalarControl::new(ScalarParams::default(), Box::new(Constant(50.0))).unwrap();
        assert_eq!(step_at(&c, 1.0, 0.0), step_at(&c, 1.0, 80.0));
    }

    #[test]
    fn voltage_is_limited() {
        let c = ScalarControl::new(ScalarParams::default(), Box::new(Constant(1e3))).unwrap();
        let step = step_at(&c, 0.0, 0.0);
        assert_eq!(step.actuation[0], 540.0);
        assert_eq!(step.saturation.len(), 1);
        assert_eq!(step.saturation[0].quantity, "u_a");
    }

    #[test]
    fn invalid_params_rejected() {
        let params = ScalarParams {
            r_a: -1.0,
            ..Default::default()
        };
        assert!(ScalarControl::new(params, Box::new(Constant(0.0))).is_err());
    }
}
