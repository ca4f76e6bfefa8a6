//! Rigid-body rotor mechanics.
//!
//! State `[w_m, theta_m]`, input `[tau_m]`:
//!
//! ```text
//! J dw_m/dt = tau_m - tau_L(t) - B w_m
//!   dtheta_m/dt = w_m
//! ```

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use ds_core::units::{Inertia, si};
use ds_core::{Constant, Signal, ensure_non_negative, ensure_positive};
use ds_sim::{Plant, SimResult, check_plant_dims};

/// Mechanical parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MechanicsParams {
    /// Total moment of inertia (kg m^2). Default 0.015.
    pub j: f64,
    /// Viscous friction coefficient (N m s/rad). Default 0.
    pub b: f64,
}

impl Default for MechanicsParams {
    fn default() -> Self {
        Self { j: 0.015, b: 0.0 }
    }
}

impl MechanicsParams {
    pub fn validate(&self) -> SimResult<()> {
        ensure_positive(self.j, "j")?;
        ensure_non_negative(self.b, "b")?;
        Ok(())
    }
}

pub struct Mechanics {
    params: MechanicsParams,
    tau_l: Box<dyn Signal>,
}

impl std::fmt::Debug for Mechanics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mechanics")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Mechanics {
    pub fn new(params: MechanicsParams, tau_l: Box<dyn Signal>) -> SimResult<Self> {
        params.validate()?;
        Ok(Self { params, tau_l })
    }

    /// Unloaded, frictionless rotor.
    pub fn free(j: f64) -> SimResult<Self> {
        Self::new(MechanicsParams { j, b: 0.0 }, Box::new(Constant(0.0)))
    }

    pub fn from_quantities(j: Inertia, b: f64, tau_l: Box<dyn Signal>) -> SimResult<Self> {
        Self::new(MechanicsParams { j: si::kg_m2(j), b }, tau_l)
    }

    pub fn params(&self) -> &MechanicsParams {
        &self.params
    }

    /// Load torque at `t`.
    pub fn load_torque(&self, t: f64) -> f64 {
        self.tau_l.value(t)
    }

    /// Angular acceleration for a given shaft torque.
    pub fn acceleration(&self, t: f64, w_m: f64, tau_m: f64) -> f64 {
        (tau_m - self.load_torque(t) - self.params.b * w_m) / self.params.j
    }
}

impl Plant for Mechanics {
    fn state_dim(&self) -> usize {
        2
    }

    fn input_dim(&self) -> usize {
        1
    }

    fn initial_state(&self) -> DVector<f64> {
        DVector::zeros(2)
    }

    fn derivative(&self, t: f64, x: &DVector<f64>, u: &DVector<f64>) -> SimResult<DVector<f64>> {
        check_plant_dims(self, x, u)?;
        let w_m = x[0];
        Ok(DVector::from_vec(vec![self.acceleration(t, w_m, u[0]), w_m]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ds_core::Step;
    use ds_core::units::kg_m2;

    #[test]
    fn rejects_bad_inertia() {
        assert!(Mechanics::free(0.0).is_err());
        assert!(Mechanics::free(f64::NAN).is_err());
        let bad = MechanicsParams { j: 0.01, b: -1.0 };
        assert!(Mechanics::new(bad, Box::new(Constant(0.0))).is_err());
    }

    #[test]
    fn torque_balance() {
        let m = Mechanics::from_quantities(kg_m2(0.5), 0.1, Box::new(Step::at(1.0, 2.0))).unwrap();
        let x = DVector::from_vec(vec![10.0, 0.0]);
        let u = DVector::from_element(1, 4.0);
        let before = m.derivative(0.5, &x, &u).unwrap();
        assert!((before[0] - (4.0 - 1.0) / 0.5).abs() < 1e-12);
        assert_eq!(before[1], 10.0);
        let after = m.derivative(1.5, &x, &u).unwrap();
        assert!((after[0] - (4.0 - 2.0 - 1.0) / 0.5).abs() < 1e-12);
    }

    #[test]
    fn wrong_input_width_is_invalid_state() {
        let m = Mechanics::free(0.015).unwrap();
        assert!(m.derivative(0.0, &DVector::zeros(2), &DVector::zeros(2)).is_err());
    }
}
