//! Integrators that advance a plant across one sampling interval.
//!
//! The actuation `u` is held constant over the whole call (zero-order hold).
//! Every integrator checks the state for non-finite values after each internal
//! step and reports [`SimError::IntegrationFailure`] with the time of the
//! failing step.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use ds_core::all_finite;

use crate::error::{SimError, SimResult};
use crate::plant::Plant;

/// Trait for time integrators.
pub trait Integrator {
    /// Advance `x` from `t0` to `t0 + h` with `u` held constant.
    fn integrate<P: Plant + ?Sized>(
        &self,
        plant: &P,
        t0: f64,
        x: &DVector<f64>,
        u: &DVector<f64>,
        h: f64,
    ) -> SimResult<DVector<f64>>;
}

fn check_finite(x: &DVector<f64>, t: f64) -> SimResult<()> {
    if all_finite(x) {
        Ok(())
    } else {
        Err(SimError::IntegrationFailure {
            t,
            what: "state became non-finite".to_string(),
        })
    }
}

fn check_derivative_dim(dx: &DVector<f64>, x: &DVector<f64>) -> SimResult<()> {
    if dx.len() == x.len() {
        Ok(())
    } else {
        Err(SimError::InvalidState {
            what: "plant derivative",
            expected: x.len(),
            actual: dx.len(),
        })
    }
}

/// Forward Euler (explicit, 1st order).
/// Calls `derivative()` once per substep.
#[derive(Clone, Debug)]
pub struct ForwardEuler {
    pub substeps: usize,
}

impl Integrator for ForwardEuler {
    fn integrate<P: Plant + ?Sized>(
        &self,
        plant: &P,
        t0: f64,
        x: &DVector<f64>,
        u: &DVector<f64>,
        h: f64,
    ) -> SimResult<DVector<f64>> {
        let n = self.substeps.max(1);
        let dt = h / n as f64;
        let mut x = x.clone();
        for k in 0..n {
            let t = t0 + k as f64 * dt;
            let xdot = plant.derivative(t, &x, u)?;
            check_derivative_dim(&xdot, &x)?;
            x += xdot * dt;
            check_finite(&x, t)?;
        }
        Ok(x)
    }
}

/// Classical RK4 (Runge-Kutta 4th order) integrator.
#[derive(Clone, Debug)]
pub struct Rk4 {
    pub substeps: usize,
}

impl Integrator for Rk4 {
    fn integrate<P: Plant + ?Sized>(
        &self,
        plant: &P,
        t0: f64,
        x: &DVector<f64>,
        u: &DVector<f64>,
        h: f64,
    ) -> SimResult<DVector<f64>> {
        let n = self.substeps.max(1);
        let dt = h / n as f64;
        let mut x = x.clone();
        for k in 0..n {
            let t = t0 + k as f64 * dt;

            let k1 = plant.derivative(t, &x, u)?;
            check_derivative_dim(&k1, &x)?;
            let k2 = plant.derivative(t + 0.5 * dt, &(&x + &k1 * (0.5 * dt)), u)?;
            let k3 = plant.derivative(t + 0.5 * dt, &(&x + &k2 * (0.5 * dt)), u)?;
            let k4 = plant.derivative(t + dt, &(&x + &k3 * dt), u)?;

            // Combine: x_new = x + (dt/6) * (k1 + 2*k2 + 2*k3 + k4)
            x += (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0);
            check_finite(&x, t)?;
        }
        Ok(x)
    }
}

/// Dormand-Prince 5(4) adaptive integrator.
///
/// The embedded 4th-order solution bounds the local truncation error of each
/// accepted step: `max_i |err_i| / (abs_tol + rel_tol * |x_i|) <= 1`.
#[derive(Clone, Debug)]
pub struct DormandPrince {
    pub abs_tol: f64,
    pub rel_tol: f64,
    /// Smallest internal step before the interval is declared a failure.
    pub min_step: f64,
    /// Internal step budget per interval.
    pub max_steps: usize,
}

impl Default for DormandPrince {
    fn default() -> Self {
        Self {
            abs_tol: 1e-8,
            rel_tol: 1e-6,
            min_step: 1e-12,
            max_steps: 10_000,
        }
    }
}

// Butcher tableau
const C: [f64; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];
#[rustfmt::skip]
const A: [&[f64]; 6] = [
    &[1.0/5.0],
    &[3.0/40.0, 9.0/40.0],
    &[44.0/45.0, -56.0/15.0, 32.0/9.0],
    &[19372.0/6561.0, -25360.0/2187.0, 64448.0/6561.0, -212.0/729.0],
    &[9017.0/3168.0, -355.0/33.0, 46732.0/5247.0, 49.0/176.0, -5103.0/18656.0],
    &[35.0/384.0, 0.0, 500.0/1113.0, 125.0/192.0, -2187.0/6784.0, 11.0/84.0],
];
// 5th-order weights equal the last row of A; error weights are b5 - b4.
const E: [f64; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

impl DormandPrince {
    /// One trial step: returns the 5th-order solution and the scaled error norm.
    fn trial<P: Plant + ?Sized>(
        &self,
        plant: &P,
        t: f64,
        x: &DVector<f64>,
        u: &DVector<f64>,
        dt: f64,
    ) -> SimResult<(DVector<f64>, f64)> {
        let mut k: Vec<DVector<f64>> = Vec::with_capacity(7);
        let k0 = plant.derivative(t, x, u)?;
        check_derivative_dim(&k0, x)?;
        k.push(k0);

        let stage_state = |k: &[DVector<f64>], row: &[f64]| {
            let mut xs = x.clone();
            for (kj, a) in k.iter().zip(row) {
                if *a != 0.0 {
                    xs += kj * (a * dt);
                }
            }
            xs
        };

        for (stage, row) in A[..A.len() - 1].iter().enumerate() {
            let xs = stage_state(&k, row);
            k.push(plant.derivative(t + C[stage + 1] * dt, &xs, u)?);
        }

        // Last row is the propagated 5th-order solution (FSAL stage).
        let x5 = stage_state(&k, A[A.len() - 1]);
        k.push(plant.derivative(t + dt, &x5, u)?);

        let mut err = DVector::zeros(x.len());
        for (kj, e) in k.iter().zip(E.iter()) {
            err += kj * (e * dt);
        }
        let scale = x5.map(|v| self.abs_tol + self.rel_tol * v.abs());
        let norm = err
            .component_div(&scale)
            .iter()
            .fold(0.0_f64, |m, v| if v.is_nan() { f64::NAN } else { m.max(v.abs()) });
        Ok((x5, norm))
    }
}

impl Integrator for DormandPrince {
    fn integrate<P: Plant + ?Sized>(
        &self,
        plant: &P,
        t0: f64,
        x: &DVector<f64>,
        u: &DVector<f64>,
        h: f64,
    ) -> SimResult<DVector<f64>> {
        let t_end = t0 + h;
        let mut t = t0;
        let mut x = x.clone();
        let mut dt = h;
        let mut steps = 0;

        while t < t_end {
            if steps >= self.max_steps {
                return Err(SimError::IntegrationFailure {
                    t,
                    what: format!("step budget of {} exhausted", self.max_steps),
                });
            }
            steps += 1;

            dt = dt.min(t_end - t);
            let (x_new, err_norm) = self.trial(plant, t, &x, u, dt)?;

            if err_norm.is_finite() && err_norm <= 1.0 && all_finite(&x_new) {
                t = if t_end - (t + dt) <= self.min_step {
                    t_end
                } else {
                    t + dt
                };
                x = x_new;
            }

            let scale = if err_norm.is_finite() {
                (0.9 / err_norm.max(1e-16).powf(0.2)).clamp(0.1, 5.0)
            } else {
                0.1
            };
            dt *= scale;

            if dt < self.min_step && t < t_end {
                return Err(SimError::IntegrationFailure {
                    t,
                    what: format!("step size {dt:e} fell below minimum {:e}", self.min_step),
                });
            }
        }

        check_finite(&x, t)?;
        Ok(x)
    }
}

/// Integrator selection for a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum IntegratorType {
    /// Forward Euler with `substeps` steps per sampling interval.
    ForwardEuler {
        #[serde(default = "one")]
        substeps: usize,
    },
    /// RK4 with `substeps` steps per sampling interval.
    Rk4 {
        #[serde(default = "one")]
        substeps: usize,
    },
    /// Adaptive Dormand-Prince 5(4).
    DormandPrince {
        #[serde(default = "default_abs_tol")]
        abs_tol: f64,
        #[serde(default = "default_rel_tol")]
        rel_tol: f64,
        #[serde(default = "default_min_step")]
        min_step: f64,
    },
}

fn one() -> usize {
    1
}

fn default_abs_tol() -> f64 {
    DormandPrince::default().abs_tol
}

fn default_rel_tol() -> f64 {
    DormandPrince::default().rel_tol
}

fn default_min_step() -> f64 {
    DormandPrince::default().min_step
}

impl Default for IntegratorType {
    fn default() -> Self {
        IntegratorType::Rk4 { substeps: 1 }
    }
}

impl IntegratorType {
    pub fn validate(&self) -> SimResult<()> {
        match self {
            IntegratorType::ForwardEuler { substeps } | IntegratorType::Rk4 { substeps } => {
                if *substeps == 0 {
                    return Err(SimError::Configuration {
                        what: "integrator substeps must be at least 1".to_string(),
                    });
                }
            }
            IntegratorType::DormandPrince {
                abs_tol,
                rel_tol,
                min_step,
            } => {
                ds_core::ensure_positive(*abs_tol, "abs_tol")?;
                ds_core::ensure_non_negative(*rel_tol, "rel_tol")?;
                ds_core::ensure_positive(*min_step, "min_step")?;
            }
        }
        Ok(())
    }

    /// Advance one interval with the selected method.
    pub fn integrate<P: Plant + ?Sized>(
        &self,
        plant: &P,
        t0: f64,
        x: &DVector<f64>,
        u: &DVector<f64>,
        h: f64,
    ) -> SimResult<DVector<f64>> {
        match self {
            IntegratorType::ForwardEuler { substeps } => ForwardEuler {
                substeps: *substeps,
            }
            .integrate(plant, t0, x, u, h),
            IntegratorType::Rk4 { substeps } => Rk4 {
                substeps: *substeps,
            }
            .integrate(plant, t0, x, u, h),
            IntegratorType::DormandPrince {
                abs_tol,
                rel_tol,
                min_step,
            } => DormandPrince {
                abs_tol: *abs_tol,
                rel_tol: *rel_tol,
                min_step: *min_step,
                ..Default::default()
            }
            .integrate(plant, t0, x, u, h),
        }
    }
}
