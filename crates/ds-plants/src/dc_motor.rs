//! Separately excited DC machine fed by a converter.
//!
//! State `[i_a, w_m, theta_m]`, input `[u_ref]` (converter voltage reference),
//! output `[i_a, w_m]`:
//!
//! ```text
//! L_a di_a/dt = u_a - R_a i_a - k_f w_m      u_a = converter(u_ref)
//! J  dw_m/dt  = k_f i_a - tau_L(t) - B w_m
//! ```

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use ds_core::ensure_positive;
use ds_core::units::{FluxLinkage, Inductance, Resistance, si};
use ds_sim::{Plant, SimResult, check_plant_dims};

use crate::converter::Converter;
use crate::mechanics::Mechanics;

/// Electrical parameters of the machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DcMotorParams {
    /// Armature resistance (ohm). Default 3.7.
    pub r_a: f64,
    /// Armature inductance (H). Default 0.023.
    pub l_a: f64,
    /// Flux linkage / torque constant (V s/rad). Default 2.9.
    pub k_f: f64,
}

impl Default for DcMotorParams {
    fn default() -> Self {
        Self {
            r_a: 3.7,
            l_a: 0.023,
            k_f: 2.9,
        }
    }
}

impl DcMotorParams {
    pub fn validate(&self) -> SimResult<()> {
        ensure_positive(self.r_a, "r_a")?;
        ensure_positive(self.l_a, "l_a")?;
        ensure_positive(self.k_f, "k_f")?;
        Ok(())
    }

    pub fn from_quantities(r_a: Resistance, l_a: Inductance, k_f: FluxLinkage) -> SimResult<Self> {
        let params = Self {
            r_a: si::ohms(r_a),
            l_a: si::henries(l_a),
            k_f: si::webers(k_f),
        };
        params.validate()?;
        Ok(params)
    }

    /// Electromagnetic torque for an armature current.
    pub fn torque(&self, i_a: f64) -> f64 {
        self.k_f * i_a
    }
}

/// Converter + DC machine + rotor mechanics.
#[derive(Debug)]
pub struct DcMotorDrive {
    motor: DcMotorParams,
    mechanics: Mechanics,
    converter: Converter,
}

impl DcMotorDrive {
    pub fn new(motor: DcMotorParams, mechanics: Mechanics, converter: Converter) -> SimResult<Self> {
        motor.validate()?;
        ensure_positive(converter.u_dc, "u_dc")?;
        Ok(Self {
            motor,
            mechanics,
            converter,
        })
    }

    pub fn motor(&self) -> &DcMotorParams {
        &self.motor
    }

    pub fn mechanics(&self) -> &Mechanics {
        &self.mechanics
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }
}

impl Plant for DcMotorDrive {
    fn state_dim(&self) -> usize {
        3
    }

    fn input_dim(&self) -> usize {
        1
    }

    fn output_dim(&self) -> usize {
        2
    }

    fn initial_state(&self) -> DVector<f64> {
        DVector::zeros(3)
    }

    fn derivative(&self, t: f64, x: &DVector<f64>, u: &DVector<f64>) -> SimResult<DVector<f64>> {
        check_plant_dims(self, x, u)?;
        let (i_a, w_m) = (x[0], x[1]);
        let u_a = self.converter.output(u[0]);
        let m = &self.motor;

        let di_a = (u_a - m.r_a * i_a - m.k_f * w_m) / m.l_a;
        let dw_m = self.mechanics.acceleration(t, w_m, m.torque(i_a));
        Ok(DVector::from_vec(vec![di_a, dw_m, w_m]))
    }

    fn output(&self, _t: f64, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_vec(vec![x[0], x[1]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ds_core::units::{henries, ohms, webers};

    fn drive() -> DcMotorDrive {
        DcMotorDrive::new(
            DcMotorParams::default(),
            Mechanics::free(0.015).unwrap(),
            Converter::new(100.0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn params_from_quantities() {
        let p = DcMotorParams::from_quantities(ohms(1.0), henries(0.01), webers(0.5)).unwrap();
        assert_eq!(p.r_a, 1.0);
        assert_eq!(p.torque(4.0), 2.0);
        assert!(DcMotorParams::from_quantities(ohms(0.0), henries(0.01), webers(0.5)).is_err());
    }

    #[test]
    fn standstill_current_rise_uses_limited_voltage() {
        let d = drive();
        let dx = d
            .derivative(0.0, &d.initial_state(), &DVector::from_element(1, 1000.0))
            .unwrap();
        // Converter caps the voltage at 100 V.
        assert!((dx[0] - 100.0 / 0.023).abs() < 1e-9);
        assert_eq!(dx[1], 0.0);
        assert_eq!(dx[2], 0.0);
    }

    #[test]
    fn output_is_current_and_speed() {
        let d = drive();
        let y = d.output(0.0, &DVector::from_vec(vec![1.0, 2.0, 3.0]));
        assert_eq!(y, DVector::from_vec(vec![1.0, 2.0]));
        assert_eq!(d.output_dim(), 2);
    }
}
