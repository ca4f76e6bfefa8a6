//! Per-unit base values for reporting.
//!
//! Three-phase machines use the usual peak-value convention:
//!
//! ```text
//! u = sqrt(2/3) U_nom     i = sqrt(2) I_nom     w = 2 pi f_nom
//! psi = u / w             p = 1.5 u i           tau = n_p p / w
//! ```
//!
//! DC machines take the ratings as they are: `u = U_nom`, `i = I_nom` and
//! `p = u i`, with the other bases derived the same way.
//!
//! Mechanical speed is scaled by `w / n_p`. The simulation itself always runs
//! in SI; these values only rescale exported columns.

use serde::{Deserialize, Serialize};

use ds_project::schema::NominalDef;

use crate::{ResultsError, ResultsResult};

/// Physical kind of a recorded column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Voltage,
    Current,
    /// Mechanical angular speed (rad/s).
    Speed,
    /// Mechanical angle (rad), never rescaled.
    Angle,
    Torque,
    FluxLinkage,
    Power,
}

/// How nominal ratings map to voltage, current and power bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseConvention {
    /// RMS line ratings scaled to phase peak values.
    #[default]
    ThreePhase,
    /// Ratings used directly.
    Dc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseValues {
    pub convention: BaseConvention,
    pub u: f64,
    pub i: f64,
    pub w: f64,
    pub psi: f64,
    pub p: f64,
    pub z: f64,
    pub l: f64,
    pub tau: f64,
    pub n_p: u32,
    /// Rated torque, kept for reference; the torque base is `tau`.
    pub tau_nom: f64,
    pub p_nom: f64,
}

impl BaseValues {
    /// Three-phase bases.
    pub fn from_nominal(
        u_nom: f64,
        i_nom: f64,
        f_nom: f64,
        tau_nom: f64,
        p_nom: f64,
        pole_pairs: u32,
    ) -> ResultsResult<Self> {
        Self::with_convention(
            BaseConvention::ThreePhase,
            u_nom,
            i_nom,
            f_nom,
            tau_nom,
            p_nom,
            pole_pairs,
        )
    }

    pub fn with_convention(
        convention: BaseConvention,
        u_nom: f64,
        i_nom: f64,
        f_nom: f64,
        tau_nom: f64,
        p_nom: f64,
        pole_pairs: u32,
    ) -> ResultsResult<Self> {
        for (what, v) in [
            ("u_nom", u_nom),
            ("i_nom", i_nom),
            ("f_nom", f_nom),
            ("tau_nom", tau_nom),
            ("p_nom", p_nom),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(ResultsError::InvalidBase {
                    what: format!("{what} must be positive and finite (got {v})"),
                });
            }
        }
        if pole_pairs == 0 {
            return Err(ResultsError::InvalidBase {
                what: "pole_pairs must be at least 1".to_string(),
            });
        }

        let (u, i, p) = match convention {
            BaseConvention::ThreePhase => {
                let u = (2.0_f64 / 3.0).sqrt() * u_nom;
                let i = 2.0_f64.sqrt() * i_nom;
                (u, i, 1.5 * u * i)
            }
            BaseConvention::Dc => (u_nom, i_nom, u_nom * i_nom),
        };
        let w = 2.0 * std::f64::consts::PI * f_nom;
        let z = u / i;
        Ok(Self {
            convention,
            u,
            i,
            w,
            psi: u / w,
            p,
            z,
            l: z / w,
            tau: pole_pairs as f64 * p / w,
            n_p: pole_pairs,
            tau_nom,
            p_nom,
        })
    }

    pub fn from_def(def: &NominalDef, convention: BaseConvention) -> ResultsResult<Self> {
        Self::with_convention(
            convention,
            def.u_nom,
            def.i_nom,
            def.f_nom,
            def.tau_nom,
            def.p_nom,
            def.pole_pairs,
        )
    }

    /// Divisor that turns an SI value of `quantity` into per-unit.
    pub fn base_for(&self, quantity: Quantity) -> f64 {
        match quantity {
            Quantity::Voltage => self.u,
            Quantity::Current => self.i,
            Quantity::Speed => self.w / self.n_p as f64,
            Quantity::Angle => 1.0,
            Quantity::Torque => self.tau,
            Quantity::FluxLinkage => self.psi,
            Quantity::Power => self.p,
        }
    }

    pub fn to_per_unit(&self, quantity: Quantity, value: f64) -> f64 {
        value / self.base_for(quantity)
    }
}
