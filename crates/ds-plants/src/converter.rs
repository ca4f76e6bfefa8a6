//! Averaged DC converter.

use serde::{Deserialize, Serialize};

use ds_core::ensure_positive;
use ds_core::units::{Voltage, si};
use ds_sim::SimResult;

/// Ideal four-quadrant converter fed from a stiff DC link.
///
/// The realisable output voltage is limited to `[-u_dc, u_dc]`; within that
/// range the reference is reproduced exactly (switching-cycle average).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Converter {
    /// DC-link voltage (V). Default 540.
    pub u_dc: f64,
}

impl Default for Converter {
    fn default() -> Self {
        Self { u_dc: 540.0 }
    }
}

impl Converter {
    pub fn new(u_dc: f64) -> SimResult<Self> {
        ensure_positive(u_dc, "u_dc")?;
        Ok(Self { u_dc })
    }

    pub fn from_quantity(u_dc: Voltage) -> SimResult<Self> {
        Self::new(si::volts(u_dc))
    }

    /// Voltage the converter actually produces for a reference.
    pub fn output(&self, u_ref: f64) -> f64 {
        u_ref.clamp(-self.u_dc, self.u_dc)
    }
}
