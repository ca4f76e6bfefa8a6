//! Actuation limits.
//!
//! A command that exceeds its limit is clamped and the clamp is reported as a
//! [`SaturationWarning`]. Saturation never fails a controller step.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Non-fatal notice that a computed quantity was clamped to its limit.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{quantity} saturated: requested {requested:.4}, limited to {limit:.4}")]
pub struct SaturationWarning {
    /// Name of the limited quantity (e.g. `"i_ref"`, `"u"`).
    pub quantity: String,
    /// Magnitude before clamping.
    pub requested: f64,
    /// Configured limit.
    pub limit: f64,
}

impl SaturationWarning {
    pub fn new(quantity: impl Into<String>, requested: f64, limit: f64) -> Self {
        Self {
            quantity: quantity.into(),
            requested,
            limit,
        }
    }
}

/// Clamp a scalar to `[-limit, limit]`.
///
/// A clamped value is exactly `±limit`.
pub fn clamp_symmetric(
    value: f64,
    limit: f64,
    quantity: &str,
) -> (f64, Option<SaturationWarning>) {
    if value.abs() > limit {
        let clamped = limit.copysign(value);
        (
            clamped,
            Some(SaturationWarning::new(quantity, value.abs(), limit)),
        )
    } else {
        (value, None)
    }
}

/// Scale a vector down to Euclidean magnitude `limit` if it exceeds it.
///
/// Direction is preserved.
pub fn clamp_magnitude(
    value: &DVector<f64>,
    limit: f64,
    quantity: &str,
) -> (DVector<f64>, Option<SaturationWarning>) {
    let norm = value.norm();
    if norm > limit {
        (
            value * (limit / norm),
            Some(SaturationWarning::new(quantity, norm, limit)),
        )
    } else {
        (value.clone(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_within_limit_untouched() {
        let (v, warn) = clamp_symmetric(0.5, 1.0, "u");
        assert_eq!(v, 0.5);
        assert!(warn.is_none());
    }

    #[test]
    fn scalar_clamped_exactly_to_limit() {
        let (v, warn) = clamp_symmetric(-7.3, 2.5, "tau_ref");
        assert_eq!(v, -2.5);
        let warn = warn.unwrap();
        assert_eq!(warn.quantity, "tau_ref");
        assert_eq!(warn.requested, 7.3);
        assert_eq!(warn.limit, 2.5);
    }

    #[test]
    fn vector_scaled_to_limit() {
        let u = DVector::from_vec(vec![300.0, 400.0]);
        let (clamped, warn) = clamp_magnitude(&u, 100.0, "u_s");
        assert!((clamped.norm() - 100.0).abs() < 1e-12);
        assert!((clamped[0] - 60.0).abs() < 1e-12);
        assert!((clamped[1] - 80.0).abs() < 1e-12);
        assert_eq!(warn.unwrap().requested, 500.0);
    }

    #[test]
    fn warning_message_names_quantity() {
        let warn = SaturationWarning::new("i_ref", 12.0, 7.5);
        assert!(warn.to_string().starts_with("i_ref saturated"));
    }

    proptest::proptest! {
        #[test]
        fn clamp_never_exceeds_limit(value in -1e6f64..1e6, limit in 1e-3f64..1e3) {
            let (v, warn) = clamp_symmetric(value, limit, "x");
            proptest::prop_assert!(v.abs() <= limit);
            proptest::prop_assert_eq!(warn.is_some(), value.abs() > limit);
            if warn.is_some() {
                proptest::prop_assert_eq!(v.abs(), limit);
            }
        }

        #[test]
        fn magnitude_clamp_matches_limit(a in -1e3f64..1e3, b in -1e3f64..1e3, limit in 1e-2f64..1e2) {
            let u = DVector::from_vec(vec![a, b]);
            let (v, warn) = clamp_magnitude(&u, limit, "u");
            if warn.is_some() {
                proptest::prop_assert!((v.norm() - limit).abs() <= 1e-9 * limit);
            } else {
                proptest::prop_assert_eq!(v, u);
            }
        }
    }
}
