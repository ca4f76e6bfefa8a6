use nalgebra::DVector;

use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Accept only finite, strictly positive values (physical constants, periods).
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, CoreError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(CoreError::InvalidArg { what, value: v })
    }
}

/// Accept finite values that are zero or greater (friction, initial offsets).
pub fn ensure_non_negative(v: Real, what: &'static str) -> Result<Real, CoreError> {
    let v = ensure_finite(v, what)?;
    if v >= 0.0 {
        Ok(v)
    } else {
        Err(CoreError::InvalidArg { what, value: v })
    }
}

/// True when every component of `x` is finite.
pub fn all_finite(x: &DVector<Real>) -> bool {
    x.iter().all(|v| v.is_finite())
}

/// Number of whole periods of length `period` needed to cover `span`.
///
/// A span that is an exact multiple of the period up to rounding (e.g.
/// `1.5 / 250e-6`) is not bumped to the next integer.
pub fn periods_to_cover(span: Real, period: Real) -> usize {
    let ratio = span / period;
    let nearest = ratio.round();
    if nearly_equal(ratio, nearest, Tolerances::default()) {
        nearest as usize
    } else {
        ratio.ceil() as usize
    }
}
