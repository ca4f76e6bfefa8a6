//! Time-indexed signals: references and disturbances.
//!
//! A signal is a pure function from simulation time (seconds) to a value. It is
//! evaluated synchronously by whoever owns it (a controller for references, a
//! plant for disturbances) and may be discontinuous.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pure function of time.
pub trait Signal: Send + Sync {
    /// Value at time `t` (seconds).
    fn value(&self, t: f64) -> f64;
}

impl<F> Signal for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn value(&self, t: f64) -> f64 {
        self(t)
    }
}

/// Time-invariant signal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Constant(pub f64);

impl Signal for Constant {
    fn value(&self, _t: f64) -> f64 {
        self.0
    }
}

/// Step from `before` to `after`.
///
/// The step is strict: at `t == t0` the value is still `before`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Step {
    pub t0: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub before: f64,
    pub after: f64,
}

impl Step {
    pub fn new(t0: f64, before: f64, after: f64) -> Self {
        Self { t0, before, after }
    }

    /// Step from zero.
    pub fn at(t0: f64, after: f64) -> Self {
        Self::new(t0, 0.0, after)
    }
}

impl Signal for Step {
    fn value(&self, t: f64) -> f64 {
        if t > self.t0 { self.after } else { self.before }
    }
}

/// Linear ramp from `from` at `t0` to `to` at `t1`, held outside.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ramp {
    pub t0: f64,
    pub t1: f64,
    pub from: f64,
    pub to: f64,
}

impl Signal for Ramp {
    fn value(&self, t: f64) -> f64 {
        if t <= self.t0 {
            self.from
        } else if t >= self.t1 {
            self.to
        } else {
            let frac = (t - self.t0) / (self.t1 - self.t0);
            self.from + frac * (self.to - self.from)
        }
    }
}
