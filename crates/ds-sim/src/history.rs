//! Recorded trajectory of a run.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use ds_controls::SaturationWarning;

/// One sampling interval, recorded at its end time `t`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub t: f64,
    /// Plant state at `t`.
    pub x: DVector<f64>,
    /// Actuation held over the interval ending at `t`.
    pub actuation: DVector<f64>,
    /// Command the controller produced at the start of the interval.
    pub command: DVector<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub saturation: Vec<SaturationWarning>,
}

/// Ordered samples plus the state the run started from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub initial_state: DVector<f64>,
    samples: Vec<Sample>,
}

impl History {
    pub fn new(initial_state: DVector<f64>) -> Self {
        Self {
            initial_state,
            samples: Vec::new(),
        }
    }

    pub fn with_capacity(initial_state: DVector<f64>, capacity: usize) -> Self {
        Self {
            initial_state,
            samples: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Final state, or the initial state if nothing was recorded.
    pub fn final_state(&self) -> &DVector<f64> {
        self.samples
            .last()
            .map(|s| &s.x)
            .unwrap_or(&self.initial_state)
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.t).collect()
    }

    /// State component `i` over time. Missing components read as NaN.
    pub fn state_series(&self, i: usize) -> Vec<f64> {
        self.samples
            .iter()
            .map(|s| s.x.get(i).copied().unwrap_or(f64::NAN))
            .collect()
    }

    /// Applied actuation component `i` over time.
    pub fn actuation_series(&self, i: usize) -> Vec<f64> {
        self.samples
            .iter()
            .map(|s| s.actuation.get(i).copied().unwrap_or(f64::NAN))
            .collect()
    }

    /// Total number of saturation warnings raised during the run.
    pub fn saturation_count(&self) -> usize {
        self.samples.iter().map(|s| s.saturation.len()).sum()
    }
}

impl From<(DVector<f64>, Vec<Sample>)> for History {
    fn from((initial_state, samples): (DVector<f64>, Vec<Sample>)) -> Self {
        Self {
            initial_state,
            samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64, x: f64, u: f64, sat: bool) -> Sample {
        Sample {
            t,
            x: DVector::from_vec(vec![x, 2.0 * x]),
            actuation: DVector::from_element(1, u),
            command: DVector::from_element(1, u),
            saturation: if sat {
                vec![SaturationWarning::new("u", 2.0 * u, u)]
            } else {
                vec![]
            },
        }
    }

    #[test]
    fn series_accessors() {
        let mut h = History::new(DVector::zeros(2));
        assert_eq!(h.final_state(), &DVector::zeros(2));
        h.push(sample(0.1, 1.0, 5.0, false));
        h.push(sample(0.2, 2.0, 6.0, true));
        assert_eq!(h.len(), 2);
        assert_eq!(h.times(), vec![0.1, 0.2]);
        assert_eq!(h.state_series(1), vec![2.0, 4.0]);
        assert_eq!(h.actuation_series(0), vec![5.0, 6.0]);
        assert!(h.state_series(5)[0].is_nan());
        assert_eq!(h.saturation_count(), 1);
        assert_eq!(h.final_state()[0], 2.0);
    }
}
