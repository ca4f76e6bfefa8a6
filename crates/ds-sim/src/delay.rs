//! Computational delay between a controller command and the actuator.

use std::collections::VecDeque;

use nalgebra::DVector;

use crate::error::{SimError, SimResult};

/// FIFO of pending actuation commands.
///
/// With depth `d`, the command pushed at sampling instant `n` is released at
/// instant `n + d`. Until `d` commands have been pushed the initial actuation
/// is released instead. A depth of 0 passes commands straight through.
#[derive(Clone, Debug)]
pub struct DelayBuffer {
    depth: usize,
    queue: VecDeque<DVector<f64>>,
    initial: DVector<f64>,
}

impl DelayBuffer {
    pub fn new(depth: usize, initial: DVector<f64>) -> Self {
        Self {
            depth,
            queue: VecDeque::with_capacity(depth + 1),
            initial,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of commands currently held back.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Push the newest command and return the one to apply now.
    pub fn push(&mut self, command: DVector<f64>) -> DVector<f64> {
        self.queue.push_back(command);
        if self.queue.len() > self.depth {
            self.queue
                .pop_front()
                .unwrap_or_else(|| self.initial.clone())
        } else {
            self.initial.clone()
        }
    }
}

/// Convert a delay given in sampling periods to a whole count.
///
/// Fractional, negative and non-finite values are rejected.
pub fn delay_periods(delay: f64) -> SimResult<usize> {
    if !delay.is_finite() || delay < 0.0 || delay.fract() != 0.0 {
        return Err(SimError::Configuration {
            what: format!("delay must be a whole number of sampling periods, got {delay}"),
        });
    }
    Ok(delay as usize)
}
