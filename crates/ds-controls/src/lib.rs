//! Discrete-time controllers for drivesim.
//!
//! A controller is invoked once per sampling period by the simulation harness.
//! It reads a measurement vector and the actuation applied over the previous
//! interval, and returns a new actuation command together with its updated
//! memory.
//!
//! # Architecture
//!
//! - All persistent controller state lives in [`ControllerMemory`], passed in
//!   and returned by value. `Controller::step` takes `&self`, so replaying a
//!   sequence of inputs from the same memory always yields the same outputs.
//! - Actuation beyond a configured limit is clamped, never rejected; the clamp
//!   is reported as a [`SaturationWarning`].
//! - Reference signals are plain functions of time owned by the controller.

pub mod cascade;
pub mod controller;
pub mod error;
pub mod memory;
pub mod pi;
pub mod sampled;
pub mod saturation;
pub mod scalar;
pub mod speed;

pub use cascade::{CascadeControl, CascadeParams, MeasurementMode};
pub use controller::{ControlStep, Controller, check_dim};
pub use error::{ControlError, ControlResult};
pub use memory::ControllerMemory;
pub use pi::{PiController, PiState};
pub use sampled::SampleConfig;
pub use saturation::{SaturationWarning, clamp_magnitude, clamp_symmetric};
pub use scalar::{ScalarControl, ScalarParams};
pub use speed::{SpeedControl, SpeedControlParams};
