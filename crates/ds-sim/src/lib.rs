//! Continuous/discrete co-simulation for drivesim.
//!
//! Provides:
//! - the [`Plant`] contract for continuous-time models
//! - fixed-step (forward Euler, RK4) and adaptive (Dormand-Prince) integrators
//! - a computational-delay buffer for actuation commands
//! - the [`Simulation`] harness that samples the plant, calls the controller,
//!   holds the actuation over each period and records a [`History`]

pub mod delay;
pub mod error;
pub mod history;
pub mod integrator;
pub mod plant;
pub mod sim;

pub use delay::{DelayBuffer, delay_periods};
pub use error::{SimError, SimResult};
pub use history::{History, Sample};
pub use integrator::{DormandPrince, ForwardEuler, Integrator, IntegratorType, Rk4};
pub use plant::{Plant, check_plant_dims};
pub use sim::{CancelHandle, RunState, RunSummary, SimOptions, SimProgress, Simulation};
