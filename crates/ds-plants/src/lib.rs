//! ds-plants: continuous-time models driven by the simulation harness.
//!
//! Provides:
//! - `Mechanics`: rigid rotor with load torque and viscous friction
//! - `Converter`: voltage-limited DC converter (ideal, averaged)
//! - `DcMotorDrive`: separately excited DC machine fed by a converter
//!
//! All plants implement [`ds_sim::Plant`]. Parameters are validated at
//! construction; time-varying disturbances are [`ds_core::Signal`] hooks.

pub mod converter;
pub mod dc_motor;
pub mod mechanics;

pub use converter::Converter;
pub use dc_motor::{DcMotorDrive, DcMotorParams};
pub use mechanics::{Mechanics, MechanicsParams};
