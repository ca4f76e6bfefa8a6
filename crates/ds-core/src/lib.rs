//! ds-core: stable foundation for drivesim.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - units (uom SI types for drive quantities + constructors)
//! - signal (time-indexed references and disturbances)
//! - timing (opt-in wall-clock timers)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod signal;
pub mod timing;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use signal::{Constant, Ramp, Signal, Step};
