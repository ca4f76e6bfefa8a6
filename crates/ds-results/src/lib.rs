//! ds-results: run cache, history storage and reporting helpers.

pub mod base;
pub mod export;
pub mod hash;
pub mod store;
pub mod types;

pub use base::{BaseConvention, BaseValues, Quantity};
pub use export::{to_csv, to_csv_per_unit};
pub use hash::compute_run_id;
pub use store::RunStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    #[error("Invalid base values: {what}")]
    InvalidBase { what: String },
}
