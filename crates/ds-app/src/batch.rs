//! Parallel execution of independent scenarios.
//!
//! Each scenario gets its own simulation on a rayon worker; nothing is
//! shared between runs, so results are identical to sequential execution
//! and come back in input order.

use std::path::PathBuf;

use rayon::prelude::*;
use tracing::info;

use crate::error::AppResult;
use crate::run_service::{RunOptions, RunRequest, RunResponse, ensure_run};

pub fn run_batch(paths: &[PathBuf], options: &RunOptions) -> Vec<AppResult<RunResponse>> {
    info!(scenarios = paths.len(), "Starting batch");
    let results: Vec<AppResult<RunResponse>> = paths
        .par_iter()
        .map(|path| {
            ensure_run(&RunRequest {
                scenario_path: path,
                options: options.clone(),
            })
        })
        .collect();
    let failed = results.iter().filter(|r| r.is_err()).count();
    info!(scenarios = paths.len(), failed, "Batch finished");
    results
}
