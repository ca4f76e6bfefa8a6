//! Shared application service layer for drivesim.
//!
//! Centralizes what the CLI needs: scenario loading, compilation of a
//! scenario into a runnable simulation, cached run execution, batch runs and
//! queries over stored results.

pub mod batch;
pub mod error;
pub mod progress;
pub mod query;
pub mod run_service;
pub mod runtime_compile;
pub mod scenario_service;

pub use batch::run_batch;
pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage, SimProgressInfo};
pub use query::{RunOverview, extract_series, get_run_overview, per_unit_bases};
pub use run_service::{
    RunOptions, RunRequest, RunResponse, RunTimingSummary, ensure_run, ensure_run_with_progress,
    history_to_records, list_runs, load_run, run_in_memory,
};
pub use runtime_compile::{
    CompiledScenario, DriveSimulation, build_controller, build_plant, compile_scenario,
    integrator_type, sim_options,
};
pub use scenario_service::{ScenarioSummary, load_scenario, save_scenario, summarize, validate};
