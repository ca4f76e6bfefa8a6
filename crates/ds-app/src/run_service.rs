//! Run execution and caching service.

use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};

use ds_project::schema::Scenario;
use ds_results::{HistoryRecord, RunManifest, RunStatus, RunStore, SaturationRecord};
use ds_sim::{History, RunState, RunSummary, SimError};

use crate::error::{AppError, AppResult};
use crate::progress::{RunProgressEvent, RunStage, SimProgressInfo};
use crate::runtime_compile::{self, CompiledScenario};
use crate::scenario_service;

/// Options for running simulations.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    pub solver_version: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            solver_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub scenario_path: &'a Path,
    pub options: RunOptions,
}

/// Wall-clock breakdown of a run request.
#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub compile_time_s: f64,
    pub run_time_s: f64,
    pub save_time_s: f64,
    pub load_cache_time_s: f64,
    pub total_time_s: f64,
    pub steps: usize,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub loaded_from_cache: bool,
    pub timing: RunTimingSummary,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    sim: Option<SimProgressInfo>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            sim,
        });
    }
}

/// Execute or load a run based on request.
pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    ensure_run_with_progress(request, None)
}

/// Execute or load a run and stream progress events.
///
/// An aborted simulation still produces a stored run; its manifest carries
/// the abort time and reason.
pub fn ensure_run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut timing = RunTimingSummary::default();

    emit_progress(
        &mut progress_cb,
        RunStage::LoadingScenario,
        started,
        Some("Loading scenario".to_string()),
        None,
    );
    let scenario = scenario_service::load_scenario(request.scenario_path)?;

    emit_progress(
        &mut progress_cb,
        RunStage::CheckingCache,
        started,
        Some("Checking run cache".to_string()),
        None,
    );
    let run_id = ds_results::compute_run_id(&scenario, &request.options.solver_version)?;
    let store = RunStore::for_scenario(request.scenario_path)?;

    if request.options.use_cache && store.has_run(&run_id) {
        emit_progress(
            &mut progress_cb,
            RunStage::LoadingCachedResult,
            started,
            Some("Loading cached run".to_string()),
            None,
        );

        let load_started = Instant::now();
        let manifest = store.load_manifest(&run_id)?;
        timing.load_cache_time_s = load_started.elapsed().as_secs_f64();
        timing.steps = manifest.steps;
        timing.total_time_s = started.elapsed().as_secs_f64();
        info!(run_id = %run_id, "Loaded cached run");

        emit_progress(
            &mut progress_cb,
            RunStage::Completed,
            started,
            Some("Loaded cached run".to_string()),
            None,
        );

        return Ok(RunResponse {
            run_id,
            manifest,
            loaded_from_cache: true,
            timing,
        });
    }

    emit_progress(
        &mut progress_cb,
        RunStage::Compiling,
        started,
        Some("Compiling scenario".to_string()),
        None,
    );
    let compile_started = Instant::now();
    let CompiledScenario {
        mut simulation,
        states,
        actuations,
    } = runtime_compile::compile_scenario(&scenario)?;
    timing.compile_time_s = compile_started.elapsed().as_secs_f64();

    emit_progress(
        &mut progress_cb,
        RunStage::Running,
        started,
        Some("Running simulation".to_string()),
        None,
    );
    let run_started = Instant::now();
    let outcome = simulation.run_with_progress(&mut |p| {
        emit_progress(
            &mut progress_cb,
            RunStage::Running,
            started,
            None,
            Some(SimProgressInfo {
                sim_time_s: p.t,
                t_stop_s: p.t_stop,
                fraction_complete: p.fraction(),
                step: p.step,
            }),
        );
    });
    timing.run_time_s = run_started.elapsed().as_secs_f64();
    let summary = settle(outcome, simulation.summary())?;
    timing.steps = summary.steps;

    emit_progress(
        &mut progress_cb,
        RunStage::SavingResults,
        started,
        Some("Saving results".to_string()),
        None,
    );
    let save_started = Instant::now();
    let manifest = RunManifest {
        run_id: run_id.clone(),
        scenario_name: scenario.name.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        solver_version: request.options.solver_version.clone(),
        ts: scenario.sim.ts,
        t_stop: scenario.sim.t_stop,
        delay: scenario.sim.delay,
        integrator: integrator_label(&scenario),
        status: run_status(&summary.state),
        steps: summary.steps,
        saturation_events: summary.saturation_events,
        wall_time_s: summary.wall_time_s,
        states,
        actuations,
    };
    let records = history_to_records(simulation.history());
    store.save_run(&manifest, &records)?;
    timing.save_time_s = save_started.elapsed().as_secs_f64();
    timing.total_time_s = started.elapsed().as_secs_f64();

    emit_progress(
        &mut progress_cb,
        RunStage::Completed,
        started,
        Some("Run completed".to_string()),
        None,
    );

    Ok(RunResponse {
        run_id,
        manifest,
        loaded_from_cache: false,
        timing,
    })
}

/// Integration failures end the run but keep its history; any other
/// simulation error is a failure of the request.
fn settle(outcome: Result<RunSummary, SimError>, summary: RunSummary) -> AppResult<RunSummary> {
    match outcome {
        Ok(summary) => Ok(summary),
        Err(SimError::IntegrationFailure { t, what }) => {
            warn!(t, what = %what, "Run aborted by integration failure");
            Ok(summary)
        }
        Err(e) => Err(AppError::Simulation(e.to_string())),
    }
}

fn run_status(state: &RunState) -> RunStatus {
    match state {
        RunState::Aborted { t, reason } => RunStatus::Aborted {
            t: *t,
            reason: reason.clone(),
        },
        _ => RunStatus::Finished,
    }
}

fn integrator_label(scenario: &Scenario) -> String {
    use ds_project::schema::IntegratorDef;
    match scenario.sim.integrator {
        IntegratorDef::ForwardEuler { substeps } => format!("forward_euler/{substeps}"),
        IntegratorDef::Rk4 { substeps } => format!("rk4/{substeps}"),
        IntegratorDef::DormandPrince { .. } => "dormand_prince".to_string(),
    }
}

/// Flatten a history into storable records.
pub fn history_to_records(history: &History) -> Vec<HistoryRecord> {
    history
        .samples()
        .iter()
        .map(|s| HistoryRecord {
            t: s.t,
            x: s.x.iter().copied().collect(),
            u: s.actuation.iter().copied().collect(),
            command: s.command.iter().copied().collect(),
            saturation: s
                .saturation
                .iter()
                .map(|w| SaturationRecord {
                    quantity: w.quantity.clone(),
                    requested: w.requested,
                    limit: w.limit,
                })
                .collect(),
        })
        .collect()
}

/// Compile and run a scenario without touching the run store.
pub fn run_in_memory(scenario: &Scenario) -> AppResult<(RunSummary, History)> {
    let CompiledScenario { mut simulation, .. } = runtime_compile::compile_scenario(scenario)?;
    let outcome = simulation.run();
    let summary = settle(outcome, simulation.summary())?;
    Ok((summary, simulation.into_history()))
}

/// List runs stored next to a scenario, most recent first.
pub fn list_runs(scenario_path: &Path) -> AppResult<Vec<RunManifest>> {
    let store = RunStore::for_scenario(scenario_path)?;

    let mut runs = store.list_runs()?;
    runs.reverse();
    Ok(runs)
}

/// Load a specific run.
pub fn load_run(
    scenario_path: &Path,
    run_id: &str,
) -> AppResult<(RunManifest, Vec<HistoryRecord>)> {
    let store = RunStore::for_scenario(scenario_path)?;

    let manifest = store.load_manifest(run_id)?;
    let records = store.load_history(run_id)?;

    Ok((manifest, records))
}
