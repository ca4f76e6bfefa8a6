//! Query helpers for extracting data from loaded runs.

use ds_project::schema::{PlantDef, Scenario};
use ds_results::{BaseConvention, BaseValues, HistoryRecord, RunManifest};

use crate::error::{AppError, AppResult};

/// Time range and size of a stored run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOverview {
    pub time_range: (f64, f64),
    pub record_count: usize,
    pub saturation_events: usize,
    /// Final value of every state channel, by name.
    pub final_states: Vec<(String, f64)>,
}

pub fn get_run_overview(
    manifest: &RunManifest,
    records: &[HistoryRecord],
) -> AppResult<RunOverview> {
    let (first, last) = match (records.first(), records.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(AppError::InvalidInput("No records in run".to_string())),
    };

    let final_states = manifest
        .states
        .iter()
        .zip(&last.x)
        .map(|(ch, v)| (ch.name.clone(), *v))
        .collect();

    Ok(RunOverview {
        time_range: (first.t, last.t),
        record_count: records.len(),
        saturation_events: records.iter().map(|r| r.saturation.len()).sum(),
        final_states,
    })
}

/// Time series of one state or actuation channel.
pub fn extract_series(
    manifest: &RunManifest,
    records: &[HistoryRecord],
    channel: &str,
) -> AppResult<Vec<(f64, f64)>> {
    if let Some(i) = manifest.states.iter().position(|c| c.name == channel) {
        return Ok(records
            .iter()
            .filter_map(|r| r.x.get(i).map(|v| (r.t, *v)))
            .collect());
    }
    if let Some(i) = manifest.actuations.iter().position(|c| c.name == channel) {
        return Ok(records
            .iter()
            .filter_map(|r| r.u.get(i).map(|v| (r.t, *v)))
            .collect());
    }
    Err(AppError::InvalidInput(format!(
        "Channel '{}' not found in run {}",
        channel, manifest.run_id
    )))
}

/// Per-unit bases for a scenario's nominal ratings. DC drives use the DC
/// convention; everything else uses three-phase peak bases.
pub fn per_unit_bases(scenario: &Scenario) -> AppResult<BaseValues> {
    let nominal = scenario.nominal.as_ref().ok_or_else(|| {
        AppError::InvalidInput(format!(
            "scenario '{}' has no 'nominal' section for per-unit bases",
            scenario.name
        ))
    })?;
    let convention = match scenario.plant {
        PlantDef::DcMotorDrive { .. } => BaseConvention::Dc,
        PlantDef::Mechanics { .. } => BaseConvention::ThreePhase,
    };
    Ok(BaseValues::from_def(nominal, convention)?)
}
