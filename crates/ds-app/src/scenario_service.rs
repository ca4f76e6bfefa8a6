//! Scenario loading, saving, validation, and introspection.

use std::path::Path;

use ds_project::schema::Scenario;

use crate::error::{AppError, AppResult};

/// One-line description of a scenario for listings.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSummary {
    pub name: String,
    pub plant: &'static str,
    pub controller: &'static str,
    pub ts: f64,
    pub t_stop: f64,
    pub delay: f64,
    pub steps: usize,
}

/// Load a YAML or JSON scenario (chosen by extension).
pub fn load_scenario(path: &Path) -> AppResult<Scenario> {
    if !path.exists() {
        return Err(AppError::ScenarioFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
        });
    }
    Ok(ds_project::load(path)?)
}

pub fn save_scenario(path: &Path, scenario: &Scenario) -> AppResult<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => ds_project::save_json(path, scenario)?,
        _ => ds_project::save_yaml(path, scenario)?,
    }
    Ok(())
}

pub fn validate(scenario: &Scenario) -> AppResult<()> {
    ds_project::validate_scenario(scenario).map_err(|e| AppError::Validation(e.to_string()))
}

pub fn summarize(scenario: &Scenario) -> ScenarioSummary {
    ScenarioSummary {
        name: scenario.name.clone(),
        plant: scenario.plant.kind(),
        controller: scenario.controller.kind(),
        ts: scenario.sim.ts,
        t_stop: scenario.sim.t_stop,
        delay: scenario.sim.delay,
        steps: ds_core::periods_to_cover(scenario.sim.t_stop, scenario.sim.ts),
    }
}
