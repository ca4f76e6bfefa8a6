//! Result data types.

use serde::{Deserialize, Serialize};

use crate::base::Quantity;

pub type RunId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub scenario_name: String,
    /// RFC 3339 creation time.
    pub timestamp: String,
    pub solver_version: String,
    pub ts: f64,
    pub t_stop: f64,
    pub delay: f64,
    pub integrator: String,
    pub status: RunStatus,
    pub steps: usize,
    pub saturation_events: usize,
    pub wall_time_s: f64,
    /// Name and physical kind of each state component.
    pub states: Vec<Channel>,
    /// Name and physical kind of each actuation component.
    pub actuations: Vec<Channel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Finished,
    Aborted { t: f64, reason: String },
}

/// A named column of the recorded history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub quantity: Quantity,
}

impl Channel {
    pub fn new(name: impl Into<String>, quantity: Quantity) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }
}

/// One line of `history.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub t: f64,
    pub x: Vec<f64>,
    /// Applied actuation.
    pub u: Vec<f64>,
    /// Controller command (differs from `u` under computational delay).
    pub command: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub saturation: Vec<SaturationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaturationRecord {
    pub quantity: String,
    pub requested: f64,
    pub limit: f64,
}
