//! Content-based hashing for run IDs.

use ds_project::schema::Scenario;
use sha2::{Digest, Sha256};

use crate::ResultsResult;

/// SHA-256 over the scenario JSON and the solver version, as lowercase hex.
pub fn compute_run_id(scenario: &Scenario, solver_version: &str) -> ResultsResult<String> {
    let scenario_json = serde_json::to_vec(scenario)?;

    let mut hasher = Sha256::new();
    hasher.update(&scenario_json);
    hasher.update(solver_version.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ds_project::schema::*;

    fn scenario(j: f64) -> Scenario {
        Scenario {
            version: 1,
            name: "Test".to_string(),
            description: None,
            plant: PlantDef::Mechanics { j, b: 0.0 },
            controller: ControllerDef::Speed {
                alpha_s: None,
                tau_max: None,
                j: None,
            },
            reference: SignalDef::default(),
            load_torque: SignalDef::default(),
            sim: SimDef::default(),
            nominal: None,
        }
    }

    #[test]
    fn hash_stability() {
        let s = scenario(0.015);
        let id = compute_run_id(&s, "v1").unwrap();
        assert_eq!(id, compute_run_id(&s, "v1").unwrap());
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_covers_the_whole_scenario() {
        let a = scenario(0.015);
        let mut b = a.clone();
        b.description = Some("changed".to_string());
        assert_ne!(
            compute_run_id(&a, "v1").unwrap(),
            compute_run_id(&b, "v1").unwrap()
        );
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let id = |j, v| compute_run_id(&scenario(j), v).unwrap();
        assert_ne!(id(0.015, "v1"), id(0.02, "v1"));
        assert_ne!(id(0.015, "v1"), id(0.015, "v2"));
    }
}
