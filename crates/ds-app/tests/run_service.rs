use std::path::PathBuf;

use ds_app::{
    AppError, RunOptions, RunProgressEvent, RunRequest, RunStage, ensure_run, ensure_run_with_progress,
    extract_series, get_run_overview, list_runs, load_run, per_unit_bases, run_batch,
    run_in_memory,
};
use ds_project::schema::*;
use ds_results::{BaseConvention, RunStatus};
use ds_sim::RunState;

fn speed_scenario(name: &str) -> Scenario {
    Scenario {
        version: 1,
        name: name.to_string(),
        description: None,
        plant: PlantDef::Mechanics { j: 0.015, b: 0.0 },
        controller: ControllerDef::Speed {
            alpha_s: None,
            tau_max: None,
            j: None,
        },
        reference: SignalDef::Step {
            t0: 0.02,
            before: 0.0,
            after: 50.0,
        },
        load_torque: SignalDef::default(),
        sim: SimDef {
            ts: 250e-6,
            t_stop: 0.1,
            delay: 1.0,
            integrator: IntegratorDef::default(),
        },
        nominal: None,
    }
}

fn scenario_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ds_app_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_scenario(dir: &std::path::Path, file: &str, scenario: &Scenario) -> PathBuf {
    let path = dir.join(file);
    ds_project::save_yaml(&path, scenario).unwrap();
    path
}

#[test]
fn run_is_cached_and_reloadable() {
    let dir = scenario_dir("cache");
    let path = write_scenario(&dir, "speed.yaml", &speed_scenario("cache"));

    let request = RunRequest {
        scenario_path: &path,
        options: RunOptions::default(),
    };
    let mut stages = Vec::new();
    let on_progress: &mut dyn FnMut(RunProgressEvent) = &mut |e| stages.push(e.stage);
    let first = ensure_run_with_progress(&request, Some(on_progress)).unwrap();
    assert!(!first.loaded_from_cache);
    assert_eq!(first.manifest.status, RunStatus::Finished);
    assert_eq!(first.manifest.steps, 400);
    assert_eq!(stages.first(), Some(&RunStage::LoadingScenario));
    assert_eq!(stages.last(), Some(&RunStage::Completed));
    assert!(stages.contains(&RunStage::SavingResults));

    let second = ensure_run(&request).unwrap();
    assert!(second.loaded_from_cache);
    assert_eq!(second.run_id, first.run_id);

    let runs = list_runs(&path).unwrap();
    assert_eq!(runs.len(), 1);

    let (manifest, records) = load_run(&path, &first.run_id).unwrap();
    assert_eq!(records.len(), 400);
    let overview = get_run_overview(&manifest, &records).unwrap();
    assert_eq!(overview.time_range.1, 0.1);

    let speed = extract_series(&manifest, &records, "w_m").unwrap();
    assert_eq!(speed.len(), 400);
    assert!(speed.iter().filter(|(t, _)| *t < 0.02).all(|(_, w)| *w == 0.0));
    let torque = extract_series(&manifest, &records, "tau_m").unwrap();
    assert!(torque.iter().any(|(_, tau)| *tau > 0.0));
    assert!(extract_series(&manifest, &records, "nope").is_err());
}

#[test]
fn no_cache_reruns() {
    let dir = scenario_dir("nocache");
    let path = write_scenario(&dir, "speed.yaml", &speed_scenario("nocache"));
    let options = RunOptions {
        use_cache: false,
        ..Default::default()
    };
    let request = RunRequest {
        scenario_path: &path,
        options,
    };
    ensure_run(&request).unwrap();
    let again = ensure_run(&request).unwrap();
    assert!(!again.loaded_from_cache);
}

#[test]
fn missing_run_is_reported() {
    let dir = scenario_dir("missing");
    let path = write_scenario(&dir, "speed.yaml", &speed_scenario("missing"));
    assert!(matches!(
        load_run(&path, "does-not-exist"),
        Err(AppError::RunNotFound(_))
    ));
}

#[test]
fn batch_matches_sequential_runs() {
    let dir = scenario_dir("batch");
    let mut slow = speed_scenario("slow");
    slow.controller = ControllerDef::Speed {
        alpha_s: Some(10.0),
        tau_max: None,
        j: None,
    };
    let paths = vec![
        write_scenario(&dir, "a.yaml", &speed_scenario("fast")),
        write_scenario(&dir, "b.yaml", &slow),
        dir.join("missing.yaml"),
    ];

    let results = run_batch(&paths, &RunOptions::default());
    assert_eq!(results.len(), 3);
    assert!(results[2].is_err());

    let a = results[0].as_ref().unwrap();
    let b = results[1].as_ref().unwrap();
    assert_eq!(a.manifest.scenario_name, "fast");
    assert_eq!(b.manifest.scenario_name, "slow");

    let (_, stored) = load_run(&paths[0], &a.run_id).unwrap();
    let (summary, history) = run_in_memory(&speed_scenario("fast")).unwrap();
    assert_eq!(summary.state, RunState::Finished);
    let fresh = ds_app::history_to_records(&history);
    assert_eq!(stored, fresh);
}

#[test]
fn per_unit_bases_follow_plant_kind() {
    let mut s = speed_scenario("bases");
    assert!(matches!(per_unit_bases(&s), Err(AppError::InvalidInput(_))));

    s.nominal = Some(NominalDef {
        u_nom: 400.0,
        i_nom: 5.0,
        f_nom: 50.0,
        tau_nom: 14.6,
        p_nom: 2200.0,
        pole_pairs: 2,
    });
    let ac = per_unit_bases(&s).unwrap();
    assert_eq!(ac.convention, BaseConvention::ThreePhase);

    s.plant = PlantDef::DcMotorDrive {
        r_a: 3.7,
        l_a: 0.023,
        k_f: 2.9,
        j: 0.015,
        b: 0.0,
        u_dc: 540.0,
    };
    let dc = per_unit_bases(&s).unwrap();
    assert_eq!(dc.convention, BaseConvention::Dc);
    assert_eq!(dc.u, 400.0);
    assert_eq!(dc.i, 5.0);
}
