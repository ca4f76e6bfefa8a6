//! Scenario → runnable simulation.
//!
//! Controller model estimates that the scenario leaves unset are taken from
//! the plant definition, tuning values from the controller defaults, and the
//! sampling period always from `sim.ts`.

use ds_controls::{
    CascadeControl, CascadeParams, Controller, MeasurementMode, ScalarControl, ScalarParams,
    SpeedControl, SpeedControlParams,
};
use ds_plants::{Converter, DcMotorDrive, DcMotorParams, Mechanics, MechanicsParams};
use ds_project::schema::{
    ControllerDef, IntegratorDef, MeasurementModeDef, PlantDef, Scenario, SimDef,
};
use ds_results::{Channel, Quantity};
use ds_sim::{IntegratorType, Plant, SimOptions, Simulation};

use crate::error::{AppError, AppResult};

pub type DriveSimulation = Simulation<Box<dyn Plant>, Box<dyn Controller>>;

/// A compiled scenario ready to run, with the names of its recorded columns.
pub struct CompiledScenario {
    pub simulation: DriveSimulation,
    pub states: Vec<Channel>,
    pub actuations: Vec<Channel>,
}

pub fn integrator_type(def: &IntegratorDef) -> IntegratorType {
    match *def {
        IntegratorDef::ForwardEuler { substeps } => IntegratorType::ForwardEuler { substeps },
        IntegratorDef::Rk4 { substeps } => IntegratorType::Rk4 { substeps },
        IntegratorDef::DormandPrince {
            abs_tol,
            rel_tol,
            min_step,
        } => IntegratorType::DormandPrince {
            abs_tol,
            rel_tol,
            min_step,
        },
    }
}

pub fn sim_options(def: &SimDef) -> SimOptions {
    SimOptions {
        ts: def.ts,
        t_stop: def.t_stop,
        delay: def.delay,
        integrator: integrator_type(&def.integrator),
        ..Default::default()
    }
}

/// Build the plant and describe its state and input columns.
pub fn build_plant(scenario: &Scenario) -> AppResult<(Box<dyn Plant>, Vec<Channel>, Vec<Channel>)> {
    let tau_l = scenario.load_torque.to_signal();
    match scenario.plant {
        PlantDef::Mechanics { j, b } => {
            let plant = Mechanics::new(MechanicsParams { j, b }, tau_l)?;
            Ok((
                Box::new(plant),
                vec![
                    Channel::new("w_m", Quantity::Speed),
                    Channel::new("theta_m", Quantity::Angle),
                ],
                vec![Channel::new("tau_m", Quantity::Torque)],
            ))
        }
        PlantDef::DcMotorDrive {
            r_a,
            l_a,
            k_f,
            j,
            b,
            u_dc,
        } => {
            let mechanics = Mechanics::new(MechanicsParams { j, b }, tau_l)?;
            let plant = DcMotorDrive::new(
                DcMotorParams { r_a, l_a, k_f },
                mechanics,
                Converter::new(u_dc)?,
            )?;
            Ok((
                Box::new(plant),
                vec![
                    Channel::new("i_a", Quantity::Current),
                    Channel::new("w_m", Quantity::Speed),
                    Channel::new("theta_m", Quantity::Angle),
                ],
                vec![Channel::new("u_a", Quantity::Voltage)],
            ))
        }
    }
}

pub fn build_controller(scenario: &Scenario) -> AppResult<Box<dyn Controller>> {
    let reference = scenario.reference.to_signal();
    let ts = scenario.sim.ts;

    match (&scenario.controller, &scenario.plant) {
        (ControllerDef::Speed { alpha_s, tau_max, j }, plant) => {
            let defaults = SpeedControlParams::default();
            let params = SpeedControlParams {
                ts,
                alpha_s: alpha_s.unwrap_or(defaults.alpha_s),
                tau_max: tau_max.unwrap_or(defaults.tau_max),
                j: j.unwrap_or(plant.inertia()),
            };
            Ok(Box::new(SpeedControl::new(params, reference)?))
        }
        (
            ControllerDef::Cascade {
                mode,
                alpha_c,
                alpha_o,
                alpha_s,
                i_max,
                tau_max,
                u_max,
                r_a,
                l_a,
                k_f,
                j,
            },
            PlantDef::DcMotorDrive {
                r_a: plant_r_a,
                l_a: plant_l_a,
                k_f: plant_k_f,
                j: plant_j,
                u_dc,
                ..
            },
        ) => {
            let defaults = CascadeParams::default();
            let params = CascadeParams {
                ts,
                mode: match mode {
                    MeasurementModeDef::Sensor => MeasurementMode::Sensor,
                    MeasurementModeDef::Sensorless => MeasurementMode::Sensorless,
                },
                alpha_c: alpha_c.unwrap_or(defaults.alpha_c),
                alpha_o: alpha_o.unwrap_or(defaults.alpha_o),
                alpha_s: alpha_s.unwrap_or(defaults.alpha_s),
                i_max: i_max.unwrap_or(defaults.i_max),
                tau_max: tau_max.unwrap_or(defaults.tau_max),
                u_max: u_max.unwrap_or(*u_dc),
                r_a: r_a.unwrap_or(*plant_r_a),
                l_a: l_a.unwrap_or(*plant_l_a),
                k_f: k_f.unwrap_or(*plant_k_f),
                j: j.unwrap_or(*plant_j),
            };
            Ok(Box::new(CascadeControl::new(params, reference)?))
        }
        (
            ControllerDef::Scalar { u_max, k_f, r_a },
            PlantDef::DcMotorDrive {
                r_a: plant_r_a,
                k_f: plant_k_f,
                u_dc,
                ..
            },
        ) => {
            let params = ScalarParams {
                ts,
                u_max: u_max.unwrap_or(*u_dc),
                k_f: k_f.unwrap_or(*plant_k_f),
                r_a: r_a.unwrap_or(*plant_r_a),
            };
            Ok(Box::new(ScalarControl::new(params, reference)?))
        }
        (controller, plant) => Err(AppError::Compile(format!(
            "controller '{}' cannot drive plant '{}'",
            controller.kind(),
            plant.kind()
        ))),
    }
}

/// Validate and compile a scenario into a simulation in the `Idle` state.
pub fn compile_scenario(scenario: &Scenario) -> AppResult<CompiledScenario> {
    ds_project::validate_scenario(scenario)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (plant, states, actuations) = build_plant(scenario)?;
    let controller = build_controller(scenario)?;
    let simulation = Simulation::new(plant, controller, sim_options(&scenario.sim))
        .map_err(|e| AppError::Compile(e.to_string()))?;

    Ok(CompiledScenario {
        simulation,
        states,
        actuations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ds_project::schema::SignalDef;

    fn mechanics_scenario() -> Scenario {
        Scenario {
            version: 1,
            name: "compile".to_string(),
            description: None,
            plant: PlantDef::Mechanics { j: 0.03, b: 0.0 },
            controller: ControllerDef::Speed {
                alpha_s: None,
                tau_max: None,
                j: None,
            },
            reference: SignalDef::default(),
            load_torque: SignalDef::default(),
            sim: SimDef {
                ts: 1e-3,
                t_stop: 0.01,
                delay: 0.0,
                integrator: IntegratorDef::default(),
            },
            nominal: None,
        }
    }

    #[test]
    fn compiles_mechanics_with_speed_control() {
        let compiled = compile_scenario(&mechanics_scenario()).unwrap();
        assert_eq!(compiled.states.len(), 2);
        assert_eq!(compiled.actuations.len(), 1);
        assert_eq!(compiled.simulation.total_steps(), 10);
        assert_eq!(compiled.simulation.controller().sample_config().ts, 1e-3);
    }

    #[test]
    fn compiles_dc_drive_with_cascade_defaults() {
        let mut s = mechanics_scenario();
        s.plant = PlantDef::DcMotorDrive {
            r_a: 1.0,
            l_a: 0.01,
            k_f: 1.5,
            j: 0.02,
            b: 0.0,
            u_dc: 300.0,
        };
        s.controller = ControllerDef::Cascade {
            mode: MeasurementModeDef::Sensor,
            alpha_c: None,
            alpha_o: None,
            alpha_s: None,
            i_max: None,
            tau_max: None,
            u_max: None,
            r_a: None,
            l_a: None,
            k_f: None,
            j: None,
        };
        let compiled = compile_scenario(&s).unwrap();
        assert_eq!(compiled.states[0].name, "i_a");
        assert_eq!(compiled.simulation.plant().output_dim(), 2);
    }

    #[test]
    fn scalar_control_runs_open_loop_on_dc_drive() {
        let mut s = mechanics_scenario();
        s.plant = PlantDef::DcMotorDrive {
            r_a: 1.0,
            l_a: 0.01,
            k_f: 1.5,
            j: 0.02,
            b: 0.0,
            u_dc: 300.0,
        };
        s.controller = ControllerDef::Scalar {
            u_max: None,
            k_f: None,
            r_a: None,
        };
        s.reference = SignalDef::Constant { value: 10.0 };
        let mut compiled = compile_scenario(&s).unwrap();
        compiled.simulation.run().unwrap();
        let first = &compiled.simulation.history().samples()[0];
        // u = k_f * w_ref + r_a * i_a with the plant at rest.
        assert!((first.command[0] - 15.0).abs() < 1e-12);
    }

    #[test]
    fn fractional_delay_is_rejected_before_compilation() {
        let mut s = mechanics_scenario();
        s.sim.delay = 1.5;
        assert!(matches!(
            compile_scenario(&s),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn integrator_mapping() {
        assert_eq!(
            integrator_type(&IntegratorDef::ForwardEuler { substeps: 3 }),
            IntegratorType::ForwardEuler { substeps: 3 }
        );
    }
}
