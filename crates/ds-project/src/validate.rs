//! Scenario validation logic.

use crate::schema::{ControllerDef, IntegratorDef, NominalDef, PlantDef, Scenario, SignalDef};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Controller '{controller}' cannot drive plant '{plant}'")]
    Incompatible {
        plant: &'static str,
        controller: &'static str,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: f64, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: &str, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, v, "must be positive and finite"))
    }
}

fn non_negative(field: &str, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, v, "must be non-negative and finite"))
    }
}

pub fn validate_scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    if scenario.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: scenario.version,
        });
    }

    if scenario.name.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "name".to_string(),
            value: scenario.name.clone(),
            reason: "must not be empty".to_string(),
        });
    }

    validate_plant(&scenario.plant)?;
    validate_controller(&scenario.controller)?;

    match (&scenario.plant, &scenario.controller) {
        (PlantDef::Mechanics { .. }, ControllerDef::Speed { .. })
        | (PlantDef::DcMotorDrive { .. }, ControllerDef::Cascade { .. })
        | (PlantDef::DcMotorDrive { .. }, ControllerDef::Scalar { .. }) => {}
        (plant, controller) => {
            return Err(ValidationError::Incompatible {
                plant: plant.kind(),
                controller: controller.kind(),
            });
        }
    }

    validate_signal("reference", &scenario.reference)?;
    validate_signal("load_torque", &scenario.load_torque)?;

    let sim = &scenario.sim;
    positive("sim.ts", sim.ts)?;
    positive("sim.t_stop", sim.t_stop)?;
    if !sim.delay.is_finite() || sim.delay < 0.0 || sim.delay.fract() != 0.0 {
        return Err(invalid(
            "sim.delay",
            sim.delay,
            "must be a whole, non-negative number of sampling periods",
        ));
    }
    validate_integrator(&sim.integrator)?;

    if let Some(nominal) = &scenario.nominal {
        validate_nominal(nominal)?;
    }

    Ok(())
}

fn validate_plant(plant: &PlantDef) -> Result<(), ValidationError> {
    match *plant {
        PlantDef::Mechanics { j, b } => {
            positive("plant.j", j)?;
            non_negative("plant.b", b)?;
        }
        PlantDef::DcMotorDrive {
            r_a,
            l_a,
            k_f,
            j,
            b,
            u_dc,
        } => {
            positive("plant.r_a", r_a)?;
            positive("plant.l_a", l_a)?;
            positive("plant.k_f", k_f)?;
            positive("plant.j", j)?;
            non_negative("plant.b", b)?;
            positive("plant.u_dc", u_dc)?;
        }
    }
    Ok(())
}

fn validate_controller(controller: &ControllerDef) -> Result<(), ValidationError> {
    for (name, v) in controller.explicit_values() {
        positive(&format!("controller.{name}"), v)?;
    }
    Ok(())
}

fn validate_signal(field: &str, signal: &SignalDef) -> Result<(), ValidationError> {
    for (name, v) in signal.values() {
        if !v.is_finite() {
            return Err(invalid(format!("{field}.{name}"), v, "must be finite"));
        }
    }
    if let SignalDef::Ramp { t0, t1, .. } = *signal
        && t1 <= t0
    {
        return Err(invalid(format!("{field}.t1"), t1, "must be after t0"));
    }
    Ok(())
}

fn validate_integrator(integrator: &IntegratorDef) -> Result<(), ValidationError> {
    match *integrator {
        IntegratorDef::ForwardEuler { substeps } | IntegratorDef::Rk4 { substeps } => {
            if substeps == 0 {
                return Err(invalid(
                    "sim.integrator.substeps",
                    0.0,
                    "must be at least 1",
                ));
            }
        }
        IntegratorDef::DormandPrince {
            abs_tol,
            rel_tol,
            min_step,
        } => {
            positive("sim.integrator.abs_tol", abs_tol)?;
            non_negative("sim.integrator.rel_tol", rel_tol)?;
            positive("sim.integrator.min_step", min_step)?;
        }
    }
    Ok(())
}

fn validate_nominal(nominal: &NominalDef) -> Result<(), ValidationError> {
    positive("nominal.u_nom", nominal.u_nom)?;
    positive("nominal.i_nom", nominal.i_nom)?;
    positive("nominal.f_nom", nominal.f_nom)?;
    positive("nominal.tau_nom", nominal.tau_nom)?;
    positive("nominal.p_nom", nominal.p_nom)?;
    if nominal.pole_pairs == 0 {
        return Err(invalid("nominal.pole_pairs", 0.0, "must be at least 1"));
    }
    Ok(())
}
