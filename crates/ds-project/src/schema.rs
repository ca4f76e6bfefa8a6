//! Scenario schema definitions.
//!
//! Every physical quantity is a plain SI `f64`. Controller model estimates
//! left out of a file default to the plant's own parameters when the
//! scenario is compiled.

use serde::{Deserialize, Serialize};

use ds_core::{Constant, Ramp, Signal, Step};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    #[serde(default)]
    pub version: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub plant: PlantDef,
    pub controller: ControllerDef,
    /// Speed reference (rad/s).
    #[serde(default)]
    pub reference: SignalDef,
    /// Load torque (N m).
    #[serde(default)]
    pub load_torque: SignalDef,
    #[serde(default)]
    pub sim: SimDef,
    /// Nominal ratings, used only for per-unit reporting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominal: Option<NominalDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlantDef {
    /// Rigid rotor driven directly by a torque command.
    Mechanics {
        j: f64,
        #[serde(default)]
        b: f64,
    },
    /// DC machine fed by a voltage-limited converter.
    DcMotorDrive {
        r_a: f64,
        l_a: f64,
        k_f: f64,
        j: f64,
        #[serde(default)]
        b: f64,
        u_dc: f64,
    },
}

impl PlantDef {
    pub fn kind(&self) -> &'static str {
        match self {
            PlantDef::Mechanics { .. } => "mechanics",
            PlantDef::DcMotorDrive { .. } => "dc_motor_drive",
        }
    }

    pub fn inertia(&self) -> f64 {
        match self {
            PlantDef::Mechanics { j, .. } | PlantDef::DcMotorDrive { j, .. } => *j,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementModeDef {
    Sensor,
    #[default]
    Sensorless,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerDef {
    /// PI speed loop producing a torque command. Pairs with `mechanics`.
    Speed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alpha_s: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tau_max: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        j: Option<f64>,
    },
    /// Speed and current loops. Pairs with `dc_motor_drive`.
    Cascade {
        #[serde(default)]
        mode: MeasurementModeDef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alpha_c: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alpha_o: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alpha_s: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        i_max: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tau_max: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        u_max: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        r_a: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        l_a: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        k_f: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        j: Option<f64>,
    },
    /// Open-loop voltage proportional to the speed reference, with IR
    /// compensation. Pairs with `dc_motor_drive`.
    Scalar {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        u_max: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        k_f: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        r_a: Option<f64>,
    },
}

impl ControllerDef {
    pub fn kind(&self) -> &'static str {
        match self {
            ControllerDef::Speed { .. } => "speed",
            ControllerDef::Cascade { .. } => "cascade",
            ControllerDef::Scalar { .. } => "scalar",
        }
    }

    /// Every explicitly set tuning value, by field name.
    pub fn explicit_values(&self) -> Vec<(&'static str, f64)> {
        let fields: Vec<(&'static str, Option<f64>)> = match self {
            ControllerDef::Speed { alpha_s, tau_max, j } => {
                vec![("alpha_s", *alpha_s), ("tau_max", *tau_max), ("j", *j)]
            }
            ControllerDef::Cascade {
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
                ..
            } => vec![
                ("alpha_c", *alpha_c),
                ("alpha_o", *alpha_o),
                ("alpha_s", *alpha_s),
                ("i_max", *i_max),
                ("tau_max", *tau_max),
                ("u_max", *u_max),
                ("r_a", *r_a),
                ("l_a", *l_a),
                ("k_f", *k_f),
                ("j", *j),
            ],
            ControllerDef::Scalar { u_max, k_f, r_a } => {
                vec![("u_max", *u_max), ("k_f", *k_f), ("r_a", *r_a)]
            }
        };
        fields
            .into_iter()
            .filter_map(|(name, v)| v.map(|v| (name, v)))
            .collect()
    }
}

/// Serializable time signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalDef {
    Constant {
        value: f64,
    },
    /// `before` up to and including `t0`, `after` from then on.
    Step {
        t0: f64,
        #[serde(default)]
        before: f64,
        after: f64,
    },
    /// Linear from `from` at `t0` to `to` at `t1`, flat outside.
    Ramp {
        t0: f64,
        t1: f64,
        from: f64,
        to: f64,
    },
}

impl Default for SignalDef {
    fn default() -> Self {
        SignalDef::Constant { value: 0.0 }
    }
}

impl SignalDef {
    pub fn to_signal(&self) -> Box<dyn Signal> {
        match *self {
            SignalDef::Constant { value } => Box::new(Constant(value)),
            SignalDef::Step { t0, before, after } => Box::new(Step::new(t0, before, after)),
            SignalDef::Ramp { t0, t1, from, to } => Box::new(Ramp { t0, t1, from, to }),
        }
    }

    /// All numeric fields, by name.
    pub fn values(&self) -> Vec<(&'static str, f64)> {
        match *self {
            SignalDef::Constant { value } => vec![("value", value)],
            SignalDef::Step { t0, before, after } => {
                vec![("t0", t0), ("before", before), ("after", after)]
            }
            SignalDef::Ramp { t0, t1, from, to } => {
                vec![("t0", t0), ("t1", t1), ("from", from), ("to", to)]
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimDef {
    /// Sampling period (s)
    pub ts: f64,
    /// Stop time (s)
    pub t_stop: f64,
    /// Computational delay in sampling periods
    pub delay: f64,
    pub integrator: IntegratorDef,
}

impl Default for SimDef {
    fn default() -> Self {
        Self {
            ts: 250e-6,
            t_stop: 1.5,
            delay: 1.0,
            integrator: IntegratorDef::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum IntegratorDef {
    ForwardEuler {
        #[serde(default = "one")]
        substeps: usize,
    },
    Rk4 {
        #[serde(default = "one")]
        substeps: usize,
    },
    DormandPrince {
        #[serde(default = "default_abs_tol")]
        abs_tol: f64,
        #[serde(default = "default_rel_tol")]
        rel_tol: f64,
        #[serde(default = "default_min_step")]
        min_step: f64,
    },
}

impl Default for IntegratorDef {
    fn default() -> Self {
        IntegratorDef::Rk4 { substeps: 1 }
    }
}

fn one() -> usize {
    1
}

fn default_abs_tol() -> f64 {
    1e-8
}

fn default_rel_tol() -> f64 {
    1e-6
}

fn default_min_step() -> f64 {
    1e-12
}

/// Machine ratings from which per-unit base values are derived.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NominalDef {
    /// Line-to-line RMS voltage (V)
    pub u_nom: f64,
    /// RMS current (A)
    pub i_nom: f64,
    /// Electrical frequency (Hz)
    pub f_nom: f64,
    /// Shaft torque (N m)
    pub tau_nom: f64,
    /// Shaft power (W)
    pub p_nom: f64,
    pub pole_pairs: u32,
}
