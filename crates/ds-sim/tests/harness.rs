//! End-to-end checks of the sampling harness with small hand-written plants
//! and controllers.

use std::sync::Mutex;

use nalgebra::DVector;
use proptest::prelude::*;

use ds_controls::{
    ControlResult, ControlStep, Controller, ControllerMemory, SampleConfig, clamp_magnitude,
    clamp_symmetric,
};
use ds_sim::{IntegratorType, Plant, RunState, SimError, SimOptions, SimResult, Simulation};

/// dx/dt = u for a vector of any width; records every input it sees.
struct Recorder {
    dim: usize,
    seen: Mutex<Vec<DVector<f64>>>,
}

impl Recorder {
    fn new(dim: usize) -> Self {
        Self {
            dim,
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl Plant for Recorder {
    fn state_dim(&self) -> usize {
        self.dim
    }

    fn input_dim(&self) -> usize {
        self.dim
    }

    fn initial_state(&self) -> DVector<f64> {
        DVector::zeros(self.dim)
    }

    fn derivative(&self, _t: f64, x: &DVector<f64>, u: &DVector<f64>) -> SimResult<DVector<f64>> {
        ds_sim::check_plant_dims(self, x, u)?;
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(u.clone());
        }
        Ok(u.clone())
    }
}

/// Pendulum-like nonlinear plant driven by a scalar input.
struct Swing;

impl Plant for Swing {
    fn state_dim(&self) -> usize {
        2
    }

    fn input_dim(&self) -> usize {
        1
    }

    fn output_dim(&self) -> usize {
        1
    }

    fn initial_state(&self) -> DVector<f64> {
        DVector::from_vec(vec![0.3, 0.0])
    }

    fn derivative(&self, t: f64, x: &DVector<f64>, u: &DVector<f64>) -> SimResult<DVector<f64>> {
        ds_sim::check_plant_dims(self, x, u)?;
        Ok(DVector::from_vec(vec![
            x[1],
            -9.81 * x[0].sin() - 0.2 * x[1] + u[0] + 0.1 * (3.0 * t).cos(),
        ]))
    }

    fn output(&self, _t: f64, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_element(1, x[0])
    }
}

/// Diverges once `t` passes `t_fail`.
struct Fragile {
    t_fail: f64,
}

impl Plant for Fragile {
    fn state_dim(&self) -> usize {
        1
    }

    fn input_dim(&self) -> usize {
        1
    }

    fn initial_state(&self) -> DVector<f64> {
        DVector::zeros(1)
    }

    fn derivative(&self, t: f64, _x: &DVector<f64>, _u: &DVector<f64>) -> SimResult<DVector<f64>> {
        let rate = if t > self.t_fail { f64::NAN } else { 1.0 };
        Ok(DVector::from_element(1, rate))
    }
}

/// Command at sample n is `n + 1` in every component.
struct Counter {
    ts: f64,
    dim: usize,
}

impl Controller for Counter {
    fn sample_config(&self) -> SampleConfig {
        SampleConfig { ts: self.ts }
    }

    fn measurement_dim(&self) -> usize {
        self.dim
    }

    fn actuation_dim(&self) -> usize {
        self.dim
    }

    fn initial_memory(&self) -> ControllerMemory {
        ControllerMemory::new().with("n", 0.0)
    }

    fn step(
        &self,
        _t: f64,
        _y: &DVector<f64>,
        _u_prev: &DVector<f64>,
        memory: &ControllerMemory,
    ) -> ControlResult<ControlStep> {
        let n = memory.value("n")?;
        Ok(ControlStep {
            actuation: DVector::from_element(self.dim, n + 1.0),
            memory: memory.clone().with("n", n + 1.0),
            saturation: vec![],
        })
    }
}

/// Proportional feedback with a hard scalar limit.
struct Limited {
    ts: f64,
    gain: f64,
    limit: f64,
    dim: usize,
}

impl Controller for Limited {
    fn sample_config(&self) -> SampleConfig {
        SampleConfig { ts: self.ts }
    }

    fn measurement_dim(&self) -> usize {
        self.dim
    }

    fn actuation_dim(&self) -> usize {
        self.dim
    }

    fn initial_memory(&self) -> ControllerMemory {
        ControllerMemory::new()
    }

    fn step(
        &self,
        _t: f64,
        y: &DVector<f64>,
        _u_prev: &DVector<f64>,
        memory: &ControllerMemory,
    ) -> ControlResult<ControlStep> {
        let raw = y.map(|v| self.gain * (10.0 - v));
        let (actuation, warning) = if self.dim == 1 {
            let (u, w) = clamp_symmetric(raw[0], self.limit, "u");
            (DVector::from_element(1, u), w)
        } else {
            clamp_magnitude(&raw, self.limit, "u")
        };
        Ok(ControlStep {
            actuation,
            memory: memory.clone(),
            saturation: warning.into_iter().collect(),
        })
    }
}

/// Scalar state feedback used by the determinism check.
struct Damper {
    ts: f64,
}

impl Controller for Damper {
    fn sample_config(&self) -> SampleConfig {
        SampleConfig { ts: self.ts }
    }

    fn measurement_dim(&self) -> usize {
        1
    }

    fn actuation_dim(&self) -> usize {
        1
    }

    fn initial_memory(&self) -> ControllerMemory {
        ControllerMemory::new().with("acc", 0.0)
    }

    fn step(
        &self,
        t: f64,
        y: &DVector<f64>,
        u_prev: &DVector<f64>,
        memory: &ControllerMemory,
    ) -> ControlResult<ControlStep> {
        let acc = memory.value("acc")? + y[0] * self.ts;
        let u = -4.0 * y[0] - 1.5 * acc + 0.1 * u_prev[0] + (7.0 * t).sin();
        Ok(ControlStep {
            actuation: DVector::from_element(1, u),
            memory: memory.clone().with("acc", acc),
            saturation: vec![],
        })
    }
}

fn opts(ts: f64, t_stop: f64, delay: f64) -> SimOptions {
    SimOptions {
        ts,
        t_stop,
        delay,
        ..Default::default()
    }
}

#[test]
fn zero_order_hold_within_each_interval() {
    let ts = 0.01;
    let mut sim = Simulation::new(Recorder::new(1), Counter { ts, dim: 1 }, opts(ts, 0.1, 0.0))
        .unwrap();
    sim.run().unwrap();

    let seen = sim.plant().seen.lock().unwrap().clone();
    // RK4 with one substep evaluates the derivative four times per interval.
    assert_eq!(seen.len(), 4 * sim.history().len());
    for (n, chunk) in seen.chunks(4).enumerate() {
        for u in chunk {
            assert_eq!(u[0], (n + 1) as f64);
        }
    }
}

#[test]
fn zero_order_hold_with_adaptive_integrator() {
    let ts = 0.05;
    let mut o = opts(ts, 0.5, 0.0);
    o.integrator = IntegratorType::DormandPrince {
        abs_tol: 1e-10,
        rel_tol: 1e-8,
        min_step: 1e-12,
    };
    let mut sim = Simulation::new(Recorder::new(1), Counter { ts, dim: 1 }, o).unwrap();
    sim.run().unwrap();
    // dx/dt = n + 1 on interval n: x(0.5) = 0.05 * (1 + 2 + ... + 10)
    assert!((sim.plant_state()[0] - 2.75).abs() < 1e-9);
}

#[test]
fn fractional_delay_is_rejected() {
    let err = Simulation::new(Recorder::new(1), Counter { ts: 0.1, dim: 1 }, opts(0.1, 1.0, 1.5))
        .err()
        .unwrap();
    assert!(matches!(err, SimError::Configuration { .. }));
}

#[test]
fn dimension_mismatch_is_rejected() {
    let err = Simulation::new(Recorder::new(2), Counter { ts: 0.1, dim: 1 }, opts(0.1, 1.0, 0.0))
        .err()
        .unwrap();
    assert!(matches!(err, SimError::Configuration { .. }));
}

#[test]
fn scalar_saturation_is_exact() {
    let ts = 0.01;
    let ctrl = Limited {
        ts,
        gain: 100.0,
        limit: 2.5,
        dim: 1,
    };
    let mut sim = Simulation::new(Recorder::new(1), ctrl, opts(ts, 0.2, 0.0)).unwrap();
    let summary = sim.run().unwrap();

    let first = &sim.history().samples()[0];
    assert_eq!(first.actuation[0], 2.5);
    assert_eq!(first.saturation.len(), 1);
    assert_eq!(first.saturation[0].limit, 2.5);
    assert_eq!(first.saturation[0].requested, 1000.0);
    assert!(summary.saturation_events >= 1);
    for s in sim.history().samples() {
        assert!(s.actuation[0].abs() <= 2.5);
    }
}

#[test]
fn vector_saturation_hits_limit_magnitude() {
    let ts = 0.01;
    let ctrl = Limited {
        ts,
        gain: 100.0,
        limit: 3.0,
        dim: 2,
    };
    let mut sim = Simulation::new(Recorder::new(2), ctrl, opts(ts, 0.05, 0.0)).unwrap();
    sim.run().unwrap();
    let first = &sim.history().samples()[0];
    assert!((first.actuation.norm() - 3.0).abs() < 1e-12);
    assert!((first.actuation[0] - first.actuation[1]).abs() < 1e-12);
    assert_eq!(first.saturation.len(), 1);
}

#[test]
fn runs_are_bit_identical() {
    let run = || {
        let ts = 1e-3;
        let mut sim = Simulation::new(Swing, Damper { ts }, opts(ts, 0.5, 2.0)).unwrap();
        sim.run().unwrap();
        sim.into_history()
    };
    let a = run();
    let b = run();
    assert_eq!(a.len(), 500);
    assert_eq!(a, b);
    for (sa, sb) in a.samples().iter().zip(b.samples()) {
        assert_eq!(sa.x[0].to_bits(), sb.x[0].to_bits());
        assert_eq!(sa.x[1].to_bits(), sb.x[1].to_bits());
    }
}

#[test]
fn integration_failure_aborts_and_keeps_history() {
    let ts = 0.1;
    let mut sim = Simulation::new(
        Fragile { t_fail: 0.55 },
        Counter { ts, dim: 1 },
        opts(ts, 1.0, 0.0),
    )
    .unwrap();
    let err = sim.run().unwrap_err();
    match err {
        SimError::IntegrationFailure { t, .. } => assert!((t - 0.5).abs() < 1e-12),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(matches!(sim.state(), RunState::Aborted { .. }));
    assert_eq!(sim.history().len(), 5);
    assert!((sim.history().final_state()[0] - 0.5).abs() < 1e-12);
}

#[test]
fn controller_error_aborts_run() {
    struct Broken;
    impl Controller for Broken {
        fn sample_config(&self) -> SampleConfig {
            SampleConfig { ts: 0.1 }
        }
        fn measurement_dim(&self) -> usize {
            1
        }
        fn actuation_dim(&self) -> usize {
            1
        }
        fn initial_memory(&self) -> ControllerMemory {
            ControllerMemory::new()
        }
        fn step(
            &self,
            _t: f64,
            _y: &DVector<f64>,
            _u: &DVector<f64>,
            memory: &ControllerMemory,
        ) -> ControlResult<ControlStep> {
            memory.value("missing")?;
            unreachable!()
        }
    }

    let mut sim = Simulation::new(Recorder::new(1), Broken, opts(0.1, 1.0, 0.0)).unwrap();
    let err = sim.run().unwrap_err();
    assert!(matches!(err, SimError::Control(_)));
    assert!(matches!(sim.state(), RunState::Aborted { t, .. } if *t == 0.0));
    assert!(sim.history().is_empty());
}

proptest! {
    #[test]
    fn history_length_is_ceil_of_span(ts in 1e-3f64..0.1, periods in 1.0f64..200.0) {
        let t_stop = ts * periods;
        let mut sim = Simulation::new(
            Recorder::new(1),
            Counter { ts, dim: 1 },
            opts(ts, t_stop, 0.0),
        ).unwrap();
        sim.run().unwrap();
        let expected = ds_core::periods_to_cover(t_stop, ts);
        prop_assert!(expected == periods.round() as usize || expected == periods.ceil() as usize);
        prop_assert_eq!(sim.history().len(), expected);
        prop_assert_eq!(sim.history().last().map(|s| s.t), Some(t_stop));
    }

    #[test]
    fn applied_actuation_lags_command_by_delay(d in 0usize..6, steps in 1usize..30) {
        let ts = 0.01;
        let mut sim = Simulation::new(
            Recorder::new(1),
            Counter { ts, dim: 1 },
            opts(ts, ts * steps as f64, d as f64),
        ).unwrap();
        sim.run().unwrap();
        let samples = sim.history().samples();
        for (n, s) in samples.iter().enumerate() {
            let expected = if n >= d { samples[n - d].command[0] } else { 0.0 };
            prop_assert_eq!(s.actuation[0], expected);
            prop_assert_eq!(s.command[0], (n + 1) as f64);
        }
    }
}
