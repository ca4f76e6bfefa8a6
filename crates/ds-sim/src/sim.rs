//! Simulation harness: sampled controller + continuous plant.
//!
//! Each sampling interval `[t_n, t_{n+1}]` runs in this order:
//! 1. sample the plant output at `t_n` and call the controller;
//! 2. push the command through the delay buffer to get the applied actuation;
//! 3. integrate the plant over the interval with that actuation held;
//! 4. record a [`Sample`] stamped with `t_{n+1}`.
//!
//! With a delay of `d` periods the actuation applied over interval `n` is the
//! command computed at sample `n - d`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use ds_controls::{ControlStep, Controller, ControllerMemory};
use ds_core::timing::Timer;
use ds_core::{Tolerances, ensure_positive, nearly_equal, periods_to_cover};

use crate::delay::{DelayBuffer, delay_periods};
use crate::error::{SimError, SimResult};
use crate::history::{History, Sample};
use crate::integrator::IntegratorType;
use crate::plant::Plant;

/// Upper bound on the history capacity reserved up front; longer runs grow
/// the buffer as samples arrive.
const MAX_RESERVED_SAMPLES: usize = 1 << 16;

/// Options for simulation runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimOptions {
    /// Sampling period (seconds)
    pub ts: f64,
    /// Stop time (seconds)
    pub t_stop: f64,
    /// Computational delay in sampling periods (must be a whole number)
    pub delay: f64,
    /// Integrator used inside each interval
    pub integrator: IntegratorType,
    /// Emit a progress event every N intervals (0 disables)
    pub progress_every: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            ts: 250e-6,
            t_stop: 1.5,
            delay: 1.0,
            integrator: IntegratorType::default(),
            progress_every: 1000,
        }
    }
}

impl SimOptions {
    pub fn validate(&self) -> SimResult<()> {
        ensure_positive(self.ts, "ts")?;
        ensure_positive(self.t_stop, "t_stop")?;
        delay_periods(self.delay)?;
        self.integrator.validate()
    }

    /// Number of recorded samples a completed run produces.
    pub fn total_steps(&self) -> usize {
        periods_to_cover(self.t_stop, self.ts)
    }
}

/// Lifecycle of a [`Simulation`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Finished,
    Aborted { t: f64, reason: String },
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Finished | RunState::Aborted { .. })
    }
}

/// Progress event emitted by [`Simulation::run_with_progress`].
#[derive(Clone, Debug, PartialEq)]
pub struct SimProgress {
    pub step: usize,
    pub total_steps: usize,
    pub t: f64,
    pub t_stop: f64,
}

impl SimProgress {
    pub fn fraction(&self) -> f64 {
        if self.total_steps == 0 {
            1.0
        } else {
            self.step as f64 / self.total_steps as f64
        }
    }
}

/// Shareable flag that stops a running simulation at the next interval.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Outcome of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub state: RunState,
    pub steps: usize,
    pub saturation_events: usize,
    pub wall_time_s: f64,
}

/// A plant/controller pair driven on a fixed sampling grid.
pub struct Simulation<P: Plant, C: Controller> {
    plant: P,
    controller: C,
    opts: SimOptions,
    total_steps: usize,
    delay: DelayBuffer,
    x: DVector<f64>,
    n: usize,
    u_prev: DVector<f64>,
    memory: ControllerMemory,
    history: History,
    state: RunState,
    cancel: CancelHandle,
    saturation_reported: bool,
    wall_time_s: f64,
}

impl<P: Plant, C: Controller> Simulation<P, C> {
    /// Build a harness, checking that plant, controller and options agree.
    pub fn new(plant: P, controller: C, opts: SimOptions) -> SimResult<Self> {
        opts.validate()?;
        let depth = delay_periods(opts.delay)?;

        if plant.input_dim() != controller.actuation_dim() {
            return Err(SimError::Configuration {
                what: format!(
                    "plant input dimension {} does not match controller actuation dimension {}",
                    plant.input_dim(),
                    controller.actuation_dim()
                ),
            });
        }
        if plant.output_dim() != controller.measurement_dim() {
            return Err(SimError::Configuration {
                what: format!(
                    "plant output dimension {} does not match controller measurement dimension {}",
                    plant.output_dim(),
                    controller.measurement_dim()
                ),
            });
        }

        let controller_ts = controller.sample_config().ts;
        if !nearly_equal(controller_ts, opts.ts, Tolerances::default()) {
            return Err(SimError::Configuration {
                what: format!(
                    "controller sampling period {controller_ts} differs from harness period {}",
                    opts.ts
                ),
            });
        }

        let x0 = plant.initial_state();
        if x0.len() != plant.state_dim() {
            return Err(SimError::Configuration {
                what: format!(
                    "initial state has dimension {}, plant declares {}",
                    x0.len(),
                    plant.state_dim()
                ),
            });
        }
        let u0 = controller.initial_actuation();
        if u0.len() != plant.input_dim() {
            return Err(SimError::Configuration {
                what: format!(
                    "initial actuation has dimension {}, plant input is {}",
                    u0.len(),
                    plant.input_dim()
                ),
            });
        }

        let total_steps = opts.total_steps();
        let memory = controller.initial_memory();
        Ok(Self {
            delay: DelayBuffer::new(depth, u0.clone()),
            history: History::with_capacity(x0.clone(), total_steps.min(MAX_RESERVED_SAMPLES)),
            x: x0,
            n: 0,
            u_prev: u0,
            memory,
            state: RunState::Idle,
            cancel: CancelHandle::default(),
            saturation_reported: false,
            wall_time_s: 0.0,
            total_steps,
            plant,
            controller,
            opts,
        })
    }

    pub fn options(&self) -> &SimOptions {
        &self.opts
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.interval_end(self.n)
    }

    pub fn plant_state(&self) -> &DVector<f64> {
        &self.x
    }

    pub fn memory(&self) -> &ControllerMemory {
        &self.memory
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn into_history(self) -> History {
        self.history
    }

    pub fn plant(&self) -> &P {
        &self.plant
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Request cancellation; takes effect before the next interval.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            state: self.state.clone(),
            steps: self.history.len(),
            saturation_events: self.history.saturation_count(),
            wall_time_s: self.wall_time_s,
        }
    }

    /// Time at the end of the first `n` intervals. The last interval ends at
    /// `t_stop` exactly.
    fn interval_end(&self, n: usize) -> f64 {
        if n >= self.total_steps {
            self.opts.t_stop
        } else {
            n as f64 * self.opts.ts
        }
    }

    /// Advance one sampling interval.
    ///
    /// A terminal simulation is left untouched. On error the run moves to
    /// [`RunState::Aborted`] and the history recorded so far is kept.
    pub fn step(&mut self) -> SimResult<()> {
        match self.state {
            RunState::Finished | RunState::Aborted { .. } => return Ok(()),
            RunState::Idle => {
                info!(
                    ts = self.opts.ts,
                    t_stop = self.opts.t_stop,
                    delay = self.opts.delay,
                    steps = self.total_steps,
                    "Starting simulation"
                );
                self.state = RunState::Running;
            }
            RunState::Running => {}
        }

        if self.cancel.is_cancelled() {
            self.abort(self.time(), "cancelled".to_string());
            return Ok(());
        }

        if self.n >= self.total_steps {
            self.finish();
            return Ok(());
        }

        if let Err(e) = self.advance() {
            let t = match &e {
                SimError::IntegrationFailure { t, .. } => *t,
                _ => self.time(),
            };
            self.abort(t, e.to_string());
            return Err(e);
        }

        if self.n >= self.total_steps {
            self.finish();
        }
        Ok(())
    }

    fn advance(&mut self) -> SimResult<()> {
        let t_n = self.interval_end(self.n);
        let t_next = self.interval_end(self.n + 1);

        let y = self.plant.output(t_n, &self.x);
        if y.len() != self.controller.measurement_dim() {
            return Err(SimError::InvalidState {
                what: "plant output",
                expected: self.controller.measurement_dim(),
                actual: y.len(),
            });
        }

        let ControlStep {
            actuation: command,
            memory,
            saturation,
        } = self.controller.step(t_n, &y, &self.u_prev, &self.memory)?;
        if command.len() != self.plant.input_dim() {
            return Err(SimError::InvalidState {
                what: "actuation",
                expected: self.plant.input_dim(),
                actual: command.len(),
            });
        }

        let u = self.delay.push(command.clone());
        let x_next =
            self.opts
                .integrator
                .integrate(&self.plant, t_n, &self.x, &u, t_next - t_n)?;

        for w in &saturation {
            if self.saturation_reported {
                debug!(t = t_n, "{w}");
            } else {
                warn!(t = t_n, "{w}");
                self.saturation_reported = true;
            }
        }

        self.n += 1;
        self.x = x_next;
        self.memory = memory;
        self.u_prev = u.clone();
        self.history.push(Sample {
            t: t_next,
            x: self.x.clone(),
            actuation: u,
            command,
            saturation,
        });
        Ok(())
    }

    fn finish(&mut self) {
        self.state = RunState::Finished;
        info!(
            steps = self.history.len(),
            saturation_events = self.history.saturation_count(),
            "Simulation finished"
        );
    }

    fn abort(&mut self, t: f64, reason: String) {
        warn!(t, reason = %reason, "Simulation aborted");
        self.state = RunState::Aborted { t, reason };
    }

    /// Run until finished, aborted or cancelled.
    pub fn run(&mut self) -> SimResult<RunSummary> {
        self.run_with_progress(&mut |_| {})
    }

    /// Run to a terminal state, reporting progress every
    /// `SimOptions::progress_every` intervals and once at the end.
    pub fn run_with_progress(
        &mut self,
        on_progress: &mut dyn FnMut(&SimProgress),
    ) -> SimResult<RunSummary> {
        let timer = Timer::start("simulation run");
        let every = self.opts.progress_every;

        let result = loop {
            if self.state.is_terminal() {
                break Ok(());
            }
            if let Err(e) = self.step() {
                break Err(e);
            }
            if every > 0 && self.n > 0 && self.n % every == 0 && !self.state.is_terminal() {
                let event = self.progress();
                debug!(step = event.step, t = event.t, "Simulation progress");
                on_progress(&event);
            }
        };

        self.wall_time_s += timer.elapsed_s();
        if let Some(s) = timer.stop() {
            info!(seconds = s, "simulation run timing");
        }
        on_progress(&self.progress());
        result.map(|()| self.summary())
    }

    fn progress(&self) -> SimProgress {
        SimProgress {
            step: self.n,
            total_steps: self.total_steps,
            t: self.time(),
            t_stop: self.opts.t_stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plant::test_plants::Integrator1;
    use ds_controls::{ControlResult, SampleConfig};

    /// Emits the sample index as its command.
    struct Counter {
        ts: f64,
    }

    impl Controller for Counter {
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
            ControllerMemory::new().with("n", 0.0)
        }

        fn step(
            &self,
            _t: f64,
            _measurement: &DVector<f64>,
            _prev_actuation: &DVector<f64>,
            memory: &ControllerMemory,
        ) -> ControlResult<ControlStep> {
            let n = memory.value("n")?;
            Ok(ControlStep {
                actuation: DVector::from_element(1, n + 1.0),
                memory: memory.clone().with("n", n + 1.0),
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
    fn sim_options_defaults() {
        let opts = SimOptions::default();
        assert_eq!(opts.ts, 250e-6);
        assert_eq!(opts.t_stop, 1.5);
        assert_eq!(opts.delay, 1.0);
        assert_eq!(opts.integrator, IntegratorType::Rk4 { substeps: 1 });
        assert!(opts.validate().is_ok());
        assert_eq!(opts.total_steps(), 6000);
    }

    #[test]
    fn sim_options_invalid() {
        assert!(opts(0.0, 1.0, 0.0).validate().is_err());
        assert!(opts(0.1, f64::INFINITY, 0.0).validate().is_err());
        assert!(opts(0.1, 1.0, 1.5).validate().is_err());
    }

    #[test]
    fn mismatched_sampling_period_rejected() {
        let err = Simulation::new(Integrator1, Counter { ts: 0.1 }, opts(0.2, 1.0, 0.0))
            .err()
            .unwrap();
        assert!(matches!(err, SimError::Configuration { .. }));
    }

    #[test]
    fn huge_sample_count_does_not_reserve_up_front() {
        let sim = Simulation::new(Integrator1, Counter { ts: 1e-9 }, opts(1e-9, 1e9, 0.0))
            .unwrap();
        assert!(sim.total_steps() > 100_000_000_000_000_000);
        assert!(sim.history().is_empty());
        assert_eq!(sim.state(), &RunState::Idle);
    }

    #[test]
    fn step_walks_lifecycle() {
        let mut sim = Simulation::new(Integrator1, Counter { ts: 0.25 }, opts(0.25, 0.5, 0.0))
            .unwrap();
        assert_eq!(sim.state(), &RunState::Idle);
        sim.step().unwrap();
        assert_eq!(sim.state(), &RunState::Running);
        assert_eq!(sim.time(), 0.25);
        sim.step().unwrap();
        assert_eq!(sim.state(), &RunState::Finished);
        assert_eq!(sim.time(), 0.5);
        // Terminal runs ignore further steps.
        sim.step().unwrap();
        assert_eq!(sim.history().len(), 2);
    }

    #[test]
    fn last_interval_is_truncated() {
        let mut sim = Simulation::new(Integrator1, Counter { ts: 0.4 }, opts(0.4, 1.0, 0.0))
            .unwrap();
        let summary = sim.run().unwrap();
        assert_eq!(summary.steps, 3);
        assert_eq!(sim.history().times(), vec![0.4, 0.8, 1.0]);
        // x = 1*0.4 + 2*0.4 + 3*0.2
        assert!((sim.plant_state()[0] - 1.8).abs() < 1e-12);
    }

    #[test]
    fn cancel_aborts_before_next_interval() {
        let mut sim = Simulation::new(Integrator1, Counter { ts: 0.1 }, opts(0.1, 1.0, 0.0))
            .unwrap();
        let handle = sim.cancel_handle();
        sim.step().unwrap();
        handle.cancel();
        let summary = sim.run().unwrap();
        assert_eq!(summary.steps, 1);
        match summary.state {
            RunState::Aborted { reason, .. } => assert_eq!(reason, "cancelled"),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn progress_events_are_emitted() {
        let mut o = opts(0.1, 1.0, 0.0);
        o.progress_every = 3;
        let mut sim = Simulation::new(Integrator1, Counter { ts: 0.1 }, o).unwrap();
        let mut seen = Vec::new();
        sim.run_with_progress(&mut |p| seen.push(p.step)).unwrap();
        assert_eq!(seen, vec![3, 6, 9, 10]);
    }
}
