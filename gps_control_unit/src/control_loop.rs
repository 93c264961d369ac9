//! Fixed-period control loop.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──init──▶ Ready ──starting──▶ Running ──stopping──▶ Stopped
//!                                                ▲                     │
//!                                                └──────starting───────┘
//! ```
//!
//! # Tick order (Running)
//!
//! 1. record `time` as the last update time
//! 2. advance the cycle counter; a wrap to zero is a control step
//! 3. every sensor slot updates the sample
//! 4. on a control step both position controllers (and the trial
//!    controller, if active) produce new efforts; otherwise the previous
//!    efforts are held
//! 5. efforts are written for every joint of both chains
//!
//! The tick never allocates, blocks or returns an error. Faults are
//! reported in [`TickOutcome`] and logged on their edges only.

use std::time::Duration;

use tracing::{error, info, warn};

use gps_common::config::ConfigSource;
use gps_common::fault::{ControllerFault, SensorFault};
use gps_common::state::{ChainGroup, LoopState, TrialState};

use crate::chain::{self, ChainSet};
use crate::config::PluginConfig;
use crate::control::effort::JointEfforts;
use crate::control::position::PositionController;
use crate::control::trial::TrialController;
use crate::error::{ConfigurationError, InitError};
use crate::sample::{Sample, SampleAggregator};
use crate::sensor::{SensorContext, SensorKind, SensorRegistry, SensorSlot};
use crate::topology::{ActuatorInterface, TopologyProvider};

// ─── Cycle counter ──────────────────────────────────────────────────

/// Tick counter bounded by `controller_step_length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleCounter {
    value: u32,
    step_length: u32,
}

impl CycleCounter {
    /// `step_length` of zero is treated as one.
    pub const fn new(step_length: u32) -> Self {
        Self {
            value: 0,
            step_length: if step_length == 0 { 1 } else { step_length },
        }
    }

    #[inline]
    pub fn reset(&mut self) {
        self.value = 0;
    }

    /// Increment; returns true when the counter wraps to zero.
    #[inline]
    pub fn advance(&mut self) -> bool {
        self.value += 1;
        if self.value >= self.step_length {
            self.value = 0;
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.value
    }

    #[inline]
    pub fn step_length(&self) -> u32 {
        self.step_length
    }
}

// ─── Tick outcome ───────────────────────────────────────────────────

/// What one `update` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// False when the loop was not running and the tick was ignored.
    pub ran: bool,
    pub control_step: bool,
    pub sensor_faults: SensorFault,
    /// Only evaluated on control steps.
    pub controller_faults: ControllerFault,
}

// ─── Bound runtime ──────────────────────────────────────────────────

/// Everything built by `init`.
struct Bound {
    config: PluginConfig,
    chains: ChainSet,
    counter: CycleCounter,
    aggregator: SampleAggregator,
    sensors: SensorRegistry,
    /// Indexed by [`ChainGroup::index`]: base (active), right (passive).
    controllers: [PositionController; 2],
    held: [JointEfforts; 2],
    last_controller_fault: ControllerFault,
}

impl Bound {
    fn build(config: PluginConfig, topology: &dyn TopologyProvider) -> Result<Self, InitError> {
        let active = chain::bind(topology, &config.base_group, &config.head_name)?;
        let passive = chain::bind(topology, &config.base_group, &config.right_name)?;
        active.validate_names("active", &config.active_joint_names)?;
        passive.validate_names("passive", &config.passive_joint_names)?;

        let nominal = config.control_period();
        let mut base = PositionController::new(
            "base",
            ChainGroup::Active,
            active.len(),
            config.base_controller.gains,
            nominal,
        );
        let mut right = PositionController::new(
            "right",
            ChainGroup::Passive,
            passive.len(),
            config.right_controller.gains,
            nominal,
        );
        for (ctrl, group_cfg, key) in [
            (&mut base, &config.base_controller, "base_controller/target"),
            (&mut right, &config.right_controller, "right_controller/target"),
        ] {
            if group_cfg.target.is_empty() {
                continue;
            }
            ctrl.set_target(&group_cfg.target)
                .map_err(|e| ConfigurationError::InvalidValue {
                    key: key.to_string(),
                    message: e.to_string(),
                })?;
        }

        let chains = ChainSet::try_new(active, passive)?;
        let mut sensors = SensorRegistry::new();
        sensors.register(
            SensorKind::JointState {
                velocity_cutoff_hz: config.velocity_cutoff_hz,
            }
            .build(),
        )?;

        let held = [
            JointEfforts::zeros(chains.get(ChainGroup::Active).len()),
            JointEfforts::zeros(chains.get(ChainGroup::Passive).len()),
        ];

        Ok(Self {
            counter: CycleCounter::new(config.controller_step_length),
            aggregator: SampleAggregator::new(&chains),
            sensors,
            controllers: [base, right],
            held,
            chains,
            config,
            last_controller_fault: ControllerFault::empty(),
        })
    }

    fn reset_controllers(&mut self, time: Duration) {
        for c in self.controllers.iter_mut() {
            c.reset(time);
        }
    }

    /// Run the controllers for one control step and store the held efforts.
    fn control_step(
        &mut self,
        time: Duration,
        trial: Option<&mut (dyn TrialController + 'static)>,
        trial_state: &mut TrialState,
    ) -> ControllerFault {
        let sample = self.aggregator.current();
        let [base, right] = &mut self.controllers;
        let (base_out, mut fault) = base.update(time, sample);
        let (right_out, right_fault) = right.update(time, sample);
        fault |= right_fault;

        let mut active = base_out;
        if let (TrialState::Active, Some(trial)) = (*trial_state, trial) {
            if trial.is_finished() {
                *trial_state = TrialState::Finished;
                info!("Trial controller '{}' finished; position control resumes", trial.name());
            } else {
                match trial.update(time, sample) {
                    Ok(out) if out.efforts.len() == base_out.len() && out.mode.is_valid() => {
                        let mut efforts = out.efforts;
                        fault |= efforts.sanitize(base.gains().out_max);
                        active = out.mode.combine(&efforts, &base_out);
                    }
                    Ok(_) => {
                        fault |= ControllerFault::SHAPE_MISMATCH;
                        active = JointEfforts::zeros(base_out.len());
                    }
                    Err(f) => {
                        fault |= f;
                        active = JointEfforts::zeros(base_out.len());
                    }
                }
            }
        }

        self.held = [active, right_out];

        if fault != self.last_controller_fault {
            if fault.is_empty() {
                info!("controller faults cleared at {time:?}");
            } else {
                warn!("controller fault {fault:?} at {time:?}");
            }
            self.last_controller_fault = fault;
        }
        fault
    }

    fn write_back(&self, io: &mut dyn ActuatorInterface) {
        for group in ChainGroup::ALL {
            let handles = self.chains.get(group).handles();
            for (&h, &u) in handles.iter().zip(self.held[group.index()].as_slice()) {
                io.set_commanded_effort(h, u);
            }
        }
    }
}

// ─── Control loop ───────────────────────────────────────────────────

/// The realtime orchestrator.
///
/// The actuator interface is passed into each lifecycle call rather than
/// owned, so the host keeps control of the robot handle.
pub struct ControlLoop {
    state: LoopState,
    bound: Option<Bound>,
    trial: Option<Box<dyn TrialController>>,
    trial_state: TrialState,
    baseline: Duration,
    last_update: Duration,
    ticks: u64,
}

impl Default for ControlLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Uninitialized,
            bound: None,
            trial: None,
            trial_state: TrialState::Unattached,
            baseline: Duration::ZERO,
            last_update: Duration::ZERO,
            ticks: 0,
        }
    }

    // ── Lifecycle ───────────────────────────────────────────

    /// Read configuration under `namespace`, resolve both chains and build
    /// sensors and controllers. Any failure leaves the loop uninitialized.
    pub fn init(
        &mut self,
        source: &dyn ConfigSource,
        namespace: &str,
        topology: &dyn TopologyProvider,
    ) -> Result<(), InitError> {
        self.expect_state("init", &[LoopState::Uninitialized])?;
        let config = PluginConfig::from_source(source, namespace).inspect_err(|e| {
            error!("init failed: {e}");
        })?;
        self.init_with_config(config, topology)
    }

    /// [`ControlLoop::init`] with an already validated configuration.
    pub fn init_with_config(
        &mut self,
        config: PluginConfig,
        topology: &dyn TopologyProvider,
    ) -> Result<(), InitError> {
        self.expect_state("init", &[LoopState::Uninitialized])?;
        let bound = Bound::build(config, topology).inspect_err(|e| {
            error!("init failed: {e}");
        })?;
        info!(
            "Control loop ready: active {} joints ({}→{}), passive {} joints ({}→{}), control every {} ticks",
            bound.chains.get(ChainGroup::Active).len(),
            bound.config.base_group,
            bound.config.head_name,
            bound.chains.get(ChainGroup::Passive).len(),
            bound.config.base_group,
            bound.config.right_name,
            bound.config.controller_step_length
        );
        self.bound = Some(bound);
        self.state = LoopState::Ready;
        Ok(())
    }

    /// Begin a session: baseline = `io.time()`, counter to zero, reset
    /// every sensor slot, both position controllers and the attached
    /// trial controller.
    pub fn starting(&mut self, io: &dyn ActuatorInterface) -> Result<(), InitError> {
        self.expect_state("starting", &[LoopState::Ready, LoopState::Stopped])?;
        let Some(b) = self.bound.as_mut() else {
            return Err(InitError::InvalidTransition {
                operation: "starting",
                from: self.state,
            });
        };

        let now = io.time();
        self.baseline = now;
        self.last_update = now;

        b.counter.reset();
        b.aggregator.reset(now);
        let ctx = SensorContext {
            io,
            chains: &b.chains,
        };
        b.sensors.reset_all(&ctx, now);
        b.reset_controllers(now);
        for h in b.held.iter_mut() {
            h.clear();
        }
        b.last_controller_fault = ControllerFault::empty();

        if let Some(trial) = self.trial.as_mut() {
            trial.reset(now);
            self.trial_state = TrialState::Active;
            info!("Trial controller '{}' active", trial.name());
        }

        self.state = LoopState::Running;
        info!("Control loop running (baseline {now:?})");
        Ok(())
    }

    /// One realtime tick. Ignored unless running.
    pub fn update(&mut self, io: &mut dyn ActuatorInterface, time: Duration) -> TickOutcome {
        if self.state != LoopState::Running {
            return TickOutcome::default();
        }
        let Some(b) = self.bound.as_mut() else {
            return TickOutcome::default();
        };

        self.last_update = time;
        self.ticks += 1;

        let control_step = b.counter.advance();

        let ctx = SensorContext {
            io: &*io,
            chains: &b.chains,
        };
        let sensor_faults = b
            .sensors
            .update_all(&ctx, &mut b.aggregator, time, control_step);

        let controller_faults = if control_step {
            let trial = self.trial.as_deref_mut();
            b.control_step(time, trial, &mut self.trial_state)
        } else {
            ControllerFault::empty()
        };

        b.write_back(io);

        TickOutcome {
            ran: true,
            control_step,
            sensor_faults,
            controller_faults,
        }
    }

    /// End the session between ticks. Controller state is kept.
    pub fn stopping(&mut self) -> Result<(), InitError> {
        self.expect_state("stopping", &[LoopState::Running])?;
        if self.trial_state == TrialState::Active {
            self.trial_state = TrialState::Standby;
        }
        self.state = LoopState::Stopped;
        info!("Control loop stopped after {} ticks", self.ticks);
        Ok(())
    }

    fn expect_state(&self, operation: &'static str, allowed: &[LoopState]) -> Result<(), InitError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(InitError::InvalidTransition {
                operation,
                from: self.state,
            })
        }
    }

    // ── Registration ────────────────────────────────────────

    /// Add a sensor slot after `init`, outside a session.
    ///
    /// If the loop was stopped the slot is reset on the next `starting`.
    pub fn add_sensor(&mut self, slot: Box<dyn SensorSlot>) -> Result<(), InitError> {
        self.expect_state("add_sensor", &[LoopState::Ready, LoopState::Stopped])?;
        match self.bound.as_mut() {
            Some(b) => b.sensors.register(slot),
            None => Err(InitError::InvalidTransition {
                operation: "add_sensor",
                from: self.state,
            }),
        }
    }

    /// Route the active chain through `trial` and return any previously
    /// attached controller.
    ///
    /// While running, `trial` is reset with the last update time and takes
    /// over from the next control step. Otherwise it waits for `starting`.
    pub fn attach_trial_controller(
        &mut self,
        mut trial: Box<dyn TrialController>,
    ) -> Option<Box<dyn TrialController>> {
        if self.state == LoopState::Running {
            trial.reset(self.last_update);
            self.trial_state = TrialState::Active;
        } else {
            self.trial_state = TrialState::Standby;
        }
        info!("Trial controller '{}' attached ({:?})", trial.name(), self.trial_state);
        let previous = self.trial.replace(trial);
        self.on_trial_change();
        previous
    }

    /// Remove the trial controller; position control becomes authoritative.
    pub fn detach_trial_controller(&mut self) -> Option<Box<dyn TrialController>> {
        let trial = self.trial.take()?;
        self.trial_state = TrialState::Unattached;
        info!("Trial controller '{}' detached", trial.name());
        self.on_trial_change();
        Some(trial)
    }

    fn on_trial_change(&mut self) {
        if self.state != LoopState::Running {
            return;
        }
        if let Some(b) = self.bound.as_mut() {
            if b.config.reset_on_trial_change {
                b.reset_controllers(self.last_update);
            }
        }
    }

    // ── Inspection ──────────────────────────────────────────

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn trial_state(&self) -> TrialState {
        self.trial_state
    }

    pub fn trial_controller(&self) -> Option<&dyn TrialController> {
        self.trial.as_deref()
    }

    pub fn config(&self) -> Option<&PluginConfig> {
        self.bound.as_ref().map(|b| &b.config)
    }

    pub fn chains(&self) -> Option<&ChainSet> {
        self.bound.as_ref().map(|b| &b.chains)
    }

    /// Latest fused sample.
    pub fn sample(&self) -> Option<&Sample> {
        self.bound.as_ref().map(|b| b.aggregator.current())
    }

    /// Efforts written on every tick until the next control step.
    pub fn held_efforts(&self, group: ChainGroup) -> Option<&[f64]> {
        self.bound
            .as_ref()
            .map(|b| b.held[group.index()].as_slice())
    }

    pub fn position_controller(&self, group: ChainGroup) -> Option<&PositionController> {
        self.bound.as_ref().map(|b| &b.controllers[group.index()])
    }

    /// Mutable access for targets and modes. Call between ticks.
    pub fn position_controller_mut(&mut self, group: ChainGroup) -> Option<&mut PositionController> {
        self.bound.as_mut().map(|b| &mut b.controllers[group.index()])
    }

    pub fn counter(&self) -> Option<CycleCounter> {
        self.bound.as_ref().map(|b| b.counter)
    }

    pub fn sensor_count(&self) -> usize {
        self.bound.as_ref().map_or(0, |b| b.sensors.len())
    }

    /// Time recorded by the last `starting`.
    pub fn baseline(&self) -> Duration {
        self.baseline
    }

    pub fn last_update_time(&self) -> Duration {
        self.last_update
    }

    /// Ticks executed since construction.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }
}
