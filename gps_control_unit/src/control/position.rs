//! Joint-space position controller for one actuator group.
//!
//! One PID per joint, shared gains, output clamped to `±out_max`.
//! Called exactly once per control step by the loop.

use std::time::Duration;

use tracing::debug;

use gps_common::consts::MAX_JOINTS;
use gps_common::fault::ControllerFault;
use gps_common::state::{ChainGroup, ControlMode};

use crate::control::effort::JointEfforts;
use crate::control::pid::{PidGains, PidState, pid_compute};
use crate::error::TargetError;
use crate::sample::Sample;

/// PID position controller bound to one chain.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionController {
    name: &'static str,
    group: ChainGroup,
    gains: PidGains,
    mode: ControlMode,
    target: JointEfforts,
    pid: [PidState; MAX_JOINTS],
    /// Used when no time has elapsed since the previous step or reset.
    nominal_dt: f64,
    last_time: Option<Duration>,
    update_count: u64,
}

impl PositionController {
    /// New controller in [`ControlMode::JointSpace`] with an all-zero target.
    pub fn new(
        name: &'static str,
        group: ChainGroup,
        joints: usize,
        gains: PidGains,
        nominal_dt: Duration,
    ) -> Self {
        Self {
            name,
            group,
            gains,
            mode: ControlMode::JointSpace,
            target: JointEfforts::zeros(joints),
            pid: [PidState::default(); MAX_JOINTS],
            nominal_dt: nominal_dt.as_secs_f64(),
            last_time: None,
            update_count: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> ChainGroup {
        self.group
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Switching mode clears the PID memory.
    pub fn set_mode(&mut self, mode: ControlMode) {
        if mode != self.mode {
            debug!("{} controller mode {:?} → {:?}", self.name, self.mode, mode);
            self.mode = mode;
            self.clear_pid();
        }
    }

    pub fn target(&self) -> &[f64] {
        self.target.as_slice()
    }

    /// Set the joint-space target. Length must match the chain, all finite.
    pub fn set_target(&mut self, target: &[f64]) -> Result<(), TargetError> {
        if target.len() != self.target.len() {
            return Err(TargetError::LengthMismatch {
                expected: self.target.len(),
                got: target.len(),
            });
        }
        if let Some(i) = target.iter().position(|v| !v.is_finite()) {
            return Err(TargetError::NonFinite(i));
        }
        self.target.as_mut_slice().copy_from_slice(target);
        Ok(())
    }

    /// Number of `update` calls since construction.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Clear PID memory and start timing from `time`.
    pub fn reset(&mut self, time: Duration) {
        self.clear_pid();
        self.last_time = Some(time);
    }

    fn clear_pid(&mut self) {
        for s in self.pid.iter_mut() {
            s.reset();
        }
    }

    /// Compute efforts for one control step.
    ///
    /// An invalid sample or a shape mismatch yields zero effort with the
    /// corresponding fault. Non-finite joint efforts are zeroed, the rest
    /// clamped to `±out_max`.
    pub fn update(&mut self, time: Duration, sample: &Sample) -> (JointEfforts, ControllerFault) {
        self.update_count += 1;
        let n = self.target.len();
        let mut out = JointEfforts::zeros(n);

        let elapsed = match self.last_time {
            Some(last) if time > last => (time - last).as_secs_f64(),
            _ => self.nominal_dt,
        };
        self.last_time = Some(time);

        if !sample.is_valid() {
            return (out, ControllerFault::INVALID_SAMPLE);
        }
        let measured = sample.chain(self.group);
        if measured.len() != n {
            return (out, ControllerFault::SHAPE_MISMATCH);
        }

        match self.mode {
            ControlMode::NoControl => (out, ControllerFault::empty()),
            ControlMode::JointSpace => {
                let positions = measured.positions();
                for (i, u) in out.as_mut_slice().iter_mut().enumerate() {
                    let error = self.target.as_slice()[i] - positions[i];
                    *u = pid_compute(&mut self.pid[i], &self.gains, error, elapsed);
                }
                let fault = out.sanitize(self.gains.out_max);
                (out, fault)
            }
        }
    }
}
