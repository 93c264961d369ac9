//! Joint state sensor: positions of both chains plus filtered velocities.
//!
//! All joints are read before anything is written, so a failed read leaves
//! both the sample and the velocity estimators untouched.

use std::time::Duration;

use gps_common::consts::MAX_JOINTS;
use gps_common::fault::SensorFault;
use gps_common::state::ChainGroup;

use crate::control::filters::VelocityEstimator;
use crate::sample::Sample;
use crate::sensor::{SensorContext, SensorSlot};

/// Position + velocity sensor over both chains.
#[derive(Debug, Clone, PartialEq)]
pub struct JointStateSensor {
    cutoff_hz: f64,
    estimators: [[VelocityEstimator; MAX_JOINTS]; 2],
    last_time: Option<Duration>,
}

impl JointStateSensor {
    /// `cutoff_hz` ≤ 0 disables velocity smoothing.
    pub fn new(cutoff_hz: f64) -> Self {
        Self {
            cutoff_hz,
            estimators: [[VelocityEstimator::default(); MAX_JOINTS]; 2],
            last_time: None,
        }
    }

    pub fn cutoff_hz(&self) -> f64 {
        self.cutoff_hz
    }
}

impl SensorSlot for JointStateSensor {
    fn name(&self) -> &'static str {
        "joint_state"
    }

    fn reset(&mut self, ctx: &SensorContext<'_>, time: Duration) {
        for group in ChainGroup::ALL {
            let chain = ctx.chains.get(group);
            let estimators = &mut self.estimators[group.index()];
            for est in estimators.iter_mut() {
                est.reset();
            }
            for (est, &h) in estimators.iter_mut().zip(chain.handles()) {
                match ctx.io.joint_position(h) {
                    Some(p) if p.is_finite() => est.prime(p),
                    _ => {}
                }
            }
        }
        self.last_time = Some(time);
    }

    fn update(
        &mut self,
        ctx: &SensorContext<'_>,
        sample: &mut Sample,
        time: Duration,
        _is_control_step: bool,
    ) -> Result<(), SensorFault> {
        let Some(last) = self.last_time else {
            return Err(SensorFault::NOT_RESET);
        };
        if time < last {
            return Err(SensorFault::TIME_WENT_BACKWARDS);
        }

        let mut positions = [[0.0; MAX_JOINTS]; 2];
        let mut fault = SensorFault::empty();
        for group in ChainGroup::ALL {
            let handles = ctx.chains.get(group).handles();
            for (slot, &h) in positions[group.index()].iter_mut().zip(handles) {
                match ctx.io.joint_position(h) {
                    Some(p) if p.is_finite() => *slot = p,
                    Some(_) => fault |= SensorFault::NON_FINITE_READING,
                    None => fault |= SensorFault::READ_FAILED,
                }
            }
        }
        if !fault.is_empty() {
            return Err(fault);
        }

        let dt = (time - last).as_secs_f64();
        for group in ChainGroup::ALL {
            let g = group.index();
            let out = sample.chain_mut(group);
            let n = out.len();
            for i in 0..n {
                let p = positions[g][i];
                let v = self.estimators[g][i].update(p, dt, self.cutoff_hz);
                out.positions_mut()[i] = p;
                out.velocities_mut()[i] = v;
            }
        }
        self.last_time = Some(time);
        Ok(())
    }
}
