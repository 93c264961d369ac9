//! Pluggable trial controllers.
//!
//! A trial controller drives the active chain during a trial. Its output
//! either overrides the base position controller or is blended with it.
//! The passive chain always stays on the right position controller.

use std::time::Duration;

use gps_common::fault::ControllerFault;

use crate::control::effort::JointEfforts;
use crate::sample::Sample;

/// How trial output combines with the position controller output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    /// Trial output replaces the position controller output.
    Override,
    /// `w·trial + (1 − w)·position`, `w` in `[0, 1]`.
    Blend(f64),
}

impl OutputMode {
    /// Weight in range and finite.
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::Override => true,
            Self::Blend(w) => (0.0..=1.0).contains(&w),
        }
    }

    /// Combine trial and position outputs of equal length.
    #[inline]
    pub fn combine(&self, trial: &JointEfforts, position: &JointEfforts) -> JointEfforts {
        match *self {
            Self::Override => *trial,
            Self::Blend(w) => trial.blend(position, w),
        }
    }
}

/// Active-chain command produced by a trial controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialOutput {
    pub efforts: JointEfforts,
    pub mode: OutputMode,
}

/// Policy controller attached for the duration of a trial.
///
/// `update` runs on control steps only, on the realtime thread: it must
/// not block or allocate.
pub trait TrialController: Send {
    fn name(&self) -> &str;

    /// Clear per-trial state; `time` is the baseline.
    fn reset(&mut self, time: Duration);

    /// Efforts for the active chain.
    fn update(&mut self, time: Duration, sample: &Sample) -> Result<TrialOutput, ControllerFault>;

    /// True once the controller has nothing more to command.
    fn is_finished(&self) -> bool {
        false
    }
}
