//! Joint PID kernel.
//!
//! Backward Euler integral, first-order filtered derivative (`tf`) and
//! back-calculation anti-windup (`tt`, `out_max`). A zero `ki` or `kd`
//! disables that term.

use serde::{Deserialize, Serialize};

/// Per-joint PID memory. Cleared only by [`PidState::reset`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidState {
    integral: f64,
    prev_error: f64,
    derivative_filtered: f64,
    /// Unclamped output of the previous step, fed back for anti-windup.
    prev_raw_output: f64,
}

impl PidState {
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Integral accumulator (diagnostics).
    #[inline]
    pub fn integral(&self) -> f64 {
        self.integral
    }
}

/// Gains of one actuator group. All joints of a group share them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Derivative filter time constant [s], 0 = unfiltered.
    pub tf: f64,
    /// Anti-windup tracking time constant [s], 0 = off.
    pub tt: f64,
    /// Effort limit, also the output clamp of the position controller.
    pub out_max: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            tf: 0.0,
            tt: 0.0,
            out_max: f64::INFINITY,
        }
    }
}

impl PidGains {
    /// All gains finite, non-negative; `out_max` positive (may be infinite).
    pub fn validate(&self) -> Result<(), String> {
        for (name, v) in [
            ("kp", self.kp),
            ("ki", self.ki),
            ("kd", self.kd),
            ("tf", self.tf),
            ("tt", self.tt),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(format!("{name} = {v} must be finite and >= 0"));
            }
        }
        if !(self.out_max > 0.0) {
            return Err(format!("out_max = {} must be > 0", self.out_max));
        }
        Ok(())
    }
}

/// One PID step. Returns the raw (unclamped) effort.
///
/// `error` is target − measured, `dt` the time since the previous step [s].
/// A non-positive `dt` yields zero and leaves the state untouched.
#[inline]
pub fn pid_compute(state: &mut PidState, gains: &PidGains, error: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }

    let p = gains.kp * error;

    let i = if gains.ki != 0.0 {
        let back_calc = if gains.tt > 0.0 && gains.out_max.is_finite() {
            let clamped = state.prev_raw_output.clamp(-gains.out_max, gains.out_max);
            (clamped - state.prev_raw_output) / gains.tt
        } else {
            0.0
        };
        state.integral += (gains.ki * error + back_calc) * dt;
        state.integral
    } else {
        state.integral = 0.0;
        0.0
    };

    let d = if gains.kd != 0.0 {
        let rate = (error - state.prev_error) / dt;
        if gains.tf > 0.0 {
            state.derivative_filtered += dt / (gains.tf + dt) * (rate - state.derivative_filtered);
            gains.kd * state.derivative_filtered
        } else {
            gains.kd * rate
        }
    } else {
        state.derivative_filtered = 0.0;
        0.0
    };

    state.prev_error = error;
    let raw = p + i + d;
    state.prev_raw_output = raw;
    raw
}
