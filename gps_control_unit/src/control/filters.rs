//! Signal conditioning for joint state.
//!
//! First-order low-pass and a finite-difference velocity estimator built
//! on it. A cutoff of zero disables smoothing.

use core::f64::consts::PI;

// ─── Low-Pass Filter (1st-order) ────────────────────────────────────

/// First-order low-pass memory.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LowPassState {
    prev_output: f64,
}

impl LowPassState {
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Seed the filter output so the next step starts from `value`.
    #[inline]
    pub fn prime(&mut self, value: f64) {
        self.prev_output = value;
    }

    #[inline]
    pub fn output(&self) -> f64 {
        self.prev_output
    }
}

/// One low-pass step.
///
/// ```text
/// ω = 2π·flp·dt
/// y[n] = y[n-1] + ω/(1+ω) · (x[n] − y[n-1])
/// ```
///
/// Passes `input` through when `flp <= 0` or `dt <= 0`.
#[inline]
pub fn lowpass_apply(state: &mut LowPassState, flp: f64, input: f64, dt: f64) -> f64 {
    if flp <= 0.0 || dt <= 0.0 {
        state.prev_output = input;
        return input;
    }
    let omega = 2.0 * PI * flp * dt;
    let output = state.prev_output + omega / (1.0 + omega) * (input - state.prev_output);
    state.prev_output = output;
    output
}

// ─── Velocity estimator ─────────────────────────────────────────────

/// Backward-difference velocity, low-pass filtered.
///
/// Unprimed until the first [`VelocityEstimator::prime`]; an unprimed
/// estimator reports zero velocity and primes itself on the next sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VelocityEstimator {
    prev_position: f64,
    filter: LowPassState,
    primed: bool,
}

impl VelocityEstimator {
    /// Forget history. The next sample only primes.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Start from a known position at rest.
    #[inline]
    pub fn prime(&mut self, position: f64) {
        self.prev_position = position;
        self.filter.reset();
        self.primed = true;
    }

    /// Feed a new position `dt` seconds after the previous one.
    ///
    /// `dt == 0` (two sensor updates at the same timestamp) repeats the
    /// last estimate.
    #[inline]
    pub fn update(&mut self, position: f64, dt: f64, cutoff_hz: f64) -> f64 {
        if !self.primed {
            self.prime(position);
            return 0.0;
        }
        if dt <= 0.0 {
            return self.filter.output();
        }
        let raw = (position - self.prev_position) / dt;
        self.prev_position = position;
        lowpass_apply(&mut self.filter, cutoff_hz, raw, dt)
    }

    /// Last estimate.
    #[inline]
    pub fn velocity(&self) -> f64 {
        self.filter.output()
    }
}
