//! System-wide constants for the GPS controller workspace.
//!
//! Single source of truth for all numeric limits and defaults.
//! Imported by all crates; no duplication permitted.

use static_assertions::const_assert;

/// Maximum number of joints in a single kinematic chain.
///
/// Bounds every per-chain fixed-size array (samples, efforts, PID state).
pub const MAX_JOINTS: usize = 16;

/// Maximum number of sensor slots registered on one control loop.
pub const MAX_SENSORS: usize = 8;

/// Default tick period in microseconds (1 kHz).
pub const TICK_PERIOD_US: u64 = 1000;

/// Lower bound for the tick period [µs].
pub const TICK_PERIOD_US_MIN: u64 = 100;

/// Upper bound for the tick period [µs].
pub const TICK_PERIOD_US_MAX: u64 = 100_000;

/// Default number of ticks between control steps.
pub const CONTROLLER_STEP_LENGTH_DEFAULT: u32 = 50;

/// Upper bound for `controller_step_length`.
pub const CONTROLLER_STEP_LENGTH_MAX: u32 = 10_000;

/// Default velocity estimator cutoff frequency [Hz].
pub const VELOCITY_CUTOFF_HZ_DEFAULT: f64 = 30.0;

/// Default parameter namespace consulted by the plugin adapter.
pub const DEFAULT_NAMESPACE: &str = "/GPSSuperchickPlugin";

const_assert!(MAX_JOINTS > 0 && MAX_JOINTS <= u8::MAX as usize);
const_assert!(MAX_SENSORS > 0);
const_assert!(TICK_PERIOD_US >= TICK_PERIOD_US_MIN && TICK_PERIOD_US <= TICK_PERIOD_US_MAX);
const_assert!(CONTROLLER_STEP_LENGTH_DEFAULT <= CONTROLLER_STEP_LENGTH_MAX);
