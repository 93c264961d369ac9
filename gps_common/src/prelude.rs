//! Prelude module for common re-exports.
//!
//! ```rust
//! use gps_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, ConfigSource, TomlConfigSource};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{CONTROLLER_STEP_LENGTH_DEFAULT, MAX_JOINTS, TICK_PERIOD_US};

// ─── Faults & State ─────────────────────────────────────────────────
pub use crate::fault::{ControllerFault, SensorFault};
pub use crate::state::{ChainGroup, ControlMode, JointHandle, LoopState, TrialState};

/// Default tick period as Duration.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_micros(TICK_PERIOD_US);
