//! State enums and identifiers shared by the controller and its host.
//!
//! All enums use `#[repr(u8)]` for compact layout in diagnostics.

use serde::{Deserialize, Serialize};

/// Opaque handle of a joint on the actuator interface.
///
/// Issued by the topology provider; stable for the lifetime of the robot model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JointHandle(pub u16);

impl JointHandle {
    /// Index form of the handle.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Actuator group / kinematic chain selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChainGroup {
    /// Chain from the base group root to the head (tip effector) link.
    /// Driven by the "base" position controller and by trial controllers.
    Active = 0,
    /// Chain from the base group root to the secondary ("right") effector.
    /// Driven by the "right" position controller.
    Passive = 1,
}

impl ChainGroup {
    /// Both groups in write-back order.
    pub const ALL: [ChainGroup; 2] = [ChainGroup::Active, ChainGroup::Passive];

    /// Array index for per-group storage.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Human-readable name used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Passive => "passive",
        }
    }
}

/// Lifecycle state of the control loop.
///
/// `Uninitialized → Ready` via `init`, `Ready/Stopped → Running` via
/// `starting`, `Running → Stopped` via `stopping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum LoopState {
    /// Constructed; chains and controllers not yet resolved.
    #[default]
    Uninitialized = 0,
    /// Initialized; waiting for `starting`.
    Ready = 1,
    /// Realtime ticks are being executed.
    Running = 2,
    /// Stopped between ticks; controller state retained.
    Stopped = 3,
}

impl LoopState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Uninitialized),
            1 => Some(Self::Ready),
            2 => Some(Self::Running),
            3 => Some(Self::Stopped),
            _ => None,
        }
    }
}

/// Trial controller slot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum TrialState {
    /// No trial controller routed; position controllers are authoritative.
    #[default]
    Unattached = 0,
    /// Attached while the loop is not running; becomes `Active` on `starting`.
    Standby = 1,
    /// Routing control-step output through the trial controller.
    Active = 2,
    /// Horizon exhausted; parked until the host detaches it.
    Finished = 3,
}

impl TrialState {
    /// Whether a trial controller occupies the slot.
    #[inline]
    pub const fn is_attached(self) -> bool {
        !matches!(self, Self::Unattached)
    }
}

/// Position controller mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ControlMode {
    /// Commands zero effort.
    NoControl = 0,
    /// PID tracking of a joint-space target.
    #[default]
    JointSpace = 1,
}
