//! Initialization error taxonomy.
//!
//! Only initialization is allowed to fail. Everything raised inside the
//! realtime tick is a [`gps_common::fault`] flag set handled locally.

use gps_common::config::ConfigError;
use gps_common::state::LoopState;
use thiserror::Error;

/// Required configuration missing or invalid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// A required key is absent from the configuration source.
    #[error("required configuration key '{0}' not found")]
    MissingKey(String),

    /// A key is present but its value is out of range or malformed.
    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Underlying configuration source / file error.
    #[error(transparent)]
    Source(#[from] ConfigError),
}

/// Kinematic chain could not be bound to the topology.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainResolutionError {
    /// No downward path from `root` to `tip` exists.
    #[error("no chain from '{root}' to '{tip}'")]
    NoPath { root: String, tip: String },

    /// A joint on the path has no state handle on the actuator interface.
    #[error("joint '{0}' on chain has no joint state")]
    UnknownJoint(String),

    /// Resolved chain length disagrees with the configured joint-name list.
    #[error("{chain} chain has {resolved} joints but {configured} joint names are configured")]
    JointCountMismatch {
        chain: &'static str,
        resolved: usize,
        configured: usize,
    },

    /// Configured joint name does not match the joint at that chain index.
    #[error("{chain} chain joint {index} is '{resolved}' but configuration names '{configured}'")]
    JointNameMismatch {
        chain: &'static str,
        index: usize,
        resolved: String,
        configured: String,
    },

    /// Chain exceeds the fixed per-chain capacity.
    #[error("chain from '{root}' to '{tip}' has {len} joints (max {max})")]
    TooManyJoints {
        root: String,
        tip: String,
        len: usize,
        max: usize,
    },

    /// Chain resolved to zero actuated joints.
    #[error("chain from '{root}' to '{tip}' has no joints")]
    Empty { root: String, tip: String },

    /// A joint lies on both the active and the passive chain.
    #[error("joint '{joint}' is on both chains")]
    OverlappingChains { joint: String },
}

/// Lifecycle operation failure.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("chain resolution error: {0}")]
    ChainResolution(#[from] ChainResolutionError),

    /// Requested lifecycle transition is not valid from the current state.
    #[error("invalid lifecycle transition {operation} from {from:?}")]
    InvalidTransition {
        operation: &'static str,
        from: LoopState,
    },

    /// More sensor slots were configured than the loop can hold.
    #[error("too many sensor slots: {0}")]
    TooManySensors(usize),
}

/// Rejected position controller target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("target has {got} entries, chain has {expected} joints")]
    LengthMismatch { expected: usize, got: usize },

    #[error("target entry {0} is not finite")]
    NonFinite(usize),
}
