//! External collaborator interfaces: robot topology and actuator I/O.
//!
//! The control loop never sees a robot model directly. It calls through
//! these two narrow traits:
//!
//! - [`TopologyProvider`]: consulted only during `init` to resolve chains.
//! - [`ActuatorInterface`]: read joint state and write commanded effort,
//!   called from the realtime tick. Implementations must not block or
//!   allocate in these methods.

use std::time::Duration;

use gps_common::state::JointHandle;

/// Robot topology lookup (init-time only).
pub trait TopologyProvider {
    /// Ordered actuated joint names on the downward path from `root`
    /// link to `tip` link. `None` when no such path exists.
    fn chain_joints(&self, root: &str, tip: &str) -> Option<Vec<String>>;

    /// State handle of a named joint. `None` for unknown joints.
    fn joint_handle(&self, name: &str) -> Option<JointHandle>;
}

/// Realtime actuator access.
pub trait ActuatorInterface {
    /// Monotonic controller time.
    fn time(&self) -> Duration;

    /// Measured joint position, `None` if the handle cannot be read.
    fn joint_position(&self, joint: JointHandle) -> Option<f64>;

    /// Write the commanded effort slot of one joint.
    fn set_commanded_effort(&mut self, joint: JointHandle, effort: f64);
}
