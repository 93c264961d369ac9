//! Shared fixtures: a three-joint robot and its parameter file.

mod cadence;
mod hold_last_value;
mod sensor_fault;
mod startup;
mod trial_controller;

use std::time::Duration;

use gps_common::prelude::{DEFAULT_TICK_PERIOD, JointHandle, TomlConfigSource};
use gps_control_unit::control_loop::TickOutcome;
use gps_control_unit::host::{HostController, PluginAdapter};
use gps_control_unit::sim::SimRobot;
use gps_control_unit::topology::{ActuatorInterface, TopologyProvider};

pub const TICK: Duration = DEFAULT_TICK_PERIOD;

/// `world ─mount(fixed)─ base_link ─a1─ a1_link ─a2─ head`
/// `                     base_link ─p1─ right`
pub const ROBOT_TOML: &str = r#"
name = "test_rig"

[[joints]]
name = "mount"
parent = "world"
child = "base_link"
fixed = true

[[joints]]
name = "a1"
parent = "base_link"
child = "a1_link"
inertia = 0.5
damping = 2.0

[[joints]]
name = "a2"
parent = "a1_link"
child = "head"
inertia = 0.5
damping = 2.0

[[joints]]
name = "p1"
parent = "base_link"
child = "right"
inertia = 1.0
damping = 1.0
"#;

pub fn robot() -> SimRobot {
    SimRobot::from_toml_str(ROBOT_TOML).unwrap()
}

pub fn handle(robot: &SimRobot, name: &str) -> JointHandle {
    robot.joint_handle(name).unwrap()
}

/// Parameter file under `/GPSSuperchickPlugin` with PD gains on both groups.
pub fn params(step_length: u32) -> TomlConfigSource {
    TomlConfigSource::from_toml_str(&format!(
        r#"
[GPSSuperchickPlugin]
base_group = "base_link"
head_name = "head"
right_name = "right"
controller_step_length = {step_length}
active_arm_joint_name_1 = "a1"
active_arm_joint_name_2 = "a2"
passive_arm_joint_name_1 = "p1"

[GPSSuperchickPlugin.base_controller]
kp = 20.0
kd = 1.0
out_max = 50.0
target_1 = 0.5
target_2 = -0.25

[GPSSuperchickPlugin.right_controller]
kp = 10.0
kd = 2.0
out_max = 50.0
target_1 = 0.2
"#
    ))
    .unwrap()
}

/// Plugin initialized and started at robot time zero.
pub fn started_plugin(step_length: u32) -> PluginAdapter<SimRobot> {
    let mut plugin = PluginAdapter::new(robot());
    assert!(plugin.init(&params(step_length)));
    plugin.starting();
    plugin
}

/// Integrate the plant for one period, then tick at the new robot time.
pub fn step(plugin: &mut PluginAdapter<SimRobot>) -> TickOutcome {
    plugin.robot_mut().step(TICK);
    let time = plugin.robot().time();
    plugin.tick(time)
}

/// Commanded efforts of `[a1, a2, p1]`.
pub fn efforts(plugin: &PluginAdapter<SimRobot>) -> [f64; 3] {
    let r = plugin.robot();
    ["a1", "a2", "p1"].map(|n| r.commanded_effort(handle(r, n)).unwrap())
}
