//! Integration test: trial controller routing on the active chain.
//!
//! Positions are held still so that the position controllers produce
//! the same efforts in two plugins with different trial routing.

use std::time::Duration;

use super::*;
use gps_common::fault::ControllerFault;
use gps_common::state::TrialState;
use gps_control_unit::control::effort::JointEfforts;
use gps_control_unit::control::lin_gauss::LinearGaussianController;
use gps_control_unit::control::trial::{OutputMode, TrialController, TrialOutput};
use gps_control_unit::sample::Sample;

/// Constant-output trial controller.
struct Constant {
    efforts: JointEfforts,
    mode: OutputMode,
}

impl Constant {
    fn boxed(efforts: &[f64], mode: OutputMode) -> Box<Self> {
        Box::new(Self {
            efforts: JointEfforts::from_slice(efforts).unwrap(),
            mode,
        })
    }
}

impl TrialController for Constant {
    fn name(&self) -> &str {
        "constant"
    }

    fn reset(&mut self, _time: Duration) {}

    fn update(&mut self, _time: Duration, _sample: &Sample) -> Result<TrialOutput, ControllerFault> {
        Ok(TrialOutput {
            efforts: self.efforts,
            mode: self.mode,
        })
    }
}

/// Tick without moving the plant.
fn still_tick(plugin: &mut PluginAdapter<SimRobot>) -> TickOutcome {
    plugin.robot_mut().advance_time(TICK);
    let time = plugin.robot().time();
    plugin.tick(time)
}

fn still_ticks(plugin: &mut PluginAdapter<SimRobot>, n: usize) {
    for _ in 0..n {
        still_tick(plugin);
    }
}

#[test]
fn mid_session_attach_overrides_active_chain() {
    let mut plugin = started_plugin(5);
    let mut reference = started_plugin(5);
    still_ticks(&mut plugin, 10);
    still_ticks(&mut reference, 10);

    let previous = plugin
        .control_mut()
        .attach_trial_controller(Constant::boxed(&[3.0, -3.0], OutputMode::Override));
    assert!(previous.is_none());
    assert_eq!(plugin.control().trial_state(), TrialState::Active);

    // Held efforts are untouched until the next control step.
    still_ticks(&mut plugin, 4);
    still_ticks(&mut reference, 4);
    assert_eq!(efforts(&plugin), efforts(&reference));

    still_tick(&mut plugin);
    still_tick(&mut reference);
    let [a1, a2, p1] = efforts(&plugin);
    assert_eq!([a1, a2], [3.0, -3.0]);
    // Passive chain stays on the right position controller.
    assert_eq!(p1, efforts(&reference)[2]);
}

#[test]
fn detach_restores_position_control() {
    let mut plugin = started_plugin(5);
    let mut reference = started_plugin(5);
    plugin
        .control_mut()
        .attach_trial_controller(Constant::boxed(&[3.0, -3.0], OutputMode::Override));

    still_ticks(&mut plugin, 10);
    still_ticks(&mut reference, 10);
    assert_eq!(&efforts(&plugin)[..2], &[3.0, -3.0]);

    let detached = plugin.control_mut().detach_trial_controller();
    assert_eq!(detached.map(|t| t.name().to_string()).as_deref(), Some("constant"));
    assert_eq!(plugin.control().trial_state(), TrialState::Unattached);
    assert!(plugin.control_mut().detach_trial_controller().is_none());

    still_ticks(&mut plugin, 5);
    still_ticks(&mut reference, 5);
    assert_eq!(efforts(&plugin), efforts(&reference));
}

#[test]
fn finished_trial_hands_back_to_position_control() {
    let mut plugin = PluginAdapter::new(robot());
    let mut reference = PluginAdapter::new(robot());
    assert!(plugin.init(&params(5)));
    assert!(reference.init(&params(5)));

    let trial = LinearGaussianController::pd(&[0.5, -0.25], 30.0, 0.05, 3).unwrap();
    plugin.control_mut().attach_trial_controller(Box::new(trial));
    assert_eq!(plugin.control().trial_state(), TrialState::Standby);

    plugin.starting();
    reference.starting();
    assert_eq!(plugin.control().trial_state(), TrialState::Active);

    for _ in 0..3 {
        still_ticks(&mut plugin, 5);
        still_ticks(&mut reference, 5);
        // At rest: u = pos_gain · target.
        assert_eq!(&efforts(&plugin)[..2], &[15.0, -7.5]);
        assert_eq!(plugin.control().trial_state(), TrialState::Active);
    }
    assert!(plugin.control().trial_controller().unwrap().is_finished());

    still_ticks(&mut plugin, 5);
    still_ticks(&mut reference, 5);
    assert_eq!(plugin.control().trial_state(), TrialState::Finished);
    assert_eq!(efforts(&plugin), efforts(&reference));
}

#[test]
fn blend_mixes_trial_and_position_output() {
    let mut plugin = started_plugin(5);
    let mut reference = started_plugin(5);
    plugin
        .control_mut()
        .attach_trial_controller(Constant::boxed(&[4.0, 4.0], OutputMode::Blend(0.25)));

    still_ticks(&mut plugin, 10);
    still_ticks(&mut reference, 10);

    let got = efforts(&plugin);
    let base = efforts(&reference);
    for i in 0..2 {
        let expected = 0.25 * 4.0 + 0.75 * base[i];
        assert!((got[i] - expected).abs() < 1e-12, "joint {i}: {} vs {expected}", got[i]);
    }
    assert_eq!(got[2], base[2]);
}

#[test]
fn wrong_length_output_commands_zero_on_active_chain() {
    let mut plugin = started_plugin(5);
    let mut reference = started_plugin(5);
    plugin
        .control_mut()
        .attach_trial_controller(Constant::boxed(&[1.0, 1.0, 1.0], OutputMode::Override));

    let mut last = TickOutcome::default();
    for _ in 0..5 {
        last = still_tick(&mut plugin);
        still_tick(&mut reference);
    }
    assert!(last.control_step);
    assert!(last.controller_faults.contains(ControllerFault::SHAPE_MISMATCH));
    let [a1, a2, p1] = efforts(&plugin);
    assert_eq!([a1, a2], [0.0, 0.0]);
    assert_eq!(p1, efforts(&reference)[2]);
}

#[test]
fn trial_output_is_clamped_to_base_limit() {
    let mut plugin = started_plugin(5);
    plugin
        .control_mut()
        .attach_trial_controller(Constant::boxed(&[500.0, f64::NAN], OutputMode::Override));

    still_ticks(&mut plugin, 4);
    let out = still_tick(&mut plugin);
    assert!(out.controller_faults.contains(ControllerFault::SATURATED));
    assert!(out.controller_faults.contains(ControllerFault::NON_FINITE_OUTPUT));
    assert_eq!(&efforts(&plugin)[..2], &[50.0, 0.0]);
}
