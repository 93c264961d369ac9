//! Integration test: a faulted sensor update keeps the last valid sample
//! and the loop keeps running.

use super::*;
use gps_common::fault::SensorFault;
use gps_common::state::ChainGroup;

/// Set all three joint positions to `q`, advance the clock, tick.
fn tick_at(plugin: &mut PluginAdapter<SimRobot>, q: [f64; 3]) -> TickOutcome {
    let r = plugin.robot_mut();
    for (name, v) in ["a1", "a2", "p1"].into_iter().zip(q) {
        let h = handle(r, name);
        r.set_position(h, v);
    }
    r.advance_time(TICK);
    let time = plugin.robot().time();
    plugin.tick(time)
}

fn ramp(k: u32) -> [f64; 3] {
    let x = 0.01 * f64::from(k);
    [x, -x, 2.0 * x]
}

#[test]
fn non_finite_reading_keeps_previous_sample() {
    let mut plugin = started_plugin(50);

    for k in 1..=9 {
        assert!(tick_at(&mut plugin, ramp(k)).sensor_faults.is_empty());
    }
    let at_tick_9 = *plugin.control().sample().unwrap();
    assert_eq!(at_tick_9.chain(ChainGroup::Active).positions(), &ramp(9)[..2]);

    // NaN on one active joint; the passive joint reads fine but the whole
    // slot update is discarded.
    let mut bad = ramp(10);
    bad[0] = f64::NAN;
    let out = tick_at(&mut plugin, bad);
    assert!(out.ran);
    assert_eq!(out.sensor_faults, SensorFault::NON_FINITE_READING);
    assert_eq!(*plugin.control().sample().unwrap(), at_tick_9);

    // Next good reading is taken up again.
    let out = tick_at(&mut plugin, ramp(11));
    assert!(out.sensor_faults.is_empty());
    let sample = plugin.control().sample().unwrap();
    assert_eq!(sample.chain(ChainGroup::Active).positions(), &ramp(11)[..2]);
    assert_eq!(sample.chain(ChainGroup::Passive).positions(), &ramp(11)[2..]);
    assert_eq!(sample.time(), plugin.robot().time());
}

#[test]
fn loop_keeps_writing_through_sensor_faults() {
    let mut plugin = started_plugin(5);
    for k in 1..=4 {
        tick_at(&mut plugin, ramp(k));
    }
    // Faulted across a control step.
    for _ in 5..=12 {
        let out = tick_at(&mut plugin, [f64::INFINITY, 0.0, 0.0]);
        assert!(out.ran);
        assert!(out.sensor_faults.contains(SensorFault::NON_FINITE_READING));
    }
    let r = plugin.robot();
    for name in ["a1", "a2", "p1"] {
        assert_eq!(r.write_count(handle(r, name)), 12);
    }
    // Controllers still ran on the stale but valid sample.
    let efforts = efforts(&plugin);
    assert!(efforts.iter().all(|u| u.is_finite()));
    assert_eq!(
        plugin
            .control()
            .position_controller(ChainGroup::Active)
            .unwrap()
            .update_count(),
        2
    );
}

#[test]
fn fault_before_first_reading_leaves_sample_invalid() {
    let mut plugin = started_plugin(1);
    let out = tick_at(&mut plugin, [f64::NAN, 0.0, 0.0]);
    assert!(!out.sensor_faults.is_empty());
    assert!(!plugin.control().sample().unwrap().is_valid());
    // Control step on an invalid sample commands zero effort.
    assert!(out.controller_faults.is_invalid());
    assert_eq!(efforts(&plugin), [0.0; 3]);
}
