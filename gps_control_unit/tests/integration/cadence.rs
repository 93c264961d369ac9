//! Integration test: multi-rate cadence.
//!
//! Sensors run every tick; controllers run once every
//! `controller_step_length` ticks, on the wrap of the cycle counter.

use super::*;
use gps_common::state::ChainGroup;

#[test]
fn controllers_run_every_step_length_ticks() {
    let mut plugin = started_plugin(50);

    let mut control_ticks = Vec::new();
    for k in 1..=150u32 {
        let out = step(&mut plugin);
        assert!(out.ran);
        if out.control_step {
            control_ticks.push(k);
        }
    }

    assert_eq!(control_ticks, vec![50, 100, 150]);
    let lp = plugin.control();
    assert_eq!(lp.tick_count(), 150);
    for group in ChainGroup::ALL {
        assert_eq!(lp.position_controller(group).unwrap().update_count(), 3);
    }
}

#[test]
fn sample_is_refreshed_every_tick() {
    let mut plugin = started_plugin(50);
    for _ in 0..7 {
        step(&mut plugin);
        let now = plugin.robot().time();
        let sample = plugin.control().sample().unwrap();
        assert!(sample.is_valid());
        assert_eq!(sample.time(), now);
    }
}

#[test]
fn step_length_one_controls_every_tick() {
    let mut plugin = started_plugin(1);
    for _ in 0..10 {
        assert!(step(&mut plugin).control_step);
    }
    let lp = plugin.control();
    assert_eq!(
        lp.position_controller(ChainGroup::Active).unwrap().update_count(),
        10
    );
}

#[test]
fn restart_realigns_control_steps() {
    let mut plugin = started_plugin(5);
    for _ in 0..3 {
        step(&mut plugin);
    }
    plugin.stopping();
    plugin.starting();

    // Counter starts from zero again: first control step is the fifth tick.
    let steps: Vec<bool> = (0..5).map(|_| step(&mut plugin).control_step).collect();
    assert_eq!(steps, vec![false, false, false, false, true]);
}

#[test]
fn efforts_are_zero_before_first_control_step() {
    let mut plugin = started_plugin(10);
    for _ in 0..9 {
        step(&mut plugin);
        assert_eq!(efforts(&plugin), [0.0; 3]);
    }
    step(&mut plugin);
    let [a1, a2, p1] = efforts(&plugin);
    // PD toward targets 0.5, -0.25, 0.2 from rest at zero.
    assert!(a1 > 0.0);
    assert!(a2 < 0.0);
    assert!(p1 > 0.0);
}
