//! Integration test: efforts are written every tick and held between
//! control steps.

use super::*;
use gps_common::state::ChainGroup;

#[test]
fn efforts_are_bitwise_held_between_control_steps() {
    let mut plugin = started_plugin(20);

    let mut held = [0.0; 3];
    for k in 1..=100u32 {
        let out = step(&mut plugin);
        let now = efforts(&plugin);
        if out.control_step {
            held = now;
        } else {
            for (a, b) in now.iter().zip(held.iter()) {
                assert_eq!(a.to_bits(), b.to_bits(), "tick {k}");
            }
        }
    }

    let lp = plugin.control();
    assert_eq!(lp.held_efforts(ChainGroup::Active).unwrap(), &held[..2]);
    assert_eq!(lp.held_efforts(ChainGroup::Passive).unwrap(), &held[2..]);
}

#[test]
fn every_chain_joint_is_written_every_tick() {
    let mut plugin = started_plugin(50);
    for _ in 0..75 {
        step(&mut plugin);
    }
    let r = plugin.robot();
    for name in ["a1", "a2", "p1"] {
        assert_eq!(r.write_count(handle(r, name)), 75, "joint {name}");
    }
}

#[test]
fn stopped_loop_writes_nothing() {
    let mut plugin = started_plugin(5);
    for _ in 0..10 {
        step(&mut plugin);
    }
    plugin.stopping();
    for _ in 0..10 {
        assert!(!step(&mut plugin).ran);
    }
    let r = plugin.robot();
    assert_eq!(r.write_count(handle(r, "a1")), 10);
}

#[test]
fn closed_loop_moves_toward_target() {
    let mut plugin = started_plugin(5);
    for _ in 0..3000 {
        step(&mut plugin);
    }
    let r = plugin.robot();
    let a1 = r.joint_position(handle(r, "a1")).unwrap();
    let a2 = r.joint_position(handle(r, "a2")).unwrap();
    let p1 = r.joint_position(handle(r, "p1")).unwrap();
    assert!((a1 - 0.5).abs() < 0.1, "a1 = {a1}");
    assert!((a2 + 0.25).abs() < 0.1, "a2 = {a2}");
    assert!((p1 - 0.2).abs() < 0.1, "p1 = {p1}");
}
