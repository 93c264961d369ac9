//! # GPS Control Unit Library
//!
//! Realtime actuator controller for a soft-actuated robot, hosted inside a
//! fixed-period control loop. Every tick it aggregates sensor readings
//! for two kinematic chains; every `controller_step_length` ticks it runs
//! the position controllers (optionally overridden by a trial controller
//! on the active chain) and otherwise holds the last commanded efforts.
//!
//! ## Structure
//!
//! - [`topology`] - collaborator traits for the robot model and actuators
//! - [`chain`] - kinematic chain resolution
//! - [`sample`] / [`sensor`] - multi-rate sensor slots and the shared sample
//! - [`control`] - PID position control and trial controllers
//! - [`control_loop`] - the lifecycle and tick orchestrator
//! - [`host`] - host lifecycle hooks over the control loop
//! - [`cycle`] - fixed-period pacing and RT setup
//! - [`sim`] - simulated robot for the binary and tests
//!
//! ## Zero-Allocation Tick
//!
//! Chains, samples, efforts and controller state are sized at `init`
//! into fixed-capacity storage. The tick performs no heap allocation.

#![deny(clippy::disallowed_types)]

pub mod chain;
pub mod config;
pub mod control;
pub mod control_loop;
pub mod cycle;
pub mod error;
pub mod host;
pub mod sample;
pub mod sensor;
pub mod sim;
pub mod topology;
