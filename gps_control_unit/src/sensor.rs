//! Sensor slots.
//!
//! A [`SensorSlot`] reads raw actuator state once per tick and writes its
//! part of the shared [`Sample`]. Slots are held in a flat, fixed-capacity
//! [`SensorRegistry`] and run in registration order on every tick,
//! control step or not.

pub mod joint_state;

use std::time::Duration;

use heapless::Vec as FixedVec;
use tracing::{info, warn};

use gps_common::consts::MAX_SENSORS;
use gps_common::fault::SensorFault;

use crate::chain::ChainSet;
use crate::error::InitError;
use crate::sample::{Sample, SampleAggregator};
use crate::topology::ActuatorInterface;

pub use joint_state::JointStateSensor;

/// Read-only view of the robot passed to sensor slots.
#[derive(Clone, Copy)]
pub struct SensorContext<'a> {
    pub io: &'a dyn ActuatorInterface,
    pub chains: &'a ChainSet,
}

/// One polymorphic sensor.
pub trait SensorSlot: Send {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Clear accumulated history. Precedes any `update` in a session.
    fn reset(&mut self, ctx: &SensorContext<'_>, time: Duration);

    /// Read the robot and write into `sample`.
    ///
    /// On `Err` the caller discards everything written to `sample`.
    fn update(
        &mut self,
        ctx: &SensorContext<'_>,
        sample: &mut Sample,
        time: Duration,
        is_control_step: bool,
    ) -> Result<(), SensorFault>;
}

/// Built-in sensor kinds constructible from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorKind {
    /// Joint positions and filtered finite-difference velocities.
    JointState { velocity_cutoff_hz: f64 },
}

impl SensorKind {
    pub fn build(self) -> Box<dyn SensorSlot> {
        match self {
            Self::JointState { velocity_cutoff_hz } => {
                Box::new(JointStateSensor::new(velocity_cutoff_hz))
            }
        }
    }
}

struct Registered {
    slot: Box<dyn SensorSlot>,
    last_fault: SensorFault,
}

/// Fixed-capacity list of sensor slots.
#[derive(Default)]
pub struct SensorRegistry {
    slots: FixedVec<Registered, MAX_SENSORS>,
}

impl SensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slot. Init-time only.
    pub fn register(&mut self, slot: Box<dyn SensorSlot>) -> Result<(), InitError> {
        let name = slot.name();
        self.slots
            .push(Registered {
                slot,
                last_fault: SensorFault::empty(),
            })
            .map_err(|_| InitError::TooManySensors(MAX_SENSORS + 1))?;
        info!("Registered sensor slot '{name}' ({} total)", self.slots.len());
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Reset every slot with the session baseline.
    pub fn reset_all(&mut self, ctx: &SensorContext<'_>, time: Duration) {
        for r in self.slots.iter_mut() {
            r.slot.reset(ctx, time);
            r.last_fault = SensorFault::empty();
        }
    }

    /// Run every slot once. Returns the union of this tick's faults.
    ///
    /// A faulted slot's writes are discarded; later slots still run.
    /// Faults are logged on their rising and falling edge only.
    pub fn update_all(
        &mut self,
        ctx: &SensorContext<'_>,
        aggregator: &mut SampleAggregator,
        time: Duration,
        is_control_step: bool,
    ) -> SensorFault {
        let mut tick_faults = SensorFault::empty();
        for r in self.slots.iter_mut() {
            let sample = aggregator.begin_slot();
            let fault = match r.slot.update(ctx, sample, time, is_control_step) {
                Ok(()) => {
                    aggregator.commit_slot(time);
                    SensorFault::empty()
                }
                Err(f) => f,
            };

            if fault != r.last_fault {
                if fault.is_empty() {
                    info!("sensor '{}' recovered at {:?}", r.slot.name(), time);
                } else {
                    warn!(
                        "sensor '{}' fault {:?} at {:?}; keeping last sample",
                        r.slot.name(),
                        fault,
                        time
                    );
                }
                r.last_fault = fault;
            }
            tick_faults |= fault;
        }
        tick_faults
    }
}
