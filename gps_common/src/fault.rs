//! Per-tick fault flags.
//!
//! Faults raised inside the realtime tick are never propagated as errors.
//! They are reported as compact bitflag sets, counted, and handled locally:
//!
//! - [`SensorFault`]: the slot's contribution to the sample is discarded
//!   and the last valid values are kept.
//! - [`ControllerFault`]: affected joints fall back to zero or clamped effort.

use bitflags::bitflags;

bitflags! {
    /// Sensor slot fault flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SensorFault: u8 {
        /// A raw reading was NaN or infinite.
        const NON_FINITE_READING = 0x01;
        /// A joint handle could not be read from the actuator interface.
        const READ_FAILED        = 0x02;
        /// The slot saw a timestamp older than its previous update.
        const TIME_WENT_BACKWARDS = 0x04;
        /// The slot was updated before being reset in this session.
        const NOT_RESET          = 0x08;
    }
}

impl Default for SensorFault {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Controller fault flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControllerFault: u8 {
        /// Computed effort was NaN or infinite → zero effort for that joint.
        const NON_FINITE_OUTPUT = 0x01;
        /// Computed effort exceeded the limit and was clamped.
        const SATURATED         = 0x02;
        /// The sample fed to the controller was not valid yet.
        const INVALID_SAMPLE    = 0x04;
        /// Output length did not match the chain → output discarded.
        const SHAPE_MISMATCH    = 0x08;
        /// A trial controller was stepped past its horizon.
        const HORIZON_EXCEEDED  = 0x10;
    }
}

impl ControllerFault {
    /// Flags that mean the controller could not produce a valid effort.
    ///
    /// `SATURATED` is informational: the clamped effort is still valid.
    pub const INVALID_MASK: Self = Self::from_bits_truncate(
        Self::NON_FINITE_OUTPUT.bits()
            | Self::INVALID_SAMPLE.bits()
            | Self::SHAPE_MISMATCH.bits()
            | Self::HORIZON_EXCEEDED.bits(),
    );

    /// Returns true if any flag in [`Self::INVALID_MASK`] is set.
    #[inline]
    pub const fn is_invalid(&self) -> bool {
        self.intersects(Self::INVALID_MASK)
    }
}

impl Default for ControllerFault {
    fn default() -> Self {
        Self::empty()
    }
}
