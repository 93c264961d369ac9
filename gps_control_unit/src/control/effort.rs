//! Fixed-capacity joint effort vector.

use gps_common::consts::MAX_JOINTS;
use gps_common::fault::ControllerFault;

/// One effort per chain joint, indexed like the chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointEfforts {
    values: [f64; MAX_JOINTS],
    len: u8,
}

impl JointEfforts {
    /// `len` zeros (capped at [`MAX_JOINTS`]).
    pub fn zeros(len: usize) -> Self {
        Self {
            values: [0.0; MAX_JOINTS],
            len: len.min(MAX_JOINTS) as u8,
        }
    }

    /// Copy from a slice. `None` if longer than [`MAX_JOINTS`].
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        if values.len() > MAX_JOINTS {
            return None;
        }
        let mut e = Self::zeros(values.len());
        e.values[..values.len()].copy_from_slice(values);
        Some(e)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.values[..self.len()]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        let n = self.len();
        &mut self.values[..n]
    }

    /// Zero every entry, keeping the length.
    #[inline]
    pub fn clear(&mut self) {
        self.values = [0.0; MAX_JOINTS];
    }

    /// Replace non-finite entries with zero and clamp to `±limit`.
    ///
    /// Returns the faults raised. An infinite `limit` disables clamping.
    pub fn sanitize(&mut self, limit: f64) -> ControllerFault {
        let mut fault = ControllerFault::empty();
        for v in self.as_mut_slice() {
            if !v.is_finite() {
                *v = 0.0;
                fault |= ControllerFault::NON_FINITE_OUTPUT;
            } else if v.abs() > limit {
                *v = v.clamp(-limit, limit);
                fault |= ControllerFault::SATURATED;
            }
        }
        fault
    }

    /// `w·self + (1 − w)·other`, element-wise. Lengths must match.
    pub fn blend(&self, other: &Self, w: f64) -> Self {
        let mut out = *self;
        for (o, &b) in out.as_mut_slice().iter_mut().zip(other.as_slice()) {
            *o = w * *o + (1.0 - w) * b;
        }
        out
    }
}
