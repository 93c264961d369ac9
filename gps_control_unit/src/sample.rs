//! Fused joint-state sample and its single-writer aggregator.
//!
//! Sensor slots write through a per-slot transaction: [`SampleAggregator::begin_slot`]
//! hands out a scratch copy of the current sample, [`SampleAggregator::commit_slot`]
//! publishes it. A slot that faults simply never commits, so the current
//! sample keeps its last valid values (timestamp included).
//!
//! All storage is fixed-size; nothing here allocates after construction.

use std::time::Duration;

use gps_common::consts::MAX_JOINTS;
use gps_common::state::ChainGroup;

use crate::chain::ChainSet;

/// Joint positions and velocities of one chain, indexed like the chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainSample {
    positions: [f64; MAX_JOINTS],
    velocities: [f64; MAX_JOINTS],
    len: u8,
}

impl ChainSample {
    /// Zeroed sample for a chain of `len` joints (capped at [`MAX_JOINTS`]).
    pub fn zeroed(len: usize) -> Self {
        Self {
            positions: [0.0; MAX_JOINTS],
            velocities: [0.0; MAX_JOINTS],
            len: len.min(MAX_JOINTS) as u8,
        }
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
    pub fn positions(&self) -> &[f64] {
        &self.positions[..self.len()]
    }

    #[inline]
    pub fn velocities(&self) -> &[f64] {
        &self.velocities[..self.len()]
    }

    #[inline]
    pub fn positions_mut(&mut self) -> &mut [f64] {
        let n = self.len();
        &mut self.positions[..n]
    }

    #[inline]
    pub fn velocities_mut(&mut self) -> &mut [f64] {
        let n = self.len();
        &mut self.velocities[..n]
    }
}

/// Latest observed robot state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    time: Duration,
    chains: [ChainSample; 2],
    valid: bool,
}

impl Sample {
    /// Zeroed, not-yet-valid sample shaped after `chains`.
    pub fn for_chains(chains: &ChainSet) -> Self {
        Self {
            time: Duration::ZERO,
            chains: [
                ChainSample::zeroed(chains.get(ChainGroup::Active).len()),
                ChainSample::zeroed(chains.get(ChainGroup::Passive).len()),
            ],
            valid: false,
        }
    }

    /// Time of the last committed sensor update.
    #[inline]
    pub fn time(&self) -> Duration {
        self.time
    }

    /// True once at least one sensor slot has committed this session.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[inline]
    pub fn chain(&self, group: ChainGroup) -> &ChainSample {
        &self.chains[group.index()]
    }

    #[inline]
    pub fn chain_mut(&mut self, group: ChainGroup) -> &mut ChainSample {
        &mut self.chains[group.index()]
    }
}

/// Owner of the current sample.
#[derive(Debug, Clone)]
pub struct SampleAggregator {
    current: Sample,
    scratch: Sample,
}

impl SampleAggregator {
    pub fn new(chains: &ChainSet) -> Self {
        let s = Sample::for_chains(chains);
        Self {
            current: s,
            scratch: s,
        }
    }

    /// Latest fused sample. Valid until the next slot commit.
    #[inline]
    pub fn current(&self) -> &Sample {
        &self.current
    }

    /// Invalidate the sample and move its timestamp to `time`.
    ///
    /// Joint values are kept; the timestamp never moves backwards.
    pub fn reset(&mut self, time: Duration) {
        self.current.valid = false;
        self.current.time = self.current.time.max(time);
        self.scratch = self.current;
    }

    /// Open a slot transaction on a copy of the current sample.
    #[inline]
    pub fn begin_slot(&mut self) -> &mut Sample {
        self.scratch = self.current;
        &mut self.scratch
    }

    /// Publish the scratch sample stamped with `time`.
    #[inline]
    pub fn commit_slot(&mut self, time: Duration) {
        self.scratch.time = self.current.time.max(time);
        self.scratch.valid = true;
        self.current = self.scratch;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain;
    use crate::topology::TopologyProvider;
    use gps_common::state::JointHandle;

    struct Two;

    impl TopologyProvider for Two {
        fn chain_joints(&self, _root: &str, tip: &str) -> Option<Vec<String>> {
            match tip {
                "a" => Some(vec!["a1".to_string(), "a2".to_string()]),
                "b" => Some(vec!["b1".to_string()]),
                _ => None,
            }
        }
        fn joint_handle(&self, name: &str) -> Option<JointHandle> {
            match name {
                "a1" => Some(JointHandle(0)),
                "a2" => Some(JointHandle(1)),
                "b1" => Some(JointHandle(2)),
                _ => None,
            }
        }
    }

    fn aggregator() -> SampleAggregator {
        let chains = ChainSet::new(
            chain::bind(&Two, "r", "a").unwrap(),
            chain::bind(&Two, "r", "b").unwrap(),
        );
        SampleAggregator::new(&chains)
    }

    #[test]
    fn sample_shaped_after_chains() {
        let agg = aggregator();
        assert_eq!(agg.current().chain(ChainGroup::Active).len(), 2);
        assert_eq!(agg.current().chain(ChainGroup::Passive).len(), 1);
        assert!(!agg.current().is_valid());
    }

    #[test]
    fn commit_publishes_scratch() {
        let mut agg = aggregator();
        let s = agg.begin_slot();
        s.chain_mut(ChainGroup::Active).positions_mut()[1] = 0.7;
        agg.commit_slot(Duration::from_millis(3));
        assert!(agg.current().is_valid());
        assert_eq!(agg.current().chain(ChainGroup::Active).positions(), &[0.0, 0.7]);
        assert_eq!(agg.current().time(), Duration::from_millis(3));
    }

    #[test]
    fn uncommitted_slot_is_discarded() {
        let mut agg = aggregator();
        agg.begin_slot();
        agg.commit_slot(Duration::from_millis(1));
        let before = *agg.current();

        let s = agg.begin_slot();
        s.chain_mut(ChainGroup::Passive).positions_mut()[0] = 9.0;
        // no commit
        assert_eq!(*agg.current(), before);

        // Next slot starts from current, not from the abandoned scratch.
        let s = agg.begin_slot();
        assert_eq!(s.chain(ChainGroup::Passive).positions()[0], 0.0);
    }

    #[test]
    fn timestamp_never_decreases() {
        let mut agg = aggregator();
        agg.begin_slot();
        agg.commit_slot(Duration::from_millis(10));
        agg.begin_slot();
        agg.commit_slot(Duration::from_millis(4));
        assert_eq!(agg.current().time(), Duration::from_millis(10));
        agg.reset(Duration::from_millis(2));
        assert_eq!(agg.current().time(), Duration::from_millis(10));
        assert!(!agg.current().is_valid());
    }
}
