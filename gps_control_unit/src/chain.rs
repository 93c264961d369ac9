//! Kinematic chain binding.
//!
//! A [`Chain`] is the ordered list of actuated joints from a root link to a
//! tip link, with the joint handles used to index efforts and samples.
//! Chains are built once during `init` and never change afterwards.

use heapless::Vec as FixedVec;
use tracing::{debug, info};

use gps_common::consts::MAX_JOINTS;
use gps_common::state::{ChainGroup, JointHandle};

use crate::error::ChainResolutionError;
use crate::topology::TopologyProvider;

/// Ordered, immutable joint sequence from a root link to a tip link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    root: String,
    tip: String,
    names: Vec<String>,
    handles: FixedVec<JointHandle, MAX_JOINTS>,
}

impl Chain {
    /// Root link name.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Tip link name.
    pub fn tip(&self) -> &str {
        &self.tip
    }

    /// Number of joints.
    #[inline]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Joint names in chain order.
    pub fn joint_names(&self) -> &[String] {
        &self.names
    }

    /// Joint handles in chain order.
    #[inline]
    pub fn handles(&self) -> &[JointHandle] {
        &self.handles
    }

    /// Check the chain against an enumerated joint-name list from config.
    ///
    /// An empty list means "not configured" and always passes.
    pub fn validate_names(
        &self,
        chain: &'static str,
        configured: &[String],
    ) -> Result<(), ChainResolutionError> {
        if configured.is_empty() {
            return Ok(());
        }
        if configured.len() != self.len() {
            return Err(ChainResolutionError::JointCountMismatch {
                chain,
                resolved: self.len(),
                configured: configured.len(),
            });
        }
        for (index, (resolved, expected)) in self.names.iter().zip(configured).enumerate() {
            if resolved != expected {
                return Err(ChainResolutionError::JointNameMismatch {
                    chain,
                    index,
                    resolved: resolved.clone(),
                    configured: expected.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Resolve the chain from `root` to `tip`.
///
/// Fails if the topology has no path, if any joint on the path has no
/// state handle, or if the chain is empty or longer than [`MAX_JOINTS`].
/// Side-effect free; may be called for any number of (root, tip) pairs.
pub fn bind(
    topology: &dyn TopologyProvider,
    root: &str,
    tip: &str,
) -> Result<Chain, ChainResolutionError> {
    let names = topology
        .chain_joints(root, tip)
        .ok_or_else(|| ChainResolutionError::NoPath {
            root: root.to_string(),
            tip: tip.to_string(),
        })?;

    if names.is_empty() {
        return Err(ChainResolutionError::Empty {
            root: root.to_string(),
            tip: tip.to_string(),
        });
    }
    if names.len() > MAX_JOINTS {
        return Err(ChainResolutionError::TooManyJoints {
            root: root.to_string(),
            tip: tip.to_string(),
            len: names.len(),
            max: MAX_JOINTS,
        });
    }

    let mut handles = FixedVec::new();
    for name in &names {
        let handle = topology
            .joint_handle(name)
            .ok_or_else(|| ChainResolutionError::UnknownJoint(name.clone()))?;
        debug!("chain {root}→{tip}: joint '{name}' → {handle:?}");
        // Length checked above.
        let _ = handles.push(handle);
    }

    info!("Bound chain {root}→{tip} with {} joints", names.len());

    Ok(Chain {
        root: root.to_string(),
        tip: tip.to_string(),
        names,
        handles,
    })
}

/// The two chains driven by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSet {
    chains: [Chain; 2],
}

impl ChainSet {
    /// Bundle the active and passive chains.
    pub fn new(active: Chain, passive: Chain) -> Self {
        Self {
            chains: [active, passive],
        }
    }

    /// Bundle two chains that share no joint.
    ///
    /// Every joint must receive exactly one effort command per tick, so a
    /// joint on both chains is rejected.
    pub fn try_new(active: Chain, passive: Chain) -> Result<Self, ChainResolutionError> {
        for (name, handle) in active.names.iter().zip(active.handles()) {
            if passive.handles().contains(handle) {
                return Err(ChainResolutionError::OverlappingChains {
                    joint: name.clone(),
                });
            }
        }
        Ok(Self::new(active, passive))
    }

    /// Chain for a group.
    #[inline]
    pub fn get(&self, group: ChainGroup) -> &Chain {
        &self.chains[group.index()]
    }

    /// Total joint count over both chains.
    pub fn joint_count(&self) -> usize {
        self.chains.iter().map(Chain::len).sum()
    }
}
