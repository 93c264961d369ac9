//! Simulated robot: topology provider + actuator interface in one.
//!
//! Loaded from a TOML robot description (links connected by named joints).
//! Each actuated joint is a simple second-order plant:
//!
//! ```text
//! accel = (effort − damping·velocity) / inertia
//! velocity += accel·dt
//! position += velocity·dt
//! ```
//!
//! Used by the binary when no hardware is present and by the tests, which
//! additionally rely on per-joint write counters and position injection.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use gps_common::config::{ConfigError, ConfigLoader};
use gps_common::state::JointHandle;

use crate::cycle::Plant;
use crate::topology::{ActuatorInterface, TopologyProvider};

// ─── Description ────────────────────────────────────────────────────

/// Robot description as loaded from TOML.
///
/// ```toml
/// name = "superchick"
///
/// [[joints]]
/// name = "base_bladder_joint"
/// parent = "base_link"
/// child = "bladder_link"
/// inertia = 0.5
/// damping = 2.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotDescription {
    /// Robot name (diagnostics only).
    #[serde(default)]
    pub name: String,
    /// All joints, actuated and fixed.
    pub joints: Vec<JointDescription>,
}

/// One joint connecting a parent link to a child link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointDescription {
    pub name: String,
    pub parent: String,
    pub child: String,
    /// Fixed joints are traversed but never appear in a chain.
    #[serde(default)]
    pub fixed: bool,
    /// Initial joint position [rad or m].
    #[serde(default)]
    pub initial_position: f64,
    /// Effective inertia [kg·m² or kg] (> 0).
    #[serde(default = "default_inertia")]
    pub inertia: f64,
    /// Viscous damping [N·m·s/rad or N·s/m] (≥ 0).
    #[serde(default)]
    pub damping: f64,
}

fn default_inertia() -> f64 {
    1.0
}

impl RobotDescription {
    /// Validate the joint tree.
    ///
    /// Joint names must be unique, each link has at most one parent joint,
    /// inertia must be positive and damping non-negative.
    pub fn validate(&self) -> Result<(), String> {
        let mut names = HashMap::new();
        let mut children = HashMap::new();
        for (i, j) in self.joints.iter().enumerate() {
            if j.name.is_empty() {
                return Err(format!("joint {i} has an empty name"));
            }
            if names.insert(j.name.as_str(), i).is_some() {
                return Err(format!("duplicate joint name '{}'", j.name));
            }
            if children.insert(j.child.as_str(), i).is_some() {
                return Err(format!("link '{}' has more than one parent joint", j.child));
            }
            if j.parent == j.child {
                return Err(format!("joint '{}' connects link '{}' to itself", j.name, j.child));
            }
            if !(j.inertia > 0.0) || !j.inertia.is_finite() {
                return Err(format!("joint '{}' inertia {} must be > 0", j.name, j.inertia));
            }
            if !(j.damping >= 0.0) || !j.damping.is_finite() {
                return Err(format!("joint '{}' damping {} must be >= 0", j.name, j.damping));
            }
        }
        if self.joints.len() > u16::MAX as usize {
            return Err(format!("too many joints: {}", self.joints.len()));
        }
        Ok(())
    }
}

// ─── Simulated robot ────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct SimJoint {
    desc: JointDescription,
    position: f64,
    velocity: f64,
    commanded_effort: f64,
    write_count: u64,
}

/// In-memory robot implementing [`TopologyProvider`] and [`ActuatorInterface`].
#[derive(Debug, Clone)]
pub struct SimRobot {
    name: String,
    joints: Vec<SimJoint>,
    by_name: HashMap<String, usize>,
    /// child link → index of the joint whose child it is.
    parent_joint: HashMap<String, usize>,
    time: Duration,
}

impl SimRobot {
    /// Build from a validated description.
    pub fn from_description(desc: RobotDescription) -> Result<Self, ConfigError> {
        desc.validate().map_err(ConfigError::ValidationError)?;

        let mut by_name = HashMap::new();
        let mut parent_joint = HashMap::new();
        let mut joints = Vec::with_capacity(desc.joints.len());
        for (i, j) in desc.joints.into_iter().enumerate() {
            by_name.insert(j.name.clone(), i);
            parent_joint.insert(j.child.clone(), i);
            joints.push(SimJoint {
                position: j.initial_position,
                velocity: 0.0,
                commanded_effort: 0.0,
                write_count: 0,
                desc: j,
            });
        }

        info!(
            "Simulated robot '{}' with {} joints ({} actuated)",
            desc.name,
            joints.len(),
            joints.iter().filter(|j| !j.desc.fixed).count()
        );

        Ok(Self {
            name: desc.name,
            joints,
            by_name,
            parent_joint,
            time: Duration::ZERO,
        })
    }

    /// Load a robot description TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let desc = RobotDescription::load(path)?;
        Self::from_description(desc)
    }

    /// Parse a robot description from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let desc: RobotDescription =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Self::from_description(desc)
    }

    /// Robot name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Integrate the plant for `dt` with the currently commanded efforts.
    pub fn step(&mut self, dt: Duration) {
        let h = dt.as_secs_f64();
        for j in self.joints.iter_mut().filter(|j| !j.desc.fixed) {
            let accel = (j.commanded_effort - j.desc.damping * j.velocity) / j.desc.inertia;
            j.velocity += accel * h;
            j.position += j.velocity * h;
        }
        self.time += dt;
    }

    /// Advance the clock without integrating the plant.
    pub fn advance_time(&mut self, dt: Duration) {
        self.time += dt;
    }

    /// Last commanded effort on a joint.
    pub fn commanded_effort(&self, joint: JointHandle) -> Option<f64> {
        self.joints.get(joint.index()).map(|j| j.commanded_effort)
    }

    /// Number of effort writes a joint has received.
    pub fn write_count(&self, joint: JointHandle) -> u64 {
        self.joints.get(joint.index()).map_or(0, |j| j.write_count)
    }

    /// Overwrite a joint's measured position (fault injection, homing).
    pub fn set_position(&mut self, joint: JointHandle, position: f64) {
        if let Some(j) = self.joints.get_mut(joint.index()) {
            j.position = position;
        }
    }

    /// Current simulated velocity of a joint.
    pub fn velocity(&self, joint: JointHandle) -> Option<f64> {
        self.joints.get(joint.index()).map(|j| j.velocity)
    }
}

impl TopologyProvider for SimRobot {
    fn chain_joints(&self, root: &str, tip: &str) -> Option<Vec<String>> {
        let mut path = Vec::new();
        let mut link = tip;
        while link != root {
            let idx = *self.parent_joint.get(link)?;
            path.push(idx);
            link = &self.joints[idx].desc.parent;
            // A valid tree has at most one parent per link, so the walk
            // terminates after at most `joints.len()` steps.
            if path.len() > self.joints.len() {
                return None;
            }
        }
        debug!("path {root}→{tip}: {} joints incl. fixed", path.len());
        Some(
            path.iter()
                .rev()
                .filter(|&&i| !self.joints[i].desc.fixed)
                .map(|&i| self.joints[i].desc.name.clone())
                .collect(),
        )
    }

    fn joint_handle(&self, name: &str) -> Option<JointHandle> {
        let idx = *self.by_name.get(name)?;
        if self.joints[idx].desc.fixed {
            return None;
        }
        Some(JointHandle(idx as u16))
    }
}

impl ActuatorInterface for SimRobot {
    #[inline]
    fn time(&self) -> Duration {
        self.time
    }

    #[inline]
    fn joint_position(&self, joint: JointHandle) -> Option<f64> {
        self.joints.get(joint.index()).map(|j| j.position)
    }

    #[inline]
    fn set_commanded_effort(&mut self, joint: JointHandle, effort: f64) {
        if let Some(j) = self.joints.get_mut(joint.index()) {
            j.commanded_effort = effort;
            j.write_count += 1;
        }
    }
}

impl Plant for SimRobot {
    fn advance(&mut self, dt: Duration) {
        self.step(dt);
    }
}
