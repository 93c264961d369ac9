//! Host lifecycle hooks and the adapter driving [`ControlLoop`] from them.
//!
//! A controller-manager style host calls four hooks and never sees an
//! error type: `init` reports success as a bool, the others log.

use std::time::Duration;

use tracing::error;

use gps_common::config::ConfigSource;
use gps_common::consts::DEFAULT_NAMESPACE;

use crate::control_loop::{ControlLoop, TickOutcome};
use crate::topology::{ActuatorInterface, TopologyProvider};

/// Hooks a realtime host invokes on a controller plugin.
pub trait HostController {
    /// Configure. `false` means the plugin must not be started.
    fn init(&mut self, source: &dyn ConfigSource) -> bool;

    /// Session start, called between ticks.
    fn starting(&mut self);

    /// One realtime tick at controller time `time`.
    fn update(&mut self, time: Duration);

    /// Session end, called between ticks.
    fn stopping(&mut self);
}

/// [`HostController`] over a [`ControlLoop`] and the robot it drives.
pub struct PluginAdapter<R> {
    robot: R,
    control: ControlLoop,
    namespace: String,
}

impl<R> PluginAdapter<R>
where
    R: TopologyProvider + ActuatorInterface,
{
    /// Adapter reading parameters under [`DEFAULT_NAMESPACE`].
    pub fn new(robot: R) -> Self {
        Self::with_namespace(robot, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(robot: R, namespace: &str) -> Self {
        Self {
            robot,
            control: ControlLoop::new(),
            namespace: namespace.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn robot(&self) -> &R {
        &self.robot
    }

    pub fn robot_mut(&mut self) -> &mut R {
        &mut self.robot
    }

    pub fn control(&self) -> &ControlLoop {
        &self.control
    }

    /// Attach trial controllers, set targets, add sensors. Call between ticks.
    pub fn control_mut(&mut self) -> &mut ControlLoop {
        &mut self.control
    }

    /// [`HostController::update`] with the tick outcome returned.
    #[inline]
    pub fn tick(&mut self, time: Duration) -> TickOutcome {
        self.control.update(&mut self.robot, time)
    }

    pub fn into_robot(self) -> R {
        self.robot
    }
}

impl<R> HostController for PluginAdapter<R>
where
    R: TopologyProvider + ActuatorInterface,
{
    fn init(&mut self, source: &dyn ConfigSource) -> bool {
        match self.control.init(source, &self.namespace, &self.robot) {
            Ok(()) => true,
            Err(e) => {
                error!("plugin init under '{}' failed: {e}", self.namespace);
                false
            }
        }
    }

    fn starting(&mut self) {
        if let Err(e) = self.control.starting(&self.robot) {
            error!("plugin starting rejected: {e}");
        }
    }

    fn update(&mut self, time: Duration) {
        self.tick(time);
    }

    fn stopping(&mut self) {
        if let Err(e) = self.control.stopping() {
            error!("plugin stopping rejected: {e}");
        }
    }
}
