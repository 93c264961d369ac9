//! Plugin configuration, read once from a [`ConfigSource`] during `init`.
//!
//! All keys live under a namespace (default `/GPSSuperchickPlugin`):
//!
//! | key | required | default |
//! |-----|----------|---------|
//! | `base_group` | yes | root link of both chains |
//! | `head_name` | yes | tip of the active chain |
//! | `right_name` | yes | tip of the passive chain |
//! | `controller_step_length` | no | 50 |
//! | `tick_period_us` | no | 1000 |
//! | `active_arm_joint_name_N`, `passive_arm_joint_name_N` | no | none |
//! | `base_controller/{kp,ki,kd,tf,tt,out_max,target_N}` | no | zero gains, unlimited |
//! | `right_controller/{...}` | no | same |
//! | `sensors/velocity_cutoff_hz` | no | 30.0 |
//! | `reset_on_trial_change` | no | false |
//!
//! Enumerated keys (`…_N`) are read from `N = 1` up to the first missing one.

use std::time::Duration;

use tracing::{error, info};

use gps_common::config::{ConfigSource, join_key};
use gps_common::consts::{
    CONTROLLER_STEP_LENGTH_DEFAULT, CONTROLLER_STEP_LENGTH_MAX, TICK_PERIOD_US,
    TICK_PERIOD_US_MAX, TICK_PERIOD_US_MIN, VELOCITY_CUTOFF_HZ_DEFAULT,
};

use crate::control::pid::PidGains;
use crate::error::ConfigurationError;

/// Gains and initial target of one position controller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupConfig {
    pub gains: PidGains,
    /// Empty = all-zero target.
    pub target: Vec<f64>,
}

/// Validated plugin configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginConfig {
    pub base_group: String,
    pub head_name: String,
    pub right_name: String,
    pub controller_step_length: u32,
    pub tick_period_us: u64,
    pub active_joint_names: Vec<String>,
    pub passive_joint_names: Vec<String>,
    pub base_controller: GroupConfig,
    pub right_controller: GroupConfig,
    pub velocity_cutoff_hz: f64,
    pub reset_on_trial_change: bool,
}

impl PluginConfig {
    /// Config with the three required names and defaults elsewhere.
    pub fn new(base_group: &str, head_name: &str, right_name: &str) -> Self {
        Self {
            base_group: base_group.to_string(),
            head_name: head_name.to_string(),
            right_name: right_name.to_string(),
            controller_step_length: CONTROLLER_STEP_LENGTH_DEFAULT,
            tick_period_us: TICK_PERIOD_US,
            active_joint_names: Vec::new(),
            passive_joint_names: Vec::new(),
            base_controller: GroupConfig::default(),
            right_controller: GroupConfig::default(),
            velocity_cutoff_hz: VELOCITY_CUTOFF_HZ_DEFAULT,
            reset_on_trial_change: false,
        }
    }

    /// Read and validate everything under `namespace`.
    pub fn from_source(
        source: &dyn ConfigSource,
        namespace: &str,
    ) -> Result<Self, ConfigurationError> {
        let key = |k: &str| join_key(namespace, k);

        let required = |k: &str| -> Result<String, ConfigurationError> {
            let full = key(k);
            match source.get_str(&full)? {
                Some(v) if !v.is_empty() => Ok(v),
                Some(_) => Err(ConfigurationError::InvalidValue {
                    key: full,
                    message: "must not be empty".to_string(),
                }),
                None => {
                    error!("Required parameter '{full}' not found");
                    Err(ConfigurationError::MissingKey(full))
                }
            }
        };

        let mut cfg = Self::new(
            &required("base_group")?,
            &required("head_name")?,
            &required("right_name")?,
        );

        if let Some(v) = source.get_u64(&key("controller_step_length"))? {
            cfg.controller_step_length =
                u32::try_from(v).map_err(|_| ConfigurationError::InvalidValue {
                    key: key("controller_step_length"),
                    message: format!("{v} does not fit in u32"),
                })?;
        }
        if let Some(v) = source.get_u64(&key("tick_period_us"))? {
            cfg.tick_period_us = v;
        }
        if let Some(v) = source.get_f64(&key("sensors/velocity_cutoff_hz"))? {
            cfg.velocity_cutoff_hz = v;
        }
        if let Some(v) = source.get_bool(&key("reset_on_trial_change"))? {
            cfg.reset_on_trial_change = v;
        }

        cfg.active_joint_names = enumerate_str(source, &key("active_arm_joint_name"))?;
        cfg.passive_joint_names = enumerate_str(source, &key("passive_arm_joint_name"))?;
        cfg.base_controller = read_group(source, &key("base_controller"))?;
        cfg.right_controller = read_group(source, &key("right_controller"))?;

        cfg.validate()
            .map_err(|message| ConfigurationError::InvalidValue {
                key: namespace.to_string(),
                message,
            })?;

        info!(
            "Config OK: base_group='{}', head='{}', right='{}', step_length={}, tick={}µs",
            cfg.base_group,
            cfg.head_name,
            cfg.right_name,
            cfg.controller_step_length,
            cfg.tick_period_us
        );
        Ok(cfg)
    }

    /// Range checks.
    pub fn validate(&self) -> Result<(), String> {
        if self.controller_step_length == 0
            || self.controller_step_length > CONTROLLER_STEP_LENGTH_MAX
        {
            return Err(format!(
                "controller_step_length {} out of range [1, {CONTROLLER_STEP_LENGTH_MAX}]",
                self.controller_step_length
            ));
        }
        if !(TICK_PERIOD_US_MIN..=TICK_PERIOD_US_MAX).contains(&self.tick_period_us) {
            return Err(format!(
                "tick_period_us {} out of range [{TICK_PERIOD_US_MIN}, {TICK_PERIOD_US_MAX}]",
                self.tick_period_us
            ));
        }
        if !self.velocity_cutoff_hz.is_finite() || self.velocity_cutoff_hz < 0.0 {
            return Err(format!(
                "velocity_cutoff_hz {} must be finite and >= 0",
                self.velocity_cutoff_hz
            ));
        }
        for (name, group) in [
            ("base_controller", &self.base_controller),
            ("right_controller", &self.right_controller),
        ] {
            group.gains.validate().map_err(|e| format!("{name}: {e}"))?;
            if let Some(i) = group.target.iter().position(|v| !v.is_finite()) {
                return Err(format!("{name}: target_{} is not finite", i + 1));
            }
        }
        Ok(())
    }

    /// Tick period.
    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(self.tick_period_us)
    }

    /// Nominal time between control steps.
    pub fn control_period(&self) -> Duration {
        self.tick_period() * self.controller_step_length
    }
}

fn enumerate_str(
    source: &dyn ConfigSource,
    prefix: &str,
) -> Result<Vec<String>, ConfigurationError> {
    let mut out = Vec::new();
    while let Some(v) = source.get_str(&format!("{prefix}_{}", out.len() + 1))? {
        out.push(v);
    }
    Ok(out)
}

fn enumerate_f64(source: &dyn ConfigSource, prefix: &str) -> Result<Vec<f64>, ConfigurationError> {
    let mut out = Vec::new();
    while let Some(v) = source.get_f64(&format!("{prefix}_{}", out.len() + 1))? {
        out.push(v);
    }
    Ok(out)
}

fn read_group(source: &dyn ConfigSource, prefix: &str) -> Result<GroupConfig, ConfigurationError> {
    let mut gains = PidGains::default();
    for (name, slot) in [
        ("kp", &mut gains.kp),
        ("ki", &mut gains.ki),
        ("kd", &mut gains.kd),
        ("tf", &mut gains.tf),
        ("tt", &mut gains.tt),
        ("out_max", &mut gains.out_max),
    ] {
        if let Some(v) = source.get_f64(&join_key(prefix, name))? {
            *slot = v;
        }
    }
    let target = enumerate_f64(source, &join_key(prefix, "target"))?;
    Ok(GroupConfig { gains, target })
}
