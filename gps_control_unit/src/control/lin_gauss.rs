//! Time-varying linear-Gaussian trial controller.
//!
//! ```text
//! u_t = K_t · x_t + k_t + ε_t
//! x_t = [q; q̇] of the active chain
//! ```
//!
//! `t` advances once per control step. The noise `ε_t` comes from a table
//! sampled offline and shipped with the parameters, so the tick only does
//! one `gemv` into a preallocated action vector. At `t == T` the controller
//! reports finished.
//!
//! # Parameter file
//!
//! ```toml
//! state_dim = 4
//! action_dim = 2
//! blend_weight = 0.5   # omit for override
//!
//! [[steps]]
//! gain = [ ... ]       # action_dim × state_dim, row-major
//! offset = [ ... ]     # action_dim
//! noise = [ ... ]      # action_dim, optional
//! ```

use std::path::Path;
use std::time::Duration;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::info;

use gps_common::config::{ConfigError, ConfigLoader};
use gps_common::consts::MAX_JOINTS;
use gps_common::fault::ControllerFault;
use gps_common::state::ChainGroup;

use crate::control::effort::JointEfforts;
use crate::control::trial::{OutputMode, TrialController, TrialOutput};
use crate::sample::Sample;

// ─── Parameters ─────────────────────────────────────────────────────

/// One time step of the policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearGaussianStep {
    /// `K_t`, row-major `action_dim × state_dim`.
    pub gain: Vec<f64>,
    /// `k_t`.
    pub offset: Vec<f64>,
    /// `ε_t`; zero when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise: Option<Vec<f64>>,
}

/// Serialized policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearGaussianParams {
    pub state_dim: usize,
    pub action_dim: usize,
    /// Blend weight of the policy output; `None` overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blend_weight: Option<f64>,
    pub steps: Vec<LinearGaussianStep>,
}

impl LinearGaussianParams {
    /// Check dimensions of every step and finiteness of every entry.
    pub fn validate(&self) -> Result<(), String> {
        if self.action_dim == 0 || self.action_dim > MAX_JOINTS {
            return Err(format!(
                "action_dim {} out of range [1, {MAX_JOINTS}]",
                self.action_dim
            ));
        }
        if self.state_dim != 2 * self.action_dim {
            return Err(format!(
                "state_dim {} must be 2 × action_dim ({})",
                self.state_dim,
                2 * self.action_dim
            ));
        }
        if self.steps.is_empty() {
            return Err("policy has no steps".to_string());
        }
        if let Some(w) = self.blend_weight {
            if !OutputMode::Blend(w).is_valid() {
                return Err(format!("blend_weight {w} must be in [0, 1]"));
            }
        }
        let gain_len = self.action_dim * self.state_dim;
        for (t, step) in self.steps.iter().enumerate() {
            if step.gain.len() != gain_len {
                return Err(format!(
                    "step {t}: gain has {} entries, expected {gain_len}",
                    step.gain.len()
                ));
            }
            if step.offset.len() != self.action_dim {
                return Err(format!(
                    "step {t}: offset has {} entries, expected {}",
                    step.offset.len(),
                    self.action_dim
                ));
            }
            let noise = step.noise.as_deref().unwrap_or(&[]);
            if step.noise.is_some() && noise.len() != self.action_dim {
                return Err(format!(
                    "step {t}: noise has {} entries, expected {}",
                    noise.len(),
                    self.action_dim
                ));
            }
            let mut all = step.gain.iter().chain(&step.offset).chain(noise);
            if all.any(|v| !v.is_finite()) {
                return Err(format!("step {t}: non-finite entry"));
            }
        }
        Ok(())
    }

    pub fn horizon(&self) -> usize {
        self.steps.len()
    }
}

// ─── Controller ─────────────────────────────────────────────────────

/// Linear-Gaussian policy over the active chain.
#[derive(Debug, Clone)]
pub struct LinearGaussianController {
    name: String,
    dx: usize,
    du: usize,
    /// `K_t`, one `du × dx` matrix per step.
    gains: Vec<DMatrix<f64>>,
    /// `k_t + ε_t`.
    biases: Vec<DVector<f64>>,
    x: DVector<f64>,
    u: DVector<f64>,
    mode: OutputMode,
    t: usize,
}

impl LinearGaussianController {
    pub fn new(name: impl Into<String>, params: LinearGaussianParams) -> Result<Self, ConfigError> {
        params.validate().map_err(ConfigError::ValidationError)?;
        let (dx, du) = (params.state_dim, params.action_dim);

        let gains = params
            .steps
            .iter()
            .map(|step| DMatrix::from_row_slice(du, dx, &step.gain))
            .collect::<Vec<_>>();
        let biases = params
            .steps
            .iter()
            .map(|step| {
                let mut bias = DVector::from_column_slice(&step.offset);
                if let Some(noise) = &step.noise {
                    bias += DVector::from_column_slice(noise);
                }
                bias
            })
            .collect::<Vec<_>>();

        let mode = params
            .blend_weight
            .map_or(OutputMode::Override, OutputMode::Blend);
        let name = name.into();
        info!(
            "Trial controller '{name}': {du} joints, horizon {}, {mode:?}",
            gains.len()
        );

        Ok(Self {
            name,
            dx,
            du,
            gains,
            biases,
            x: DVector::zeros(dx),
            u: DVector::zeros(du),
            mode,
            t: 0,
        })
    }

    /// Load a parameter file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let params = LinearGaussianParams::load(path)?;
        let name = path
            .file_stem()
            .map_or_else(|| "lin_gauss".to_string(), |s| s.to_string_lossy().into_owned());
        Self::new(name, params)
    }

    /// Constant proportional-derivative policy around `target`.
    ///
    /// ```text
    /// K = −pos_gain · [I, vel_gain_mult · I]
    /// k = −K · [target; 0]
    /// ```
    pub fn pd(
        target: &[f64],
        pos_gain: f64,
        vel_gain_mult: f64,
        horizon: usize,
    ) -> Result<Self, ConfigError> {
        let du = target.len();
        let dx = 2 * du;
        let eye = DMatrix::<f64>::identity(du, du);
        let mut gain = DMatrix::<f64>::zeros(du, dx);
        gain.view_mut((0, 0), (du, du)).copy_from(&(&eye * -pos_gain));
        gain.view_mut((0, du), (du, du))
            .copy_from(&(&eye * (-pos_gain * vel_gain_mult)));

        let mut x_target = DVector::<f64>::zeros(dx);
        x_target.rows_mut(0, du).copy_from_slice(target);
        let offset = -(&gain * &x_target);

        let step = LinearGaussianStep {
            // Column-major storage of the transpose is row-major `K`.
            gain: gain.transpose().as_slice().to_vec(),
            offset: offset.as_slice().to_vec(),
            noise: None,
        };
        Self::new(
            "pd",
            LinearGaussianParams {
                state_dim: dx,
                action_dim: du,
                blend_weight: None,
                steps: vec![step; horizon],
            },
        )
    }

    pub fn action_dim(&self) -> usize {
        self.du
    }

    pub fn horizon(&self) -> usize {
        self.gains.len()
    }

    /// Current time step.
    pub fn step(&self) -> usize {
        self.t
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }
}

impl TrialController for LinearGaussianController {
    fn name(&self) -> &str {
        &self.name
    }

    fn reset(&mut self, _time: Duration) {
        self.t = 0;
    }

    fn update(&mut self, _time: Duration, sample: &Sample) -> Result<TrialOutput, ControllerFault> {
        if self.t >= self.gains.len() {
            return Err(ControllerFault::HORIZON_EXCEEDED);
        }
        if !sample.is_valid() {
            return Err(ControllerFault::INVALID_SAMPLE);
        }
        let chain = sample.chain(ChainGroup::Active);
        if chain.len() != self.du {
            return Err(ControllerFault::SHAPE_MISMATCH);
        }

        self.x.rows_mut(0, self.du).copy_from_slice(chain.positions());
        self.x
            .rows_mut(self.du, self.dx - self.du)
            .copy_from_slice(chain.velocities());
        self.u.copy_from(&self.biases[self.t]);
        self.u.gemv(1.0, &self.gains[self.t], &self.x, 1.0);
        self.t += 1;

        let mut efforts = JointEfforts::zeros(self.du);
        efforts.as_mut_slice().copy_from_slice(self.u.as_slice());
        Ok(TrialOutput {
            efforts,
            mode: self.mode,
        })
    }

    fn is_finished(&self) -> bool {
        self.t >= self.gains.len()
    }
}
