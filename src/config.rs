//! Pipeline tuning parameters
//!
//! Defaults reproduce the reference thresholds; a JSON file can override any
//! subset of them.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PipelineError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaitConfig {
    /// Frame rate used to turn frame gaps into seconds
    pub sample_rate_hz: f64,
    pub min_samples: usize,
    pub smoothing_window: usize,
    /// Minimum samples between accepted peaks
    pub min_peak_gap: usize,
    /// Peaks must exceed this fraction of the mean pressure
    pub peak_threshold_ratio: f64,
    pub min_step_length_m: f64,
    pub min_step_duration_s: f64,
    /// Smoothing span for the per-side contact signals
    pub contact_smoothing_s: f64,
    pub contact_enter_quantile: f64,
    pub contact_exit_quantile: f64,
    pub stance_range_s: (f64, f64),
    pub cycle_range_s: (f64, f64),
}

impl Default for GaitConfig {
    fn default() -> Self {
        GaitConfig {
            sample_rate_hz: 30.0,
            min_samples: 10,
            smoothing_window: 5,
            min_peak_gap: 10,
            peak_threshold_ratio: 0.5,
            min_step_length_m: 0.10,
            min_step_duration_s: 0.30,
            contact_smoothing_s: 0.2,
            contact_enter_quantile: 0.30,
            contact_exit_quantile: 0.20,
            stance_range_s: (0.3, 1.5),
            cycle_range_s: (0.4, 2.5),
        }
    }
}

impl GaitConfig {
    /// Seconds per frame, 0 when the rate is unusable
    pub fn sample_period_s(&self) -> f64 {
        if self.sample_rate_hz > 0.0 && self.sample_rate_hz.is_finite() {
            1.0 / self.sample_rate_hz
        } else {
            0.0
        }
    }
}

/// A sway ellipse and path need at least three COP points
const MIN_BALANCE_POINTS: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    pub min_points: usize,
    /// Chi-square critical value, 2 degrees of freedom, 95 %
    pub chi2_95: f64,
    /// Cross products smaller than this (m^2) carry no turn direction
    pub cross_tolerance: f64,
    /// (normalised path length m, penalty), checked in order
    pub path_penalties: Vec<(f64, f64)>,
    /// (normalised sway area m^2, penalty), checked in order
    pub area_penalties: Vec<(f64, f64)>,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        BalanceConfig {
            min_points: 3,
            chi2_95: 5.991,
            cross_tolerance: 1e-9,
            path_penalties: vec![(0.5, 20.0), (0.35, 10.0), (0.25, 5.0)],
            area_penalties: vec![(0.0005, 15.0), (0.0003, 8.0), (0.0001, 3.0)],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub gait: GaitConfig,
    pub balance: BalanceConfig,
    /// Worker threads for batch analysis, 0 = one per available core
    pub batch_workers: usize,
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let config: PipelineConfig =
            serde_json::from_str(json).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Ok(Self::from_json(&json)?)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let gait = &self.gait;
        if !(gait.sample_rate_hz.is_finite() && gait.sample_rate_hz > 0.0) {
            return Err(PipelineError::Config(format!(
                "sample_rate_hz must be positive, got {}",
                gait.sample_rate_hz
            )));
        }
        if gait.smoothing_window == 0 {
            return Err(PipelineError::Config("smoothing_window must be at least 1".into()));
        }
        if gait.contact_exit_quantile > gait.contact_enter_quantile {
            return Err(PipelineError::Config(
                "contact_exit_quantile must not exceed contact_enter_quantile".into(),
            ));
        }
        if self.balance.min_points < MIN_BALANCE_POINTS {
            return Err(PipelineError::Config(format!(
                "balance.min_points must be at least {}",
                MIN_BALANCE_POINTS
            )));
        }
        Ok(())
    }
}
