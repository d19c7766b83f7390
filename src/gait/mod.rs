//! Step detection and gait metrics from a COP sample series
//!
//! Steps come from peaks of the smoothed total pressure; phase fractions and
//! the per-foot breakdown come from the left/right pressure halves.

pub mod phases;
pub mod steps;

pub use phases::{ContactEvents, GaitPhases, SideBreakdown, SideMetrics};
pub use steps::{build_steps, detect_peaks, StepRecord};

use crate::config::GaitConfig;
use crate::smoothing::centered_moving_average;
use crate::types::{GaitSample, Outcome};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaitMetrics {
    pub step_count: usize,
    pub mean_step_length_m: f64,
    pub step_length_std_m: f64,
    pub min_step_length_m: f64,
    pub max_step_length_m: f64,
    pub mean_step_duration_s: f64,
    pub cadence_steps_per_min: f64,
    pub mean_velocity_m_s: f64,
    /// Peaks found before step filtering
    pub detected_peaks: usize,
    pub phases: GaitPhases,
    pub sides: Option<SideBreakdown>,
    pub steps: Vec<StepRecord>,
}

/// Turns an ordered sample series into gait metrics
pub struct GaitEventDetector {
    config: GaitConfig,
}

impl GaitEventDetector {
    pub fn new(config: GaitConfig) -> Self {
        GaitEventDetector { config }
    }

    pub fn config(&self) -> &GaitConfig {
        &self.config
    }

    pub fn analyze(&self, samples: &[GaitSample]) -> Outcome<GaitMetrics> {
        let config = &self.config;
        if samples.len() < config.min_samples {
            return Outcome::insufficient(format!(
                "{} gait samples, need at least {}",
                samples.len(),
                config.min_samples
            ));
        }

        let pressures: Vec<f64> = samples.iter().map(|s| s.pressure).collect();
        let mean_pressure = pressures.iter().sum::<f64>() / pressures.len() as f64;
        let smoothed = centered_moving_average(&pressures, config.smoothing_window);

        let peaks = detect_peaks(
            &smoothed,
            mean_pressure * config.peak_threshold_ratio,
            config.min_peak_gap,
        );
        let steps = build_steps(samples, &peaks, config);
        log::debug!("{} pressure peaks, {} accepted steps", peaks.len(), steps.len());

        if steps.is_empty() {
            return Outcome::insufficient(format!(
                "no valid steps among {} pressure peaks",
                peaks.len()
            ));
        }

        let n = steps.len() as f64;
        let lengths: Vec<f64> = steps.iter().map(|s| s.length_m).collect();
        let mean_length = lengths.iter().sum::<f64>() / n;
        let variance = lengths.iter().map(|l| (l - mean_length).powi(2)).sum::<f64>() / n;
        let mean_duration = steps.iter().map(|s| s.duration_s).sum::<f64>() / n;
        let mean_velocity = steps.iter().map(|s| s.velocity_m_s).sum::<f64>() / n;

        let (phases, sides) = phases::analyze(samples, config);

        Outcome::ok(GaitMetrics {
            step_count: steps.len(),
            mean_step_length_m: mean_length,
            step_length_std_m: variance.sqrt(),
            min_step_length_m: lengths.iter().copied().fold(f64::INFINITY, f64::min),
            max_step_length_m: lengths.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean_step_duration_s: mean_duration,
            cadence_steps_per_min: 60.0 / mean_duration,
            mean_velocity_m_s: mean_velocity,
            detected_peaks: peaks.len(),
            phases,
            sides,
            steps,
        })
    }
}

impl Default for GaitEventDetector {
    fn default() -> Self {
        Self::new(GaitConfig::default())
    }
}
