pub mod linalg;

pub use linalg::*;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// One pressure-sensor snapshot, rows x columns in sensor-grid order
#[derive(Clone, Debug, PartialEq)]
pub struct PressureFrame {
    pub index: usize,
    pub values: Array2<f64>,
}

impl PressureFrame {
    pub fn new(index: usize, values: Array2<f64>) -> Self {
        PressureFrame { index, values }
    }

    /// All-zero frame of the given grid size
    pub fn zeros(index: usize, grid_height: usize, grid_width: usize) -> Self {
        PressureFrame {
            index,
            values: Array2::zeros((grid_height, grid_width)),
        }
    }

    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn cols(&self) -> usize {
        self.values.ncols()
    }

    pub fn total(&self) -> f64 {
        self.values.sum()
    }
}

/// Center of pressure of a single frame, in physical coordinates
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CopPoint {
    pub frame_index: usize,
    pub x: f64, // m, along grid columns
    pub y: f64, // m, along grid rows
    pub total_pressure_weight: f64,
    pub active_cell_count: usize,
    pub left_weight: f64,  // above-threshold weight in the left column half
    pub right_weight: f64, // above-threshold weight in the right column half
}

impl CopPoint {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Input sample for gait event detection
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaitSample {
    pub frame_index: usize,
    pub timestamp: f64, // s
    pub x: f64,
    pub y: f64,
    pub pressure: f64,
    pub left_pressure: f64,
    pub right_pressure: f64,
}

impl GaitSample {
    /// Build a sample from a COP point; the timestamp comes from the frame
    /// index and the sampling rate.
    pub fn from_cop(cop: &CopPoint, sample_rate_hz: f64) -> Self {
        let timestamp = if sample_rate_hz > 0.0 {
            cop.frame_index as f64 / sample_rate_hz
        } else {
            0.0
        };
        GaitSample {
            frame_index: cop.frame_index,
            timestamp,
            x: cop.x,
            y: cop.y,
            pressure: cop.total_pressure_weight,
            left_pressure: cop.left_weight,
            right_pressure: cop.right_weight,
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Tagged analysis result, always inspectable by the caller
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Ok { value: T },
    Degraded { value: T, reason: String },
    InsufficientData { reason: String },
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Outcome::Ok { value }
    }

    pub fn insufficient(reason: impl Into<String>) -> Self {
        Outcome::InsufficientData {
            reason: reason.into(),
        }
    }

    /// Downgrade an `Ok` result; other variants pass through unchanged
    pub fn degrade(self, reason: impl Into<String>) -> Self {
        match self {
            Outcome::Ok { value } => Outcome::Degraded {
                value,
                reason: reason.into(),
            },
            other => other,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Ok { value } | Outcome::Degraded { value, .. } => Some(value),
            Outcome::InsufficientData { .. } => None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self, Outcome::InsufficientData { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degrade_only_touches_ok() {
        let ok: Outcome<u32> = Outcome::ok(3);
        let degraded = ok.degrade("fallback hardware");
        assert_eq!(degraded.value(), Some(&3));
        assert!(matches!(degraded, Outcome::Degraded { .. }));

        let missing: Outcome<u32> = Outcome::insufficient("too short");
        assert!(missing.degrade("fallback hardware").is_insufficient());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(Outcome::<u32>::insufficient("no steps")).unwrap();
        assert_eq!(json["status"], "insufficient_data");
        assert_eq!(json["reason"], "no steps");
    }

    #[test]
    fn test_sample_timestamp_from_frame_index() {
        let cop = CopPoint {
            frame_index: 60,
            x: 0.1,
            y: 0.2,
            total_pressure_weight: 300.0,
            active_cell_count: 4,
            left_weight: 300.0,
            right_weight: 0.0,
        };
        let sample = GaitSample::from_cop(&cop, 30.0);
        assert!((sample.timestamp - 2.0).abs() < 1e-12);
        assert_eq!(sample.pressure, 300.0);
    }

    #[test]
    fn test_cross_z_sign() {
        let east = Vec2::new(1.0, 0.0);
        let north = Vec2::new(0.0, 1.0);
        assert!(cross_z(&east, &north) > 0.0);
        assert!(cross_z(&north, &east) < 0.0);
    }
}
