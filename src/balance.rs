//! Postural sway metrics from a COP trajectory

use crate::config::BalanceConfig;
use crate::hardware::{HardwareCategory, HardwareSpec};
use crate::types::{cross_z, distance, CopPoint, Outcome, Vec2, M2_TO_CM2, M_TO_CM};
use serde::{Deserialize, Serialize};

/// Trajectories shorter than this report a neutral complexity
const MIN_COMPLEXITY_POINTS: usize = 5;
const NEUTRAL_COMPLEXITY: f64 = 1.0;
const COMPLEXITY_SCALE: f64 = 20.0;
const MAX_COMPLEXITY: f64 = 10.0;

/// Descriptive normal ranges for one hardware category
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRanges {
    pub cop_area: String,
    pub path_length: String,
    pub anteroposterior_range: String,
    pub mediolateral_range: String,
}

impl ReferenceRanges {
    pub fn for_category(category: HardwareCategory) -> Self {
        let (area, path, ap, ml) = match category {
            HardwareCategory::HipPad => ("<30 cm²", "10-25 cm", "1-4 cm", "1-3 cm"),
            HardwareCategory::FootPad => ("<50 cm²", "15-40 cm", "2-6 cm", "1-4 cm"),
            HardwareCategory::Generic => ("<80 cm²", "20-60 cm", "3-10 cm", "2-8 cm"),
        };
        let normal = |range: &str| format!("{} (normal)", range);
        ReferenceRanges {
            cop_area: normal(area),
            path_length: normal(path),
            anteroposterior_range: normal(ap),
            mediolateral_range: normal(ml),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BalanceMetrics {
    /// 95 % confidence ellipse area, cm²
    pub cop_area_cm2: f64,
    pub path_length_cm: f64,
    /// Direction reversals per sample, 0-10
    pub complexity: f64,
    pub anteroposterior_range_cm: f64,
    pub mediolateral_range_cm: f64,
    pub max_displacement_cm: f64,
    pub mean_velocity_cm_per_sample: f64,
    /// 0-100, higher is steadier
    pub stability_index: f64,
    pub center_x_m: f64,
    pub center_y_m: f64,
    pub reference_ranges: ReferenceRanges,
}

/// Computes sway metrics normalised to one mat's physical size
///
/// Holds no state between calls; the same trajectory always gives the same
/// metrics.
pub struct BalanceAnalyzer<'a> {
    spec: &'a HardwareSpec,
    config: &'a BalanceConfig,
}

impl<'a> BalanceAnalyzer<'a> {
    pub fn new(spec: &'a HardwareSpec, config: &'a BalanceConfig) -> Self {
        BalanceAnalyzer { spec, config }
    }

    pub fn compute(&self, trajectory: &[CopPoint]) -> Outcome<BalanceMetrics> {
        if trajectory.len() < self.config.min_points {
            return Outcome::insufficient(format!(
                "{} COP points, need at least {}",
                trajectory.len(),
                self.config.min_points
            ));
        }

        let points: Vec<Vec2> = trajectory.iter().map(CopPoint::position).collect();
        let n = points.len() as f64;
        let center = points.iter().fold(Vec2::zeros(), |acc, p| acc + p) / n;

        let (var_x, var_y) = points.iter().fold((0.0, 0.0), |(vx, vy), p| {
            let d = p - center;
            (vx + d.x * d.x / n, vy + d.y * d.y / n)
        });
        let a = (self.config.chi2_95 * var_x).sqrt();
        let b = (self.config.chi2_95 * var_y).sqrt();
        let area_m2 = std::f64::consts::PI * a * b;

        let path_m: f64 = points.windows(2).map(|w| distance(&w[0], &w[1])).sum();

        let (min_x, max_x) = min_max(points.iter().map(|p| p.x));
        let (min_y, max_y) = min_max(points.iter().map(|p| p.y));
        let max_displacement_m = points
            .iter()
            .map(|p| distance(p, &center))
            .fold(0.0, f64::max);

        let stability_index = self.stability_index(path_m, area_m2);
        log::debug!(
            "Sway area {:.2} cm², path {:.1} cm, stability {:.0}",
            area_m2 * M2_TO_CM2,
            path_m * M_TO_CM,
            stability_index
        );

        Outcome::ok(BalanceMetrics {
            cop_area_cm2: area_m2 * M2_TO_CM2,
            path_length_cm: path_m * M_TO_CM,
            complexity: self.complexity(&points),
            anteroposterior_range_cm: (max_y - min_y) * M_TO_CM,
            mediolateral_range_cm: (max_x - min_x) * M_TO_CM,
            max_displacement_cm: max_displacement_m * M_TO_CM,
            mean_velocity_cm_per_sample: path_m * M_TO_CM / n,
            stability_index,
            center_x_m: center.x,
            center_y_m: center.y,
            reference_ranges: ReferenceRanges::for_category(self.spec.category()),
        })
    }

    /// Reversals of turn direction along the path
    ///
    /// Cross products of consecutive displacements at or below the tolerance
    /// carry no direction and are skipped.
    fn complexity(&self, points: &[Vec2]) -> f64 {
        if points.len() < MIN_COMPLEXITY_POINTS {
            return NEUTRAL_COMPLEXITY;
        }

        let displacements: Vec<Vec2> = points.windows(2).map(|w| w[1] - w[0]).collect();
        let mut reversals = 0usize;
        let mut last_turn: Option<bool> = None;
        for pair in displacements.windows(2) {
            let cross = cross_z(&pair[0], &pair[1]);
            if cross.abs() <= self.config.cross_tolerance {
                continue;
            }
            let turning_left = cross > 0.0;
            if last_turn.is_some_and(|prev| prev != turning_left) {
                reversals += 1;
            }
            last_turn = Some(turning_left);
        }

        let ratio = reversals as f64 / points.len() as f64;
        ((ratio * COMPLEXITY_SCALE * 10.0).round() / 10.0).clamp(0.0, MAX_COMPLEXITY)
    }

    /// 100 minus staged penalties on size-normalised path length and sway area
    fn stability_index(&self, path_m: f64, area_m2: f64) -> f64 {
        let size_factor = self.spec.size_factor();
        if size_factor <= 0.0 {
            return 100.0;
        }
        let penalty = |value: f64, stages: &[(f64, f64)]| {
            stages
                .iter()
                .find(|(limit, _)| value > *limit)
                .map_or(0.0, |&(_, penalty)| penalty)
        };

        let score = 100.0
            - penalty(path_m / size_factor, &self.config.path_penalties)
            - penalty(area_m2 / (size_factor * size_factor), &self.config.area_penalties);
        score.clamp(0.0, 100.0)
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}
