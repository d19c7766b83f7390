//! Stance, swing and double support from per-side contact states

use crate::config::GaitConfig;
use crate::smoothing::{centered_moving_average, quantile, HysteresisGate};
use crate::types::GaitSample;
use serde::{Deserialize, Serialize};

/// Below this overlap fraction, double support is estimated from stance fractions
const MIN_MEASURED_DOUBLE_SUPPORT: f64 = 0.01;
const MAX_ESTIMATED_DOUBLE_SUPPORT: f64 = 0.4;

/// Heel strikes and toe-offs of one side, as sample timestamps (s)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContactEvents {
    pub heel_strikes: Vec<f64>,
    pub toe_offs: Vec<f64>,
}

impl ContactEvents {
    /// Derive events from one side's pressure series
    ///
    /// The series is smoothed, then gated with hysteresis between two
    /// quantiles of its non-zero values. Rising edges are heel strikes,
    /// falling edges toe-offs.
    pub fn detect(pressures: &[f64], timestamps: &[f64], config: &GaitConfig) -> Self {
        let window = ((config.contact_smoothing_s * config.sample_rate_hz) as usize).max(3);
        let smoothed = centered_moving_average(pressures, window);

        let loaded: Vec<f64> = smoothed.iter().copied().filter(|&p| p > 0.0).collect();
        let (enter, exit) = match (
            quantile(&loaded, config.contact_enter_quantile),
            quantile(&loaded, config.contact_exit_quantile),
        ) {
            (Some(enter), Some(exit)) => (enter, exit),
            _ => return ContactEvents::default(),
        };
        // A flat signal has no contact transitions to find
        if enter <= exit {
            return ContactEvents::default();
        }

        let mut gate = HysteresisGate::new(enter, exit);
        let mut events = ContactEvents::default();
        let mut in_contact = false;
        for (&value, &t) in smoothed.iter().zip(timestamps) {
            let now = gate.apply(value);
            match (in_contact, now) {
                (false, true) => events.heel_strikes.push(t),
                (true, false) => events.toe_offs.push(t),
                _ => {}
            }
            in_contact = now;
        }
        events
    }

    /// Stance interval (heel strike, toe-off) of every gait cycle that has a
    /// toe-off before the next heel strike, keyed by cycle index
    fn stance_intervals(&self) -> Vec<(usize, f64, f64)> {
        self.heel_strikes
            .windows(2)
            .enumerate()
            .filter_map(|(k, hs)| {
                self.toe_offs
                    .iter()
                    .find(|&&to| hs[0] < to && to < hs[1])
                    .map(|&to| (k, hs[0], to))
            })
            .collect()
    }

    fn cycle_duration(&self, k: usize) -> Option<f64> {
        Some(self.heel_strikes.get(k + 1)? - self.heel_strikes.get(k)?)
    }
}

/// Gait-cycle metrics of one foot
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SideMetrics {
    pub heel_strikes: usize,
    pub toe_offs: usize,
    pub cadence_steps_per_min: Option<f64>,
    /// Fraction of the cycle in stance, 0-1
    pub stance_fraction: Option<f64>,
    pub swing_fraction: Option<f64>,
    pub mean_swing_time_s: Option<f64>,
}

impl SideMetrics {
    pub fn from_events(events: &ContactEvents, config: &GaitConfig) -> Self {
        let (stance_min, stance_max) = config.stance_range_s;
        let (cycle_min, cycle_max) = config.cycle_range_s;
        let in_cycle_range = |c: f64| (cycle_min..=cycle_max).contains(&c);

        let intervals: Vec<f64> = events
            .heel_strikes
            .windows(2)
            .map(|hs| hs[1] - hs[0])
            .filter(|&iv| in_cycle_range(iv))
            .collect();
        let cadence_steps_per_min = mean(&intervals).map(|m| 60.0 / m);

        let mut stance_fractions = Vec::new();
        let mut swing_times = Vec::new();
        for (k, hs, to) in events.stance_intervals() {
            let Some(cycle) = events.cycle_duration(k) else {
                continue;
            };
            let stance = to - hs;
            if (stance_min..=stance_max).contains(&stance) && in_cycle_range(cycle) {
                stance_fractions.push(stance / cycle);
                swing_times.push(cycle - stance);
            }
        }
        let stance_fraction = mean(&stance_fractions);

        SideMetrics {
            heel_strikes: events.heel_strikes.len(),
            toe_offs: events.toe_offs.len(),
            cadence_steps_per_min,
            stance_fraction,
            swing_fraction: stance_fraction.map(|s| 1.0 - s),
            mean_swing_time_s: mean(&swing_times),
        }
    }
}

/// Per-foot breakdown, present when the input carries left/right pressure
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SideBreakdown {
    pub left: SideMetrics,
    pub right: SideMetrics,
}

/// Phase fractions of the whole gait cycle, 0-1; `None` when not derivable
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GaitPhases {
    pub stance_fraction: Option<f64>,
    pub swing_fraction: Option<f64>,
    pub double_support_fraction: Option<f64>,
}

/// Phase analysis of a sample series
///
/// Returns default phases and no breakdown when neither side carries load.
pub fn analyze(samples: &[GaitSample], config: &GaitConfig) -> (GaitPhases, Option<SideBreakdown>) {
    let has_sides = samples
        .iter()
        .any(|s| s.left_pressure > 0.0 || s.right_pressure > 0.0);
    if !has_sides {
        return (GaitPhases::default(), None);
    }

    let timestamps: Vec<f64> = samples.iter().map(|s| s.timestamp).collect();
    let left_series: Vec<f64> = samples.iter().map(|s| s.left_pressure).collect();
    let right_series: Vec<f64> = samples.iter().map(|s| s.right_pressure).collect();

    let left_events = ContactEvents::detect(&left_series, &timestamps, config);
    let right_events = ContactEvents::detect(&right_series, &timestamps, config);
    log::debug!(
        "Contact events: left {} HS / {} TO, right {} HS / {} TO",
        left_events.heel_strikes.len(),
        left_events.toe_offs.len(),
        right_events.heel_strikes.len(),
        right_events.toe_offs.len()
    );

    let left = SideMetrics::from_events(&left_events, config);
    let right = SideMetrics::from_events(&right_events, config);

    let stance_fraction = match (left.stance_fraction, right.stance_fraction) {
        (Some(l), Some(r)) => Some((l + r) / 2.0),
        (one, other) => one.or(other),
    };

    let double_support_fraction = match double_support(&left_events, &right_events) {
        Some(measured) if measured >= MIN_MEASURED_DOUBLE_SUPPORT => Some(measured),
        measured => match (left.stance_fraction, right.stance_fraction) {
            (Some(l), Some(r)) => Some((l + r - 1.0).clamp(0.0, MAX_ESTIMATED_DOUBLE_SUPPORT)),
            _ => measured,
        },
    };

    let phases = GaitPhases {
        stance_fraction,
        swing_fraction: stance_fraction.map(|s| 1.0 - s),
        double_support_fraction,
    };
    (phases, Some(SideBreakdown { left, right }))
}

/// Mean overlap of cycle-aligned left/right stance intervals, over the
/// shorter of the two cycles
fn double_support(left: &ContactEvents, right: &ContactEvents) -> Option<f64> {
    let left_stance = left.stance_intervals();
    let right_stance = right.stance_intervals();

    let fractions: Vec<f64> = left_stance
        .iter()
        .zip(&right_stance)
        .filter_map(|(&(lk, l_hs, l_to), &(rk, r_hs, r_to))| {
            let overlap = (l_to.min(r_to) - l_hs.max(r_hs)).max(0.0);
            let cycle = left.cycle_duration(lk)?.min(right.cycle_duration(rk)?);
            (cycle > 0.0).then(|| overlap / cycle)
        })
        .collect();
    mean(&fractions)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const RATE: f64 = 30.0;

    /// Square contact wave: `stance` frames loaded out of every `cycle`,
    /// starting at `offset`
    fn square_wave(n: usize, cycle: usize, stance: usize, offset: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                if i >= offset && (i - offset) % cycle < stance {
                    100.0
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn samples(left: &[f64], right: &[f64]) -> Vec<GaitSample> {
        left.iter()
            .zip(right)
            .enumerate()
            .map(|(i, (&l, &r))| GaitSample {
                frame_index: i,
                timestamp: i as f64 / RATE,
                x: 0.0,
                y: 0.0,
                pressure: l + r,
                left_pressure: l,
                right_pressure: r,
            })
            .collect()
    }

    #[test]
    fn test_contact_events_follow_square_wave() {
        // 1 s cycle, 0.6 s stance
        let series = square_wave(150, 30, 18, 0);
        let timestamps: Vec<f64> = (0..150).map(|i| i as f64 / RATE).collect();
        let events = ContactEvents::detect(&series, &timestamps, &GaitConfig::default());
        assert_eq!(events.heel_strikes.len(), 5);
        assert_eq!(events.toe_offs.len(), 5);

        let side = SideMetrics::from_events(&events, &GaitConfig::default());
        assert_relative_eq!(side.cadence_steps_per_min.unwrap(), 60.0, epsilon = 1.0);
        assert_relative_eq!(side.stance_fraction.unwrap(), 0.6, epsilon = 0.1);
        assert_relative_eq!(side.mean_swing_time_s.unwrap(), 0.4, epsilon = 0.1);
    }

    #[test]
    fn test_no_side_pressure_yields_no_breakdown() {
        let zeros = vec![0.0; 60];
        let (phases, sides) = analyze(&samples(&zeros, &zeros), &GaitConfig::default());
        assert!(sides.is_none());
        assert_eq!(phases, GaitPhases::default());
    }

    #[test]
    fn test_alternating_feet_overlap() {
        // Right foot lags half a cycle; stance 0.6 s of a 1 s cycle on each side
        let left = square_wave(240, 30, 18, 0);
        let right = square_wave(240, 30, 18, 15);
        let (phases, sides) = analyze(&samples(&left, &right), &GaitConfig::default());

        let sides = sides.unwrap();
        assert!(sides.left.heel_strikes >= 7);
        assert!(sides.right.heel_strikes >= 7);
        let stance = phases.stance_fraction.unwrap();
        assert_relative_eq!(stance, 0.6, epsilon = 0.1);
        assert_relative_eq!(phases.swing_fraction.unwrap(), 1.0 - stance, epsilon = 1e-12);

        // Each foot's stance overlaps the other's by about 0.1 s of 1 s
        let double_support = phases.double_support_fraction.unwrap();
        assert_relative_eq!(double_support, 0.1, epsilon = 0.05);
    }

    #[test]
    fn test_constant_load_has_no_cycles() {
        let steady = vec![80.0; 90];
        let (phases, sides) = analyze(&samples(&steady, &steady), &GaitConfig::default());
        let sides = sides.unwrap();
        assert_eq!(sides.left.heel_strikes, 0);
        assert_eq!(sides.left.cadence_steps_per_min, None);
        assert_eq!(phases.stance_fraction, None);
        assert_eq!(phases.double_support_fraction, None);
    }
}
