use crate::config::GaitConfig;
use crate::types::{distance, GaitSample};
use serde::{Deserialize, Serialize};

/// One step between two consecutive accepted pressure peaks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub start_frame: usize,
    pub end_frame: usize,
    pub length_m: f64,
    pub duration_s: f64,
    pub velocity_m_s: f64,
    pub start_pressure: f64,
    pub end_pressure: f64,
}

/// Strict local maxima above `threshold`, accepted greedily left to right
/// with at least `min_gap` samples after the previous accepted peak
pub fn detect_peaks(smoothed: &[f64], threshold: f64, min_gap: usize) -> Vec<usize> {
    let mut peaks: Vec<usize> = Vec::new();
    if smoothed.len() < 3 {
        return peaks;
    }

    for i in 1..smoothed.len() - 1 {
        let is_peak = smoothed[i] > smoothed[i - 1]
            && smoothed[i] > smoothed[i + 1]
            && smoothed[i] > threshold;
        if !is_peak {
            continue;
        }
        if peaks.last().map_or(true, |&last| i - last >= min_gap) {
            peaks.push(i);
        }
    }
    peaks
}

/// Pair consecutive peaks into steps and keep the plausible ones
pub fn build_steps(samples: &[GaitSample], peaks: &[usize], config: &GaitConfig) -> Vec<StepRecord> {
    let period = config.sample_period_s();

    peaks
        .windows(2)
        .filter_map(|pair| {
            let (start, end) = (&samples[pair[0]], &samples[pair[1]]);
            let length_m = distance(&start.position(), &end.position());
            let frame_gap = end.frame_index.saturating_sub(start.frame_index);
            let duration_s = frame_gap as f64 * period;

            if length_m <= config.min_step_length_m || duration_s <= config.min_step_duration_s {
                return None;
            }
            Some(StepRecord {
                start_frame: start.frame_index,
                end_frame: end.frame_index,
                length_m,
                duration_s,
                velocity_m_s: length_m / duration_s,
                start_pressure: start.pressure,
                end_pressure: end.pressure,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(frame_index: usize, y: f64, pressure: f64) -> GaitSample {
        GaitSample {
            frame_index,
            timestamp: frame_index as f64 / 30.0,
            x: 0.2,
            y,
            pressure,
            left_pressure: 0.0,
            right_pressure: 0.0,
        }
    }

    #[test]
    fn test_peaks_respect_min_gap_without_backtracking() {
        let mut signal = vec![0.0; 40];
        signal[5] = 10.0;
        signal[12] = 50.0; // higher, but too close to 5
        signal[20] = 10.0;
        let peaks = detect_peaks(&signal, 1.0, 10);
        assert_eq!(peaks, vec![5, 20]);
    }

    #[test]
    fn test_peaks_need_threshold_and_strict_maximum() {
        let signal = [0.0, 3.0, 3.0, 0.0, 5.0, 0.0, 1.0, 0.0];
        // plateau at 1-2 is not strict; 6 is below threshold
        assert_eq!(detect_peaks(&signal, 2.0, 1), vec![4]);
        assert!(detect_peaks(&[1.0, 2.0], 0.0, 1).is_empty());
    }

    #[test]
    fn test_steps_filter_by_length_and_duration() {
        let samples: Vec<GaitSample> = (0..60)
            .map(|i| sample(i, if (i / 15) % 2 == 0 { 0.3 } else { 0.5 }, 100.0))
            .collect();
        let config = GaitConfig::default();

        // 15 frames at 30 Hz = 0.5 s, 0.2 m apart
        let steps = build_steps(&samples, &[0, 15, 30], &config);
        assert_eq!(steps.len(), 2);
        assert!((steps[0].length_m - 0.2).abs() < 1e-12);
        assert!((steps[0].duration_s - 0.5).abs() < 1e-12);
        assert!((steps[0].velocity_m_s - 0.4).abs() < 1e-9);

        // Same position: too short
        assert!(build_steps(&samples, &[0, 14], &config).is_empty());
        // 6 frames = 0.2 s: too quick
        assert!(build_steps(&samples, &[12, 18], &config).is_empty());
    }
}
