use crate::hardware::HardwareSpec;
use crate::types::{CopPoint, PressureFrame};

/// Minimum summed pressure for a usable COP
const MIN_TOTAL_WEIGHT: f64 = 0.5;
/// Minimum loaded cells for a usable COP; fewer is treated as noise
const MIN_ACTIVE_CELLS: usize = 3;

/// Pressure-weighted centroid of a frame, in meters
///
/// Cell (row, col) sits at ((col + 0.5) * scale_x, (row + 0.5) * scale_y).
/// Only cells above the spec's pressure threshold contribute. Frames with too
/// little load or fewer than three loaded cells yield `None`.
pub fn compute(frame: &PressureFrame, spec: &HardwareSpec) -> Option<CopPoint> {
    let threshold = spec.threshold();
    let (scale_x, scale_y) = (spec.grid_scale_x(), spec.grid_scale_y());
    let mid_col = frame.cols() / 2;

    let mut total = 0.0;
    let mut weighted_x = 0.0;
    let mut weighted_y = 0.0;
    let mut active = 0usize;
    let mut left = 0.0;
    let mut right = 0.0;

    for ((row, col), &pressure) in frame.values.indexed_iter() {
        if pressure <= threshold {
            continue;
        }
        let x = (col as f64 + 0.5) * scale_x;
        let y = (row as f64 + 0.5) * scale_y;

        total += pressure;
        weighted_x += x * pressure;
        weighted_y += y * pressure;
        active += 1;
        if col < mid_col {
            left += pressure;
        } else {
            right += pressure;
        }
    }

    if total <= MIN_TOTAL_WEIGHT || active < MIN_ACTIVE_CELLS {
        return None;
    }

    Some(CopPoint {
        frame_index: frame.index,
        x: weighted_x / total,
        y: weighted_y / total,
        total_pressure_weight: total,
        active_cell_count: active,
        left_weight: left,
        right_weight: right,
    })
}

/// COP of every usable frame, in frame order
pub fn trajectory(frames: &[PressureFrame], spec: &HardwareSpec) -> Vec<CopPoint> {
    frames.iter().filter_map(|frame| compute(frame, spec)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::DataLayout;
    use approx::assert_relative_eq;

    fn square_spec() -> HardwareSpec {
        HardwareSpec::new("square", "Square test mat", 1.6, 1.6, 32, 32, DataLayout::Columns32, 1, 20.0)
            .unwrap()
    }

    #[test]
    fn test_single_cell_is_rejected() {
        let mut frame = PressureFrame::zeros(0, 32, 32);
        frame.values[[10, 10]] = 100.0;
        assert!(compute(&frame, &square_spec()).is_none());
    }

    #[test]
    fn test_block_centroid() {
        let mut frame = PressureFrame::zeros(7, 32, 32);
        for row in 15..=17 {
            for col in 15..=17 {
                frame.values[[row, col]] = 50.0;
            }
        }
        let cop = compute(&frame, &square_spec()).unwrap();
        // Block center is cell (16, 16): (16 + 0.5) * 0.05 m
        assert_relative_eq!(cop.x, 0.825, epsilon = 1e-9);
        assert_relative_eq!(cop.y, 0.825, epsilon = 1e-9);
        assert_eq!(cop.active_cell_count, 9);
        assert_eq!(cop.total_pressure_weight, 450.0);
        assert_eq!(cop.frame_index, 7);
        // Column 16 belongs to the right half
        assert_eq!(cop.left_weight, 150.0);
        assert_eq!(cop.right_weight, 300.0);
    }

    #[test]
    fn test_threshold_excludes_noise() {
        let mut frame = PressureFrame::zeros(0, 32, 32);
        frame.values.fill(20.0); // at threshold, not above
        assert!(compute(&frame, &square_spec()).is_none());

        frame.values[[0, 0]] = 40.0;
        frame.values[[0, 1]] = 40.0;
        frame.values[[1, 0]] = 40.0;
        let cop = compute(&frame, &square_spec()).unwrap();
        assert_eq!(cop.active_cell_count, 3);
    }

    #[test]
    fn test_anisotropic_scales() {
        let spec = HardwareSpec::new("wide", "Wide", 3.2, 0.8, 64, 16, DataLayout::Columns64, 1, 20.0)
            .unwrap();
        let mut frame = PressureFrame::zeros(0, 16, 64);
        frame.values[[4, 10]] = 100.0;
        frame.values[[4, 11]] = 100.0;
        frame.values[[5, 10]] = 100.0;
        frame.values[[5, 11]] = 100.0;
        let cop = compute(&frame, &spec).unwrap();
        assert_relative_eq!(cop.x, 11.0 * 0.05, epsilon = 1e-9);
        assert_relative_eq!(cop.y, 5.0 * 0.05, epsilon = 1e-9);
    }

    #[test]
    fn test_trajectory_preserves_order_and_drops_empty_frames() {
        let spec = square_spec();
        let mut frames = Vec::new();
        for i in 0..5 {
            let mut frame = PressureFrame::zeros(i, 32, 32);
            if i != 2 {
                for col in 0..3 {
                    frame.values[[i, col + i]] = 60.0;
                }
            }
            frames.push(frame);
        }
        let cops = trajectory(&frames, &spec);
        let indices: Vec<usize> = cops.iter().map(|c| c.frame_index).collect();
        assert_eq!(indices, vec![0, 1, 3, 4]);
        assert!(cops.windows(2).all(|w| w[0].x < w[1].x));
        // Restartable: same input, same output
        assert_eq!(trajectory(&frames, &spec), cops);
    }
}
