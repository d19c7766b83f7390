/// Centered moving average with edge truncation
///
/// Sample `i` averages `values[i - window/2 ..= i + window/2]`, clipped to the
/// slice, so the output has the same length as the input and no lag.
pub fn centered_moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let half = window.max(1) / 2;
    let n = values.len();

    // Prefix sums keep this O(n) for long recordings
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for v in values {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + v);
    }

    (0..n)
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(n);
            (prefix[end] - prefix[start]) / (end - start) as f64
        })
        .collect()
}

/// Linear-interpolated quantile, `q` in [0, 1]
///
/// Returns `None` for an empty slice.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Two-threshold contact detector
///
/// Switches on at `enter` and only switches off again at `exit`, so a signal
/// hovering around a single threshold does not chatter.
pub struct HysteresisGate {
    enter: f64,
    exit: f64,
    active: bool,
}

impl HysteresisGate {
    pub fn new(enter: f64, exit: f64) -> Self {
        HysteresisGate {
            enter,
            exit,
            active: false,
        }
    }

    /// Feed one value, returns the contact state after it
    pub fn apply(&mut self, value: f64) -> bool {
        if !self.active && value >= self.enter {
            self.active = true;
        } else if self.active && value <= self.exit {
            self.active = false;
        }
        self.active
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average_interior() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let smoothed = centered_moving_average(&values, 5);
        assert_eq!(smoothed.len(), values.len());
        // Interior: mean of 5 neighbours
        assert!((smoothed[3] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_moving_average_edges_truncate() {
        let values = [3.0, 6.0, 9.0, 12.0];
        let smoothed = centered_moving_average(&values, 5);
        // i = 0 averages [3, 6, 9]
        assert!((smoothed[0] - 6.0).abs() < 1e-12);
        // i = 3 averages [6, 9, 12]
        assert!((smoothed[3] - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_moving_average_empty_and_unit_window() {
        assert!(centered_moving_average(&[], 5).is_empty());
        assert_eq!(centered_moving_average(&[1.0, 4.0], 1), vec![1.0, 4.0]);
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(quantile(&values, 0.0), Some(1.0));
        assert_eq!(quantile(&values, 1.0), Some(4.0));
        assert!((quantile(&values, 0.5).unwrap() - 2.5).abs() < 1e-12);
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_hysteresis_holds_between_thresholds() {
        let mut gate = HysteresisGate::new(10.0, 5.0);
        let states: Vec<bool> = [0.0, 11.0, 7.0, 6.0, 4.0, 7.0, 10.0]
            .iter()
            .map(|&v| gate.apply(v))
            .collect();
        assert_eq!(states, vec![false, true, true, true, false, false, true]);
        assert!(gate.is_active());
    }
}
