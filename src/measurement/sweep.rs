// Frequency sweep iteration
//
// Frequencies are derived by index multiplication rather than repeated
// addition, so the sequence is strictly increasing with a uniform step and
// free of float accumulation drift.

/// Iterator over the frequencies of one tuning sweep:
/// `start, start + step, ..., <= end`, inclusive of the end frequency when
/// it lies on the grid.
#[derive(Debug, Clone)]
pub struct FrequencySweep {
    start_hz: f32,
    step_hz: f32,
    count: usize,
    index: usize,
}

impl FrequencySweep {
    /// Build the sweep; degenerate ranges (non-positive step, end below
    /// start, non-finite bounds) produce an empty sweep.
    pub fn new(start_hz: f32, end_hz: f32, step_hz: f32) -> Self {
        let count = if !start_hz.is_finite()
            || !end_hz.is_finite()
            || !step_hz.is_finite()
            || step_hz <= 0.0
            || end_hz < start_hz
            || start_hz <= 0.0
        {
            0
        } else {
            // Tolerance keeps an on-grid end frequency inside the sweep
            // despite float rounding of (end - start) / step.
            ((end_hz - start_hz) / step_hz + 1e-3).floor() as usize + 1
        };

        Self {
            start_hz,
            step_hz,
            count,
            index: 0,
        }
    }

    /// Total number of frequencies the sweep will visit
    pub fn point_count(&self) -> usize {
        self.count
    }
}

impl Iterator for FrequencySweep {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.index >= self.count {
            return None;
        }
        let frequency_hz = self.start_hz + self.index as f32 * self.step_hz;
        self.index += 1;
        Some(frequency_hz)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrequencySweep {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xl_sweep_has_91_points() {
        let sweep = FrequencySweep::new(50.0, 95.0, 0.5);
        assert_eq!(sweep.point_count(), 91);

        let frequencies: Vec<f32> = sweep.collect();
        assert_eq!(frequencies.len(), 91);
        assert_eq!(frequencies[0], 50.0);
        assert_eq!(*frequencies.last().unwrap(), 95.0);
    }

    #[test]
    fn test_strictly_increasing_no_duplicates() {
        let frequencies: Vec<f32> = FrequencySweep::new(50.0, 95.0, 0.5).collect();
        for pair in frequencies.windows(2) {
            assert!(pair[1] > pair[0], "not increasing: {} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_uniform_step() {
        let frequencies: Vec<f32> = FrequencySweep::new(75.0, 105.0, 0.5).collect();
        for pair in frequencies.windows(2) {
            assert!((pair[1] - pair[0] - 0.5).abs() < 1e-4);
        }
    }

    #[test]
    fn test_off_grid_end_is_not_overshot() {
        let frequencies: Vec<f32> = FrequencySweep::new(50.0, 95.2, 0.5).collect();
        assert_eq!(frequencies.len(), 91);
        assert!(*frequencies.last().unwrap() <= 95.2);
    }

    #[test]
    fn test_single_point_sweep() {
        let frequencies: Vec<f32> = FrequencySweep::new(60.0, 60.0, 0.5).collect();
        assert_eq!(frequencies, vec![60.0]);
    }

    #[test]
    fn test_degenerate_ranges_are_empty() {
        assert_eq!(FrequencySweep::new(95.0, 50.0, 0.5).point_count(), 0);
        assert_eq!(FrequencySweep::new(50.0, 95.0, 0.0).point_count(), 0);
        assert_eq!(FrequencySweep::new(50.0, 95.0, -1.0).point_count(), 0);
        assert_eq!(FrequencySweep::new(0.0, 95.0, 0.5).point_count(), 0);
        assert_eq!(FrequencySweep::new(f32::NAN, 95.0, 0.5).point_count(), 0);
    }

    #[test]
    fn test_exact_size_iterator() {
        let mut sweep = FrequencySweep::new(50.0, 95.0, 0.5);
        assert_eq!(sweep.len(), 91);
        sweep.next();
        assert_eq!(sweep.len(), 90);
    }
}
