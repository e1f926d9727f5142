//! Fixed-window moving average used to smooth noisy per-tick rates.

use crate::error::{EfError, EfResult};

/// A circular buffer of the last `N` samples with a running total.
///
/// `total` always equals the sum of the buffer and `average` always equals
/// `total / N`; both are updated incrementally on every sample.
#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverageCalculator {
    buffer: Vec<f64>,
    index: usize,
    total: f64,
    average: f64,
    initial_value: f64,
}

impl MovingAverageCalculator {
    /// Create a calculator over `size` samples, every slot preset to `initial_value`.
    pub fn new(size: usize, initial_value: f64) -> EfResult<Self> {
        if size == 0 {
            return Err(EfError::InvalidWindowSize);
        }
        Ok(Self {
            buffer: vec![initial_value; size],
            index: 0,
            total: initial_value * size as f64,
            average: initial_value,
            initial_value,
        })
    }

    /// Push a sample, displacing the oldest.
    pub fn add_value(&mut self, value: f64) {
        let replaced = std::mem::replace(&mut self.buffer[self.index], value);
        self.index = (self.index + 1) % self.buffer.len();
        self.total += value - replaced;
        self.average = self.total / self.buffer.len() as f64;
    }

    /// Refill every slot with the initial value.
    pub fn reset(&mut self) {
        self.buffer.fill(self.initial_value);
        self.index = 0;
        self.total = self.initial_value * self.buffer.len() as f64;
        self.average = self.initial_value;
    }

    /// Current smoothed value.
    pub fn average(&self) -> f64 {
        self.average
    }

    /// Running sum of every slot.
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Window size.
    pub fn size(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_window_rejected() {
        assert_eq!(
            MovingAverageCalculator::new(0, 0.0).unwrap_err(),
            EfError::InvalidWindowSize
        );
    }

    #[test]
    fn starts_at_initial_value() {
        let calc = MovingAverageCalculator::new(4, 2.0).unwrap();
        assert_eq!(calc.average(), 2.0);
        assert_eq!(calc.total(), 8.0);
        assert_eq!(calc.size(), 4);
    }

    #[test]
    fn partial_fill_blends_with_initial() {
        let mut calc = MovingAverageCalculator::new(4, 0.0).unwrap();
        calc.add_value(8.0);
        assert!((calc.average() - 2.0).abs() < 1e-12);
        calc.add_value(4.0);
        assert!((calc.average() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn wraps_and_displaces_oldest() {
        let mut calc = MovingAverageCalculator::new(3, 0.0).unwrap();
        for v in [1.0, 2.0, 3.0, 10.0] {
            calc.add_value(v);
        }
        // Window holds 10, 2, 3.
        assert!((calc.total() - 15.0).abs() < 1e-12);
        assert!((calc.average() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut calc = MovingAverageCalculator::new(5, 1.5).unwrap();
        for v in 0..17 {
            calc.add_value(v as f64);
        }
        calc.reset();
        assert_eq!(calc, MovingAverageCalculator::new(5, 1.5).unwrap());
    }

    proptest! {
        #[test]
        fn average_is_mean_of_last_window(
            size in 1usize..16,
            values in proptest::collection::vec(-1000.0f64..1000.0, 16..200),
        ) {
            let mut calc = MovingAverageCalculator::new(size, 0.0).unwrap();
            for &v in &values {
                calc.add_value(v);
            }
            let tail = &values[values.len() - size..];
            let expected = tail.iter().sum::<f64>() / size as f64;
            prop_assert!((calc.average() - expected).abs() < 1e-6);
            prop_assert!((calc.total() - tail.iter().sum::<f64>()).abs() < 1e-6);
        }
    }
}
