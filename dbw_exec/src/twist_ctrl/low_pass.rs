//! Low pass filter for measured signals

use serde::Serialize;

/// A first order low pass filter.
///
/// The first sample passed through the filter is returned unchanged, so that
/// the filter introduces no start-up transient. Each later sample is blended
/// with the previous output as `alpha * sample + (1 - alpha) * last`.
#[derive(Debug, Clone, Serialize)]
pub struct LowPassFilter {
    /// Weight given to each new sample, between 0 and 1.
    alpha: f64,

    /// The last output of the filter, or `None` before the first sample.
    last: Option<f64>,
}

impl LowPassFilter {
    /// Create a new filter with the given time constant and sample period.
    ///
    /// The blend factor is `time_constant_s / (time_constant_s +
    /// sample_period_s)`. Both values must be positive, which is checked as
    /// part of parameter validation.
    pub fn new(time_constant_s: f64, sample_period_s: f64) -> Self {
        Self {
            alpha: time_constant_s / (time_constant_s + sample_period_s),
            last: None,
        }
    }

    /// Pass a new sample through the filter, returning the filtered value.
    pub fn filter(&mut self, sample: f64) -> f64 {
        let out = self.peek(sample);

        self.last = Some(out);

        out
    }

    /// The value `filter` would return for `sample`, without updating the
    /// filter.
    pub fn peek(&self, sample: f64) -> f64 {
        match self.last {
            Some(last) => self.alpha * sample + (1.0 - self.alpha) * last,
            None => sample,
        }
    }

    /// The last filtered value, or `None` if the filter has not been given a
    /// sample yet.
    pub fn get(&self) -> Option<f64> {
        self.last
    }

    /// The blend factor applied to new samples.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Forget the filter's history, the next sample will pass straight
    /// through.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_first_output_is_input() {
        for &v in &[0.0, 5.0, -3.25, 1e6, -1e-9] {
            let mut lpf = LowPassFilter::new(0.5, 0.02);
            assert_eq!(lpf.get(), None);
            assert_eq!(lpf.filter(v), v);
            assert_eq!(lpf.get(), Some(v));
        }
    }

    #[test]
    fn test_alpha() {
        let lpf = LowPassFilter::new(0.5, 0.5);
        assert_eq!(lpf.alpha(), 0.5);

        let mut lpf = LowPassFilter::new(1.0, 3.0);
        lpf.filter(0.0);
        assert_eq!(lpf.filter(4.0), 1.0);
    }

    #[test]
    fn test_monotonic_convergence() {
        let mut lpf = LowPassFilter::new(0.2, 0.5);
        lpf.filter(0.0);

        let target = 10.0;
        let mut prev = 0.0;
        for _ in 0..200 {
            let out = lpf.filter(target);
            assert!(out >= prev, "output decreased: {} -> {}", prev, out);
            assert!(out <= target, "output overshot: {}", out);
            prev = out;
        }
        assert!((target - prev).abs() < 1e-6);

        // And from above
        let mut lpf = LowPassFilter::new(0.2, 0.5);
        lpf.filter(10.0);
        let mut prev = 10.0;
        for _ in 0..200 {
            let out = lpf.filter(-2.0);
            assert!(out <= prev);
            assert!(out >= -2.0);
            prev = out;
        }
    }

    #[test]
    fn test_peek() {
        let mut lpf = LowPassFilter::new(1.0, 3.0);
        assert_eq!(lpf.peek(2.0), 2.0);
        assert_eq!(lpf.get(), None);

        lpf.filter(0.0);
        assert_eq!(lpf.peek(4.0), 1.0);
        assert_eq!(lpf.get(), Some(0.0));
        assert_eq!(lpf.filter(4.0), 1.0);
    }

    #[test]
    fn test_reset() {
        let mut lpf = LowPassFilter::new(0.5, 0.02);
        lpf.filter(1.0);
        lpf.filter(2.0);
        lpf.reset();
        assert_eq!(lpf.get(), None);
        assert_eq!(lpf.filter(7.0), 7.0);
    }
}
