use super::DepthFilter;
use crate::{Error, Result};
use std::collections::VecDeque;

/// Median filter; rejects single-frame depth spikes from the landmark model
pub struct MedianFilter {
    window_size: usize,
    buffer: VecDeque<f64>,
}

impl MedianFilter {
    /// Create a new median filter
    ///
    /// # Errors
    ///
    /// Returns an error if the window size is zero or even
    pub fn try_new(window_size: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(Error::FilterError("Window size must be greater than 0".to_string()));
        }
        if window_size % 2 == 0 {
            return Err(Error::FilterError(format!(
                "Median filter window size must be odd, got {window_size}"
            )));
        }
        Ok(Self {
            window_size,
            buffer: VecDeque::with_capacity(window_size),
        })
    }

    fn median(values: &VecDeque<f64>) -> f64 {
        let mut sorted: Vec<f64> = values.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);

        let len = sorted.len();
        if len == 0 {
            0.0
        } else if len % 2 == 0 {
            (sorted[len / 2 - 1] + sorted[len / 2]) / 2.0
        } else {
            sorted[len / 2]
        }
    }
}

impl DepthFilter for MedianFilter {
    fn apply(&mut self, value: f64) -> f64 {
        if self.buffer.len() >= self.window_size {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);

        Self::median(&self.buffer)
    }

    fn reset(&mut self) {
        self.buffer.clear();
    }

    fn name(&self) -> &str {
        "MedianFilter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_filter() {
        let mut filter = MedianFilter::try_new(3).unwrap();

        assert_eq!(filter.apply(-0.1), -0.1);
        assert!((filter.apply(-0.2) + 0.15).abs() < 1e-12); // median of [-0.1, -0.2]
        assert_eq!(filter.apply(-0.3), -0.2);
    }

    #[test]
    fn test_median_with_spike() {
        let mut filter = MedianFilter::try_new(3).unwrap();

        filter.apply(-0.10);
        filter.apply(-0.11);
        let z = filter.apply(-3.0); // landmark depth glitch

        assert_eq!(z, -0.11);
    }

    #[test]
    fn test_window_validation() {
        assert!(MedianFilter::try_new(0).is_err());
        assert!(MedianFilter::try_new(4).is_err());
        assert!(MedianFilter::try_new(5).is_ok());
    }
}
