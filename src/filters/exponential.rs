use super::DepthFilter;
use crate::{Error, Result};

/// One exponential smoothing step: move `previous` toward `value` by `factor`
#[must_use]
pub fn smooth(previous: f64, value: f64, factor: f64) -> f64 {
    factor.mul_add(value - previous, previous)
}

/// Exponential smoothing filter
///
/// Starts from zero rather than the first sample, so a freshly reset filter
/// eases in from the neutral depth.
pub struct ExponentialFilter {
    alpha: f64,
    last: f64,
}

impl ExponentialFilter {
    /// Create a new exponential filter
    ///
    /// # Errors
    ///
    /// Returns an error if alpha is not in the range (0, 1]
    pub fn try_new(alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(Error::FilterError(format!("Alpha must be in (0, 1], got {alpha}")));
        }
        Ok(Self { alpha, last: 0.0 })
    }
}

impl DepthFilter for ExponentialFilter {
    fn apply(&mut self, value: f64) -> f64 {
        self.last = smooth(self.last, value, self.alpha);
        self.last
    }

    fn reset(&mut self) {
        self.last = 0.0;
    }

    fn name(&self) -> &str {
        "ExponentialFilter"
    }
}
