//! Scalar filters applied to the depth proxy before exponential smoothing.
//!
//! The landmark depth estimate is much noisier than the lateral position,
//! so the stabilizer optionally runs it through one of these filters first.

/// Exponential smoothing, the same law the stabilizer applies to depth
pub mod exponential;

/// Moving average filter for simple smoothing
pub mod moving_average;

/// Median filter for outlier rejection
pub mod median;

use crate::{Error, Result};

/// Trait for all depth filters
pub trait DepthFilter: Send + Sync {
    /// Feed one value and return the filtered value
    fn apply(&mut self, value: f64) -> f64;

    /// Reset filter state
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;
}

/// No-op filter that passes through values unchanged
pub struct NoFilter;

impl DepthFilter for NoFilter {
    fn apply(&mut self, value: f64) -> f64 {
        value
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "NoFilter"
    }
}

/// Create a depth filter from a spec string such as `median:5`
///
/// The part before the colon selects the filter; the optional part after it
/// sets the window size or the smoothing factor.
///
/// # Errors
///
/// Returns `Error::FilterError` for unknown names or invalid parameters.
pub fn create_filter(spec: &str) -> Result<Box<dyn DepthFilter>> {
    let spec = spec.trim().to_lowercase();
    let (name, param) = match spec.split_once(':') {
        Some((name, param)) => (name, Some(param)),
        None => (spec.as_str(), None),
    };

    match name {
        "none" | "nofilter" => Ok(Box::new(NoFilter)),
        "moving_average" | "movingaverage" => {
            let window = parse_window(param, crate::constants::DEFAULT_MOVING_AVERAGE_WINDOW)?;
            Ok(Box::new(moving_average::MovingAverageFilter::try_new(window)?))
        }
        "median" => {
            let window = parse_window(param, crate::constants::DEFAULT_MEDIAN_WINDOW)?;
            Ok(Box::new(median::MedianFilter::try_new(window)?))
        }
        "exponential" => {
            let alpha = match param {
                Some(p) => p
                    .parse::<f64>()
                    .map_err(|_| Error::FilterError(format!("Invalid exponential factor: {p}")))?,
                None => crate::constants::DEFAULT_SMOOTHING,
            };
            Ok(Box::new(exponential::ExponentialFilter::try_new(alpha)?))
        }
        _ => Err(Error::FilterError(format!("Unknown filter type: {name}"))),
    }
}

fn parse_window(param: Option<&str>, default: usize) -> Result<usize> {
    param.map_or(Ok(default), |p| {
        p.parse::<usize>()
            .map_err(|_| Error::FilterError(format!("Invalid window size: {p}")))
    })
}
