//! Head signal stabilization.
//!
//! Turns a raw screen-fraction head sample into a world-space eye position:
//! offset subtraction, axis sign convention and gain for the lateral axes,
//! exponential smoothing and a positive floor for depth.
//!
//! Sign convention: samples are taken from an unmirrored capture stream,
//! so a viewer moving right appears to move left in the image. The lateral
//! factor of `-2` turns that back into a rightward world offset. Mirrored
//! feeds set `invert_x` in the tracking config.

use crate::{
    constants::{
        DEFAULT_BASE_DEPTH, DEFAULT_CALIBRATION_CENTER, DEFAULT_DEPTH_SENSITIVITY, DEFAULT_MIN_EYE_DISTANCE,
        DEFAULT_MOVE_GAIN, DEFAULT_SMOOTHING, LATERAL_SCALE,
    },
    filters::{exponential::smooth, DepthFilter, NoFilter},
    Error, Result,
};
use log::debug;
use nalgebra::{Point3, Vector3};

/// One head estimate from the tracker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadSample {
    /// Horizontal position as a fraction of the frame width
    pub x: f64,
    /// Vertical position as a fraction of the frame height (down is positive)
    pub y: f64,
    /// Signed depth proxy, more negative is closer to the screen
    pub z: f64,
}

impl HeadSample {
    /// Create a sample, rejecting non-finite coordinates
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if any coordinate is NaN or infinite
    pub fn new(x: f64, y: f64, z: f64) -> Result<Self> {
        let sample = Self { x, y, z };
        if sample.is_finite() {
            Ok(sample)
        } else {
            Err(Error::InvalidInput(format!("Non-finite head sample ({x}, {y}, {z})")))
        }
    }

    /// True when all three coordinates are finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Screen-fraction position treated as the neutral head position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationOffset {
    pub x: f64,
    pub y: f64,
}

impl Default for CalibrationOffset {
    fn default() -> Self {
        Self {
            x: DEFAULT_CALIBRATION_CENTER,
            y: DEFAULT_CALIBRATION_CENTER,
        }
    }
}

impl CalibrationOffset {
    /// Offset that re-centers the lateral axes on `sample`
    pub const fn from_sample(sample: &HeadSample) -> Self {
        Self { x: sample.x, y: sample.y }
    }
}

/// World-space eye position after stabilization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilizedHead {
    pub x: f64,
    pub y: f64,
    /// Distance from the screen plane, always positive
    pub z: f64,
    /// Smoothed raw depth proxy, fed back as the next frame's history
    pub smoothed_depth: f64,
}

impl StabilizedHead {
    /// Head centered in front of the screen at `distance`
    pub const fn centered(distance: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: distance,
            smoothed_depth: 0.0,
        }
    }

    /// Eye position as a point
    pub fn position(&self) -> Point3<f64> {
        Point3::new(self.x, self.y, self.z)
    }

    /// Eye position as a vector from the screen center
    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

/// Tunable stabilizer parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilizerParams {
    pub move_gain: f64,
    pub depth_sensitivity: f64,
    pub base_depth: f64,
    /// Exponential smoothing factor in (0, 1]; 1 disables smoothing
    pub smoothing: f64,
    pub min_eye_distance: f64,
    pub invert_x: bool,
    pub invert_y: bool,
}

impl Default for StabilizerParams {
    fn default() -> Self {
        Self {
            move_gain: DEFAULT_MOVE_GAIN,
            depth_sensitivity: DEFAULT_DEPTH_SENSITIVITY,
            base_depth: DEFAULT_BASE_DEPTH,
            smoothing: DEFAULT_SMOOTHING,
            min_eye_distance: DEFAULT_MIN_EYE_DISTANCE,
            invert_x: false,
            invert_y: false,
        }
    }
}

impl StabilizerParams {
    /// Check ranges
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` naming the first out-of-range parameter
    pub fn validate(&self) -> Result<()> {
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(Error::InvalidInput(format!(
                "Smoothing factor must be in (0, 1], got {}",
                self.smoothing
            )));
        }
        if !(self.min_eye_distance > 0.0) {
            return Err(Error::InvalidInput(format!(
                "Minimum eye distance must be positive, got {}",
                self.min_eye_distance
            )));
        }
        for (name, value) in [
            ("move gain", self.move_gain),
            ("depth sensitivity", self.depth_sensitivity),
            ("base depth", self.base_depth),
        ] {
            if !value.is_finite() {
                return Err(Error::InvalidInput(format!("{name} must be finite, got {value}")));
            }
        }
        Ok(())
    }

    /// Lateral world offset for a raw sample relative to `offset`
    pub fn lateral(&self, raw: &HeadSample, offset: &CalibrationOffset) -> (f64, f64) {
        let sign_x = if self.invert_x { -1.0 } else { 1.0 };
        let sign_y = if self.invert_y { -1.0 } else { 1.0 };
        let x = (raw.x - offset.x) * -LATERAL_SCALE * self.move_gain * sign_x;
        let y = (raw.y - offset.y) * -LATERAL_SCALE * self.move_gain * sign_y;
        (x, y)
    }

    /// Map a smoothed depth proxy to a world eye distance, floored
    pub fn eye_distance(&self, smoothed_depth: f64) -> f64 {
        self.depth_sensitivity
            .mul_add(smoothed_depth, self.base_depth)
            .max(self.min_eye_distance)
    }
}

/// Stabilize one raw sample against the previous smoothed depth
pub fn stabilize(
    raw: &HeadSample,
    offset: &CalibrationOffset,
    prev_z: f64,
    params: &StabilizerParams,
) -> StabilizedHead {
    let (x, y) = params.lateral(raw, offset);
    let smoothed_depth = smooth(prev_z, raw.z, params.smoothing);

    StabilizedHead {
        x,
        y,
        z: params.eye_distance(smoothed_depth),
        smoothed_depth,
    }
}

/// Stateful wrapper that runs an optional depth pre-filter before [`stabilize`]
pub struct Stabilizer {
    params: StabilizerParams,
    prefilter: Box<dyn DepthFilter>,
}

impl Stabilizer {
    /// Create a stabilizer without a depth pre-filter
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range
    pub fn new(params: StabilizerParams) -> Result<Self> {
        Self::with_prefilter(params, Box::new(NoFilter))
    }

    /// Create a stabilizer that feeds raw depth through `prefilter` first
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range
    pub fn with_prefilter(params: StabilizerParams, prefilter: Box<dyn DepthFilter>) -> Result<Self> {
        params.validate()?;
        debug!("Stabilizer depth pre-filter: {}", prefilter.name());
        Ok(Self { params, prefilter })
    }

    pub const fn params(&self) -> &StabilizerParams {
        &self.params
    }

    /// Replace the parameters, keeping the old ones if the new set is invalid
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range
    pub fn set_params(&mut self, params: StabilizerParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// Stabilize `raw`, continuing the depth history of `previous`
    pub fn update(
        &mut self,
        raw: &HeadSample,
        offset: &CalibrationOffset,
        previous: &StabilizedHead,
    ) -> StabilizedHead {
        let filtered = HeadSample {
            z: self.prefilter.apply(raw.z),
            ..*raw
        };
        stabilize(&filtered, offset, previous.smoothed_depth, &self.params)
    }

    /// Recompute only the lateral axes of `current` for a new offset
    pub fn recenter(&self, raw: &HeadSample, offset: &CalibrationOffset, current: &StabilizedHead) -> StabilizedHead {
        let (x, y) = self.params.lateral(raw, offset);
        StabilizedHead { x, y, ..*current }
    }

    /// Forget depth pre-filter history
    pub fn reset(&mut self) {
        self.prefilter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::median::MedianFilter;

    #[test]
    fn test_lateral_example() {
        let params = StabilizerParams {
            move_gain: 2.0,
            ..StabilizerParams::default()
        };
        let offset = CalibrationOffset { x: 0.5, y: 0.5 };
        let raw = HeadSample::new(0.6, 0.4, -0.1).unwrap();

        let head = stabilize(&raw, &offset, 0.0, &params);
        assert!((head.x + 0.4).abs() < 1e-12);
        assert!((head.y - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_depth_example_without_smoothing() {
        let params = StabilizerParams {
            depth_sensitivity: 1.0,
            base_depth: 1.2,
            smoothing: 1.0,
            ..StabilizerParams::default()
        };
        let raw = HeadSample::new(0.5, 0.5, -0.2).unwrap();

        let head = stabilize(&raw, &CalibrationOffset::default(), 0.7, &params);
        assert!((head.z - 1.0).abs() < 1e-12);
        assert!((head.smoothed_depth + 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_depth_floor() {
        let params = StabilizerParams {
            depth_sensitivity: 5.0,
            base_depth: 1.0,
            smoothing: 1.0,
            ..StabilizerParams::default()
        };
        let raw = HeadSample::new(0.5, 0.5, -0.9).unwrap();

        let head = stabilize(&raw, &CalibrationOffset::default(), 0.0, &params);
        assert_eq!(head.z, DEFAULT_MIN_EYE_DISTANCE);
    }

    #[test]
    fn test_depth_carries_memory() {
        let params = StabilizerParams {
            smoothing: 0.5,
            ..StabilizerParams::default()
        };
        let raw = HeadSample::new(0.5, 0.5, -0.2).unwrap();
        let offset = CalibrationOffset::default();

        let first = stabilize(&raw, &offset, 0.0, &params);
        let second = stabilize(&raw, &offset, first.smoothed_depth, &params);

        assert!((first.smoothed_depth + 0.1).abs() < 1e-12);
        assert!((second.smoothed_depth + 0.15).abs() < 1e-12);
        assert!(second.z < first.z);
    }

    #[test]
    fn test_invert_x_flips_sign() {
        let params = StabilizerParams {
            invert_x: true,
            ..StabilizerParams::default()
        };
        let raw = HeadSample::new(0.75, 0.5, 0.0).unwrap();
        let (x, y) = params.lateral(&raw, &CalibrationOffset::default());

        assert!((x - 0.5).abs() < 1e-12);
        assert_eq!(y, 0.0);
    }

    #[test]
    fn test_rejects_non_finite_sample() {
        assert!(HeadSample::new(f64::NAN, 0.5, 0.0).is_err());
        assert!(HeadSample::new(0.5, f64::INFINITY, 0.0).is_err());
    }

    #[test]
    fn test_param_validation() {
        let bad = StabilizerParams {
            smoothing: 0.0,
            ..StabilizerParams::default()
        };
        assert!(Stabilizer::new(bad).is_err());

        let mut stabilizer = Stabilizer::new(StabilizerParams::default()).unwrap();
        let bad_floor = StabilizerParams {
            min_eye_distance: 0.0,
            ..StabilizerParams::default()
        };
        assert!(stabilizer.set_params(bad_floor).is_err());
        assert_eq!(stabilizer.params().min_eye_distance, DEFAULT_MIN_EYE_DISTANCE);
    }

    #[test]
    fn test_prefilter_rejects_spike() {
        let params = StabilizerParams {
            smoothing: 1.0,
            ..StabilizerParams::default()
        };
        let mut stabilizer =
            Stabilizer::with_prefilter(params, Box::new(MedianFilter::try_new(3).unwrap())).unwrap();
        let offset = CalibrationOffset::default();
        let mut head = StabilizedHead::centered(params.base_depth);

        for z in [-0.1, -0.1, -2.0] {
            let raw = HeadSample::new(0.5, 0.5, z).unwrap();
            head = stabilizer.update(&raw, &offset, &head);
        }

        assert!((head.smoothed_depth + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_recenter_keeps_depth() {
        let stabilizer = Stabilizer::new(StabilizerParams::default()).unwrap();
        let raw = HeadSample::new(0.3, 0.6, -0.1).unwrap();
        let current = StabilizedHead {
            x: 0.4,
            y: -0.2,
            z: 1.7,
            smoothed_depth: -0.06,
        };

        let head = stabilizer.recenter(&raw, &CalibrationOffset::from_sample(&raw), &current);
        assert_eq!((head.x, head.y), (0.0, 0.0));
        assert_eq!(head.z, current.z);
        assert_eq!(head.smoothed_depth, current.smoothed_depth);
    }
}
