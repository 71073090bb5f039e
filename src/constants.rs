//! Constants used throughout the application

/// Landmark index used as the head proxy (nose tip in the 478-point face mesh)
pub const NOSE_TIP_LANDMARK: usize = 1;

/// World-space height of the backdrop; width follows the viewport aspect
pub const REFERENCE_HEIGHT: f64 = 2.0;

/// Lateral scale applied to screen-fraction offsets before the move gain
pub const LATERAL_SCALE: f64 = 2.0;

/// Screen-fraction position treated as neutral before any calibration
pub const DEFAULT_CALIBRATION_CENTER: f64 = 0.5;

/// Default eye distance floor applied after depth mapping
pub const DEFAULT_MIN_EYE_DISTANCE: f64 = 0.2;

/// Hard lower bound on eye depth inside the projection solver
pub const EYE_DEPTH_EPSILON: f64 = 1e-3;

/// Default stabilizer parameters
pub const DEFAULT_MOVE_GAIN: f64 = 1.0;
pub const DEFAULT_DEPTH_SENSITIVITY: f64 = 5.0;
pub const DEFAULT_BASE_DEPTH: f64 = 2.0;
pub const DEFAULT_SMOOTHING: f64 = 0.3;

/// Default clipping planes
pub const DEFAULT_NEAR: f64 = 0.05;
pub const DEFAULT_FAR: f64 = 100.0;

/// Default illusion shape parameters (world units)
pub const DEFAULT_LATERAL_SIZE: f64 = 0.6;
pub const DEFAULT_DEPTH: f64 = 0.6;

/// Default viewport
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 720;

/// Default frames per second for the render loop
pub const DEFAULT_FPS: u32 = 60;

/// Default window sizes for the alternative depth filters
pub const DEFAULT_MOVING_AVERAGE_WINDOW: usize = 5;
pub const DEFAULT_MEDIAN_WINDOW: usize = 5;
