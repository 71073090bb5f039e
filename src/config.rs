//! Configuration management for the diorama application

use crate::{
    constants::{
        DEFAULT_BASE_DEPTH, DEFAULT_DEPTH, DEFAULT_DEPTH_SENSITIVITY, DEFAULT_FAR, DEFAULT_FPS, DEFAULT_LATERAL_SIZE,
        DEFAULT_MIN_EYE_DISTANCE, DEFAULT_MOVE_GAIN, DEFAULT_NEAR, DEFAULT_SMOOTHING, DEFAULT_VIEWPORT_HEIGHT,
        DEFAULT_VIEWPORT_WIDTH,
    },
    filters::{create_filter, DepthFilter},
    geometry::IllusionMode,
    stabilizer::StabilizerParams,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tracking input configuration
    pub tracking: TrackingConfig,

    /// Head signal stabilization
    pub stabilizer: StabilizerConfig,

    /// Clipping planes
    pub projection: ProjectionConfig,

    /// Illusion shape
    pub illusion: IllusionConfig,

    /// Viewport and frame pacing
    pub display: DisplayConfig,

    /// Backdrop texture
    pub texture: TextureConfig,
}

/// Tracking input configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Flip the horizontal axis (set for mirrored capture feeds)
    pub invert_x: bool,

    /// Flip the vertical axis
    pub invert_y: bool,

    /// Filter applied to raw depth before smoothing (`none`, `median:5`, `moving_average:3`)
    pub depth_prefilter: String,
}

/// Head signal stabilization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Lateral gain
    pub move_gain: f64,

    /// World depth per unit of depth proxy
    pub depth_sensitivity: f64,

    /// Eye distance at a zero depth proxy
    pub base_depth: f64,

    /// Exponential smoothing factor for depth, in (0, 1]
    pub smoothing: f64,

    /// Smallest eye distance allowed
    pub min_eye_distance: f64,
}

/// Clipping planes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub near: f64,
    pub far: f64,
}

/// Illusion shape parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IllusionConfig {
    /// Initial mode
    pub mode: IllusionMode,

    /// Side length of the box or aperture (world units)
    pub lateral_size: f64,

    /// How far the shape extends from the screen (world units)
    pub depth: f64,
}

/// Viewport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,

    /// Target framerate of the render loop
    pub target_fps: u32,
}

/// Backdrop texture configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureConfig {
    /// Image loaded at startup
    pub path: Option<PathBuf>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            invert_x: false,
            invert_y: false,
            depth_prefilter: "none".to_string(),
        }
    }
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            move_gain: DEFAULT_MOVE_GAIN,
            depth_sensitivity: DEFAULT_DEPTH_SENSITIVITY,
            base_depth: DEFAULT_BASE_DEPTH,
            smoothing: DEFAULT_SMOOTHING,
            min_eye_distance: DEFAULT_MIN_EYE_DISTANCE,
        }
    }
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        }
    }
}

impl Default for IllusionConfig {
    fn default() -> Self {
        Self {
            mode: IllusionMode::Protrude,
            lateral_size: DEFAULT_LATERAL_SIZE,
            depth: DEFAULT_DEPTH,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_VIEWPORT_WIDTH,
            height: DEFAULT_VIEWPORT_HEIGHT,
            target_fps: DEFAULT_FPS,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Stabilizer parameters from the tracking and stabilizer sections
    pub fn stabilizer_params(&self) -> StabilizerParams {
        StabilizerParams {
            move_gain: self.stabilizer.move_gain,
            depth_sensitivity: self.stabilizer.depth_sensitivity,
            base_depth: self.stabilizer.base_depth,
            smoothing: self.stabilizer.smoothing,
            min_eye_distance: self.stabilizer.min_eye_distance,
            invert_x: self.tracking.invert_x,
            invert_y: self.tracking.invert_y,
        }
    }

    /// Create the depth pre-filter from configuration
    pub fn create_prefilter(&self) -> Result<Box<dyn DepthFilter>> {
        create_filter(&self.tracking.depth_prefilter)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.stabilizer_params()
            .validate()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        if !(self.projection.near > 0.0) {
            return Err(Error::ConfigError("Near plane must be greater than 0".to_string()));
        }
        if !(self.projection.far > self.projection.near) {
            return Err(Error::ConfigError("Far plane must be beyond the near plane".to_string()));
        }

        if !(self.illusion.lateral_size > 0.0 && self.illusion.lateral_size.is_finite()) {
            return Err(Error::ConfigError("Lateral size must be greater than 0".to_string()));
        }
        if !(self.illusion.depth > 0.0 && self.illusion.depth.is_finite()) {
            return Err(Error::ConfigError("Illusion depth must be greater than 0".to_string()));
        }
        // The front face has to stay beyond the near plane at rest
        if self.illusion.mode == IllusionMode::Protrude
            && self.illusion.depth + self.projection.near >= self.stabilizer.base_depth
        {
            return Err(Error::ConfigError(format!(
                "Illusion depth {} reaches the eye at base depth {}",
                self.illusion.depth, self.stabilizer.base_depth
            )));
        }

        if self.display.width == 0 || self.display.height == 0 {
            return Err(Error::ConfigError("Viewport must be non-empty".to_string()));
        }
        if self.display.target_fps == 0 {
            return Err(Error::ConfigError("Target FPS must be greater than 0".to_string()));
        }

        self.create_prefilter()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        if let Some(path) = &self.texture.path {
            if !path.exists() {
                return Err(Error::ConfigError(format!("Texture not found: {}", path.display())));
            }
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Parallax Diorama Configuration

# Tracking input
tracking:
  invert_x: false
  invert_y: false
  depth_prefilter: "none"

# Head signal stabilization
stabilizer:
  move_gain: 1.0
  depth_sensitivity: 5.0
  base_depth: 2.0
  smoothing: 0.3
  min_eye_distance: 0.2

# Clipping planes
projection:
  near: 0.05
  far: 100.0

# Illusion shape (world units, the screen is 2.0 tall)
illusion:
  mode: protrude
  lateral_size: 0.6
  depth: 0.6

# Viewport and frame pacing
display:
  width: 1280
  height: 720
  target_fps: 60

# Backdrop texture
texture:
  path: ~
"#;
