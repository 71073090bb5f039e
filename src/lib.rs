//! Head-tracked off-axis projection for a "physical diorama" illusion.
//!
//! A flat display is treated as a window: the viewer's head position drives
//! an asymmetric frustum so a box seems to stick out of the screen, or a
//! cavity seems to sink into it, while a backdrop image stays registered
//! across the shape's walls.
//!
//! The per-frame pipeline is:
//! 1. Poll the latest head sample without blocking
//! 2. Stabilize it (calibration offset, gain, depth smoothing)
//! 3. Solve the off-axis frustum and camera pose
//! 4. Render the current scene
//!
//! Geometry is rebuilt only when the mode, size, depth or viewport changes.
//!
//! # Examples
//!
//! ## Solving a frame by hand
//!
//! ```
//! use parallax_diorama::{
//!     projection::{solve, ScreenGeometry},
//!     stabilizer::{stabilize, CalibrationOffset, HeadSample, StabilizerParams},
//! };
//!
//! # fn main() -> parallax_diorama::Result<()> {
//! let screen = ScreenGeometry::from_viewport(1920, 1080)?;
//! let params = StabilizerParams::default();
//!
//! let raw = HeadSample::new(0.55, 0.48, -0.05)?;
//! let head = stabilize(&raw, &CalibrationOffset::default(), 0.0, &params);
//!
//! let (frustum, pose) = solve(&head, &screen, 0.05, 100.0)?;
//! assert!(frustum.left < frustum.right);
//! println!("eye at {:?}", pose.position);
//! # Ok(())
//! # }
//! ```
//!
//! ## Running the frame loop
//!
//! ```no_run
//! use parallax_diorama::{
//!     app::{Command, DioramaApp},
//!     config::Config,
//!     geometry::IllusionMode,
//!     renderer::WireframeRenderer,
//!     tracking::ScriptedSource,
//! };
//!
//! # fn main() -> parallax_diorama::Result<()> {
//! let config = Config::default();
//! let source = ScriptedSource::sweep(240, 0.15)?;
//! let renderer = WireframeRenderer::new(config.display.width, config.display.height)?;
//!
//! let mut app = DioramaApp::new(&config, source, renderer)?;
//! app.queue(Command::SetMode(IllusionMode::Recede));
//! app.run(Some(600))?;
//! # Ok(())
//! # }
//! ```

/// Frame orchestrator and UI command set
pub mod app;

/// Configuration management
pub mod config;

/// Constants used throughout the application
pub mod constants;

/// Error types and result handling
pub mod error;

/// Depth pre-filters
pub mod filters;

/// Protruding box and receding cavity geometry
pub mod geometry;

/// Off-axis frustum and camera pose
pub mod projection;

/// Render collaborator seam and wireframe preview
pub mod renderer;

/// Head signal stabilization and calibration
pub mod stabilizer;

/// Screen-space UV projection and backdrop texture
pub mod texture;

/// Capture, landmark and sample-source seams
pub mod tracking;

pub use error::{Error, Result};
