//! Frame orchestrator: the per-frame loop tying tracking, stabilization,
//! projection, geometry and rendering together.

use crate::{
    config::Config,
    error::{Error, Result},
    geometry::{GeometryManager, IllusionGeometry, IllusionMode},
    projection::{solve, CameraPose, Frustum, ScreenGeometry},
    renderer::SceneRenderer,
    stabilizer::{CalibrationOffset, HeadSample, StabilizedHead, Stabilizer, StabilizerParams},
    texture::{project_geometry, Texture, TextureSlot},
    tracking::SampleSource,
};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Numeric parameters exposed to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    LateralSize,
    Depth,
    MoveGain,
    DepthSensitivity,
    Smoothing,
    BaseDepth,
}

impl FromStr for Parameter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "lateral_size" | "size" => Ok(Self::LateralSize),
            "depth" => Ok(Self::Depth),
            "move_gain" | "gain" => Ok(Self::MoveGain),
            "depth_sensitivity" => Ok(Self::DepthSensitivity),
            "smoothing" | "smoothing_factor" => Ok(Self::Smoothing),
            "base_depth" => Ok(Self::BaseDepth),
            other => Err(Error::InvalidInput(format!("Unknown parameter: {other}"))),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LateralSize => "lateral_size",
            Self::Depth => "depth",
            Self::MoveGain => "move_gain",
            Self::DepthSensitivity => "depth_sensitivity",
            Self::Smoothing => "smoothing",
            Self::BaseDepth => "base_depth",
        };
        write!(f, "{name}")
    }
}

/// UI actions, applied on the loop thread
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetMode(IllusionMode),
    SetParameter(Parameter, f64),
    /// Treat the current head position as neutral
    Calibrate,
    /// Encoded image bytes for the backdrop
    LoadTexture(Vec<u8>),
    /// Viewport size in pixels
    Resize { width: u32, height: u32 },
}

/// Snapshot of the loop state after a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStatus {
    pub frame: u64,
    pub offset: CalibrationOffset,
    pub head: StabilizedHead,
    pub frustum: Frustum,
    pub pose: CameraPose,
    /// Whether this tick consumed a new tracking sample
    pub fresh_sample: bool,
    pub fps: f64,
}

/// Main application struct
pub struct DioramaApp<S: SampleSource, R: SceneRenderer> {
    source: S,
    renderer: R,
    stabilizer: Stabilizer,
    geometry: GeometryManager,
    texture: TextureSlot,
    screen: ScreenGeometry,
    near: f64,
    far: f64,
    target_fps: u32,
    offset: CalibrationOffset,
    head: StabilizedHead,
    last_sample: Option<HeadSample>,
    frustum: Frustum,
    pose: CameraPose,
    pending: VecDeque<Command>,
    frame_count: u64,
    fresh_sample: bool,
    fps: f64,
    started: Instant,
}

impl<S: SampleSource, R: SceneRenderer> DioramaApp<S, R> {
    /// Create the application from a validated configuration
    ///
    /// The sample source must already be open; capture failures are reported
    /// by its constructor before any frame is rendered.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the texture cannot be loaded
    pub fn new(config: &Config, source: S, mut renderer: R) -> Result<Self> {
        info!("Initializing diorama application");
        config.validate()?;

        let stabilizer = Stabilizer::with_prefilter(config.stabilizer_params(), config.create_prefilter()?)?;
        let screen = ScreenGeometry::from_viewport(config.display.width, config.display.height)?;
        let geometry = GeometryManager::new(
            config.illusion.mode,
            config.illusion.lateral_size,
            config.illusion.depth,
            &screen,
        )?;

        let texture = match &config.texture.path {
            Some(path) => {
                info!("Loading backdrop texture from {}", path.display());
                TextureSlot::new(Texture::from_file(path)?)
            }
            None => TextureSlot::default(),
        };

        let head = StabilizedHead::centered(stabilizer.params().eye_distance(0.0));
        let (frustum, pose) = solve(&head, &screen, config.projection.near, config.projection.far)?;

        renderer.upload_scene(&project_geometry(geometry.current()), geometry.generation());
        renderer.bind_texture(texture.current(), texture.revision());
        renderer.set_camera(&frustum, &pose);

        Ok(Self {
            source,
            renderer,
            stabilizer,
            geometry,
            texture,
            screen,
            near: config.projection.near,
            far: config.projection.far,
            target_fps: config.display.target_fps,
            offset: CalibrationOffset::default(),
            head,
            last_sample: None,
            frustum,
            pose,
            pending: VecDeque::new(),
            frame_count: 0,
            fresh_sample: false,
            fps: 0.0,
            started: Instant::now(),
        })
    }

    /// Queue a command for the start of the next tick
    pub fn queue(&mut self, command: Command) {
        self.pending.push_back(command);
    }

    /// Apply a command now
    ///
    /// Failed commands leave the previous state in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the command carries an invalid value
    pub fn apply(&mut self, command: Command) -> Result<()> {
        match command {
            Command::SetMode(mode) => {
                info!("Switching illusion to {mode}");
                self.geometry.set_mode(mode)?;
                self.upload_geometry();
            }
            Command::SetParameter(parameter, value) => self.set_parameter(parameter, value)?,
            Command::Calibrate => self.calibrate(),
            Command::LoadTexture(bytes) => {
                self.texture.replace(&bytes)?;
                self.renderer.bind_texture(self.texture.current(), self.texture.revision());
                // Re-project so the new image lines up with the current geometry
                self.upload_geometry();
            }
            Command::Resize { width, height } => {
                let screen = ScreenGeometry::from_viewport(width, height)?;
                self.renderer.resize(width, height)?;
                self.geometry.resize(&screen)?;
                self.screen = screen;
                info!("Viewport resized to {width}x{height}");
                self.upload_geometry();
                self.update_camera()?;
            }
        }
        Ok(())
    }

    fn set_parameter(&mut self, parameter: Parameter, value: f64) -> Result<()> {
        debug!("Setting {parameter} to {value}");
        match parameter {
            Parameter::LateralSize => {
                self.geometry.set_lateral_size(value)?;
                self.upload_geometry();
            }
            Parameter::Depth => {
                self.geometry.set_depth(value)?;
                self.upload_geometry();
            }
            Parameter::MoveGain | Parameter::DepthSensitivity | Parameter::Smoothing | Parameter::BaseDepth => {
                let mut params: StabilizerParams = *self.stabilizer.params();
                match parameter {
                    Parameter::MoveGain => params.move_gain = value,
                    Parameter::DepthSensitivity => params.depth_sensitivity = value,
                    Parameter::Smoothing => params.smoothing = value,
                    _ => params.base_depth = value,
                }
                self.stabilizer.set_params(params)?;
            }
        }
        Ok(())
    }

    /// Use the latest sample as the neutral position
    ///
    /// Lateral axes re-center to zero at once; depth is untouched.
    pub fn calibrate(&mut self) {
        let Some(sample) = self.last_sample else {
            warn!("Calibration requested before any head sample arrived");
            return;
        };
        self.offset = CalibrationOffset::from_sample(&sample);
        self.head = self.stabilizer.recenter(&sample, &self.offset, &self.head);
        info!("Calibrated neutral position to ({:.3}, {:.3})", self.offset.x, self.offset.y);
        if let Err(e) = self.update_camera() {
            warn!("Camera update after calibration failed: {e}");
        }
    }

    fn upload_geometry(&mut self) {
        let scene = project_geometry(self.geometry.current());
        self.renderer.upload_scene(&scene, self.geometry.generation());
    }

    fn update_camera(&mut self) -> Result<()> {
        let (frustum, pose) = solve(&self.head, &self.screen, self.near, self.far)?;
        self.frustum = frustum;
        self.pose = pose;
        self.renderer.set_camera(&frustum, &pose);
        Ok(())
    }

    /// Run one frame: commands, tracking, camera, render
    ///
    /// # Errors
    ///
    /// Returns an error only if the renderer fails; bad commands are logged and skipped
    pub fn tick(&mut self) -> Result<FrameStatus> {
        while let Some(command) = self.pending.pop_front() {
            if let Err(e) = self.apply(command) {
                warn!("Ignoring command: {e}");
            }
        }

        self.fresh_sample = false;
        if let Some(sample) = self.source.poll_latest().filter(HeadSample::is_finite) {
            self.head = self.stabilizer.update(&sample, &self.offset, &self.head);
            self.last_sample = Some(sample);
            self.fresh_sample = true;
            self.update_camera()?;
        }

        self.renderer.render()?;
        self.frame_count += 1;

        Ok(self.status())
    }

    /// Run the loop at the target frame rate
    ///
    /// Stops after `max_frames` ticks when given, otherwise runs until an error.
    ///
    /// # Errors
    ///
    /// Returns the first renderer error
    #[allow(clippy::cast_precision_loss)]
    pub fn run(&mut self, max_frames: Option<u64>) -> Result<()> {
        info!("Starting render loop at {} fps", self.target_fps);

        let frame_budget = Duration::from_secs_f64(1.0 / f64::from(self.target_fps));
        let mut window_start = Instant::now();
        let mut window_frames = 0u64;
        self.started = Instant::now();

        loop {
            if max_frames.is_some_and(|max| self.frame_count >= max) {
                break;
            }
            let tick_start = Instant::now();
            let status = self.tick()?;

            window_frames += 1;
            if window_start.elapsed() >= Duration::from_secs(1) {
                self.fps = window_frames as f64 / window_start.elapsed().as_secs_f64();
                info!(
                    "FPS: {:.1}, head ({:.2}, {:.2}, {:.2})",
                    self.fps, status.head.x, status.head.y, status.head.z
                );
                window_start = Instant::now();
                window_frames = 0;
            }

            if let Some(rest) = frame_budget.checked_sub(tick_start.elapsed()) {
                std::thread::sleep(rest);
            }
        }

        info!(
            "Render loop finished after {} frames in {:.2}s",
            self.frame_count,
            self.started.elapsed().as_secs_f64()
        );
        Ok(())
    }

    pub fn status(&self) -> FrameStatus {
        FrameStatus {
            frame: self.frame_count,
            offset: self.offset,
            head: self.head,
            frustum: self.frustum,
            pose: self.pose,
            fresh_sample: self.fresh_sample,
            fps: self.fps,
        }
    }

    pub fn geometry(&self) -> &IllusionGeometry {
        self.geometry.current()
    }

    pub fn screen(&self) -> &ScreenGeometry {
        &self.screen
    }

    pub fn texture(&self) -> &Texture {
        self.texture.current()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}
