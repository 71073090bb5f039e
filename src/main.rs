//! Headless diorama preview: drives a scripted head path through the full
//! pipeline and writes wireframe snapshots.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use parallax_diorama::{
    app::{Command, DioramaApp},
    config::{Config, EXAMPLE_CONFIG},
    geometry::IllusionMode,
    renderer::WireframeRenderer,
    tracking::ScriptedSource,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Illusion mode (protrude, recede)
    #[arg(short, long)]
    mode: Option<IllusionMode>,

    /// Number of frames to render
    #[arg(short, long, default_value = "240")]
    frames: u64,

    /// Viewport width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Viewport height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Backdrop image
    #[arg(short, long)]
    texture: Option<PathBuf>,

    /// Directory for PNG snapshots
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Save every Nth frame
    #[arg(long, default_value = "30")]
    snapshot_every: u64,

    /// Frame at which to calibrate the neutral head position
    #[arg(long)]
    calibrate_at: Option<u64>,

    /// Lateral sweep amplitude as a fraction of the frame
    #[arg(long, default_value = "0.15")]
    amplitude: f64,

    /// Print an example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    info!("Parallax Diorama");

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).with_context(|| format!("Failed to load {}", path.display()))?
        }
        None => Config::default(),
    };
    if let Some(mode) = args.mode {
        config.illusion.mode = mode;
    }
    if let Some(width) = args.width {
        config.display.width = width;
    }
    if let Some(height) = args.height {
        config.display.height = height;
    }
    if args.texture.is_some() {
        config.texture.path = args.texture.clone();
    }
    config.validate().context("Invalid configuration")?;

    if let Some(dir) = &args.output {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let frames_per_sweep = usize::try_from(config.display.target_fps.saturating_mul(4)).unwrap_or(240);
    let source = ScriptedSource::sweep(frames_per_sweep, args.amplitude)?;
    let renderer = WireframeRenderer::new(config.display.width, config.display.height)?;
    let mut app = DioramaApp::new(&config, source, renderer)?;

    let snapshot_every = args.snapshot_every.max(1);
    for frame in 0..args.frames {
        if args.calibrate_at == Some(frame) {
            app.queue(Command::Calibrate);
        }
        let status = app.tick()?;

        if let Some(dir) = &args.output {
            if frame % snapshot_every == 0 {
                let path = dir.join(format!("frame_{frame:05}.png"));
                if let Err(e) = app.renderer().save_png(&path) {
                    warn!("Failed to save {}: {e}", path.display());
                }
            }
        }

        log::debug!(
            "frame {} head ({:.3}, {:.3}, {:.3}) frustum [{:.4}, {:.4}] x [{:.4}, {:.4}]",
            status.frame,
            status.head.x,
            status.head.y,
            status.head.z,
            status.frustum.left,
            status.frustum.right,
            status.frustum.bottom,
            status.frustum.top
        );
    }

    let status = app.status();
    info!(
        "Rendered {} frames in {} mode; final eye ({:.3}, {:.3}, {:.3})",
        status.frame,
        app.geometry().mode,
        status.head.x,
        status.head.y,
        status.head.z
    );

    Ok(())
}
