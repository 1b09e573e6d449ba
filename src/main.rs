//! Face alignment capture: guide a face into the target region and capture a square still.

use anyhow::{bail, Context, Result};
use clap::Parser;
use face_align_capture::app::{AppConfig, GuideApp, InputSource};
use face_align_capture::config::{Config, Preset, EXAMPLE_CONFIG};
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Preset guide layout (standard, ellipse, multi_face, high_resolution)
    #[arg(short, long)]
    preset: Option<Preset>,

    /// Landmark trace to replay (YAML format)
    #[arg(short, long)]
    trace: Option<PathBuf>,

    /// Camera index to use
    #[cfg(feature = "camera")]
    #[arg(long)]
    camera: Option<i32>,

    /// Encoded still image used when capturing from a trace
    #[arg(short, long)]
    still: Option<PathBuf>,

    /// Where to write the accepted square image
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Capture on the first aligned frame and accept the result
    #[arg(short, long)]
    auto_capture: bool,

    /// Refresh rate override
    #[arg(long)]
    fps: Option<u32>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,
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

    info!("Face Alignment Capture");

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => Config::default(),
    };
    if let Some(preset) = args.preset {
        info!("Applying preset {preset}");
        if args.config.is_some() {
            warn!("Preset replaces the alignment and capture sections of the config file");
        }
        config = config.with_preset(preset);
    }
    if let Some(fps) = args.fps {
        config.scheduler.target_fps = fps;
    }
    config.validate()?;

    let input = select_input(&args)?;
    let app_config = AppConfig {
        config,
        input,
        still: args.still,
        output: args.output,
        auto_capture: args.auto_capture,
    };

    let mut app = GuideApp::new(app_config)?;
    let summary = app.run()?;
    info!(
        "Finished in phase {} ({:.1} fps, {} detector errors)",
        summary.phase, summary.stats.fps, summary.stats.detector_errors
    );

    Ok(())
}

fn select_input(args: &Args) -> Result<InputSource> {
    #[cfg(feature = "camera")]
    if let Some(index) = args.camera {
        if args.trace.is_some() {
            bail!("--camera and --trace are mutually exclusive");
        }
        return Ok(InputSource::Camera(index));
    }

    match &args.trace {
        Some(path) => Ok(InputSource::Trace(path.clone())),
        None => bail!("no input given; pass --trace <FILE>"),
    }
}
