//! Headless host application: feeds refresh signals into a session, reports
//! guidance changes and optionally captures, accepts and writes the image.

use crate::{
    alignment::Guidance,
    capture::CapturedImage,
    config::Config,
    error::{Error, Result},
    landmarks::LandmarkSource,
    replay::{LandmarkTrace, ReplayDetector, ReplayVideo},
    scheduler::{FixedRateRefresh, RefreshSignal, SchedulerStats},
    session::{Phase, SessionStateMachine},
    video::{FileStillCapture, StillCapture, VideoSource},
};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Alignment, capture and scheduler settings
    pub config: Config,
    /// Where frames and detections come from
    pub input: InputSource,
    /// Encoded still used for captures from a trace
    pub still: Option<PathBuf>,
    /// Where to write the accepted image
    pub output: Option<PathBuf>,
    /// Capture on the first aligned verdict and accept the result
    pub auto_capture: bool,
}

/// Frame and landmark input
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// Recorded landmark trace (YAML)
    Trace(PathBuf),
    /// Webcam index, detector from the ONNX models
    #[cfg(feature = "camera")]
    Camera(i32),
}

/// What a run ended with
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub phase: Phase,
    pub stats: SchedulerStats,
    pub image: Option<CapturedImage>,
}

/// Main application struct
pub struct GuideApp {
    config: AppConfig,
    session: SessionStateMachine,
    still: Option<Box<dyn StillCapture>>,
    refresh: Box<dyn RefreshSignal>,
}

impl GuideApp {
    /// Create the application, pacing refreshes at the configured frame rate
    pub fn new(config: AppConfig) -> Result<Self> {
        let refresh = Box::new(FixedRateRefresh::new(config.config.scheduler.target_fps));
        Self::with_refresh(config, refresh)
    }

    /// Create the application with a custom refresh signal
    pub fn with_refresh(config: AppConfig, refresh: Box<dyn RefreshSignal>) -> Result<Self> {
        info!("Initializing face alignment capture");
        config.config.validate()?;

        let (video, loader, mut still) = open_input(&config)?;
        if let Some(path) = &config.still {
            info!("Using still image {}", path.display());
            still = Some(Box::new(FileStillCapture::new(path)));
        }
        if config.auto_capture && still.is_none() {
            return Err(Error::ConfigError(
                "auto capture needs a still source; pass a still image".to_string(),
            ));
        }

        let mut session = SessionStateMachine::new(&config.config, video);
        session.load_detector(loader)?;

        Ok(Self {
            config,
            session,
            still,
            refresh,
        })
    }

    pub fn session(&self) -> &SessionStateMachine {
        &self.session
    }

    /// Run the refresh loop until capture is accepted, the input ends or the
    /// refresh signal stops
    pub fn run(&mut self) -> Result<RunSummary> {
        info!("Starting refresh loop");
        let mut last_guidance: Option<Guidance> = None;
        let mut image = None;

        while let Some(timestamp_ms) = self.refresh.next_frame() {
            self.session.on_refresh(timestamp_ms);

            if let Some(verdict) = self.session.last_verdict() {
                let guidance = verdict.guidance();
                if last_guidance != Some(guidance) {
                    info!("Guidance: {guidance:?}");
                    last_guidance = Some(guidance);
                }
            }

            if self.config.auto_capture && self.session.can_capture() {
                if let Some(still) = self.still.as_mut() {
                    if let Err(e) = self.session.capture(still.as_mut()) {
                        warn!("Capture attempt failed, will retry: {e}");
                    }
                }
            }

            if self.session.phase() == Phase::Captured && self.config.auto_capture {
                let accepted = self.session.accept()?;
                self.write_output(&accepted)?;
                image = Some(accepted);
                break;
            }

            if self.session.video_exhausted() {
                info!("End of input reached");
                break;
            }
        }

        let stats = self.session.scheduler_stats().clone();
        info!(
            "Session ended in phase {} after {} ticks, {} verdicts",
            self.session.phase(),
            stats.ticks,
            stats.published
        );
        self.session.shutdown();

        Ok(RunSummary {
            phase: self.session.phase(),
            stats,
            image,
        })
    }

    fn write_output(&self, image: &CapturedImage) -> Result<()> {
        match &self.config.output {
            Some(path) => {
                std::fs::write(path, &image.data)?;
                info!("Wrote {}x{} {} to {}", image.width, image.height, image.mime_type(), path.display());
            }
            None => info!("Accepted {} bytes; no output path given", image.data.len()),
        }
        Ok(())
    }
}

type DetectorLoader = Box<dyn FnOnce() -> Result<Box<dyn LandmarkSource>>>;
type OpenedInput = (Box<dyn VideoSource>, DetectorLoader, Option<Box<dyn StillCapture>>);

fn open_input(config: &AppConfig) -> Result<OpenedInput> {
    match &config.input {
        InputSource::Trace(path) => {
            info!("Replaying landmark trace {}", path.display());
            let trace = Arc::new(LandmarkTrace::from_file(path)?);
            info!("Trace has {} frames", trace.len());
            let video = Box::new(ReplayVideo::new(trace.clone()));
            let loader: DetectorLoader = Box::new(move || Ok(Box::new(ReplayDetector::new(trace)) as Box<dyn LandmarkSource>));
            Ok((video, loader, None))
        }
        #[cfg(feature = "camera")]
        InputSource::Camera(index) => {
            let camera = crate::camera::CameraSource::open(*index)?;
            let still = Box::new(camera.still_handle());
            let detector_config = config.config.detector.clone();
            let loader: DetectorLoader = Box::new(move || load_onnx_detector(&detector_config));
            Ok((Box::new(camera), loader, Some(still)))
        }
    }
}

#[cfg(all(feature = "camera", feature = "onnx"))]
fn load_onnx_detector(config: &crate::config::DetectorConfig) -> Result<Box<dyn LandmarkSource>> {
    Ok(Box::new(crate::onnx_landmarks::OnnxLandmarkSource::new(config)?))
}

#[cfg(all(feature = "camera", not(feature = "onnx")))]
fn load_onnx_detector(_config: &crate::config::DetectorConfig) -> Result<Box<dyn LandmarkSource>> {
    Err(Error::DetectorInit(
        "camera input needs a landmark model; rebuild with the onnx feature".to_string(),
    ))
}
