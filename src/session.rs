//! Session state machine tying detector, scheduler and capture together.
//!
//! ```text
//! Initializing ─(detector loaded + source ready)─▶ Ready
//! Ready ◀─▶ Aligned ◀─▶ Unaligned            (every published verdict)
//! Aligned ─(capture)─▶ Capturing ─(ok)─▶ Captured
//!                          └─(err)─▶ previous phase
//! Captured ─(retake)─▶ Ready
//! Captured ─(accept)─▶ Accepted              (terminal)
//! ```
//!
//! [`SessionStateMachine`] is the only writer of [`CaptureSession`]. The
//! scheduler publishes verdicts into it through [`VerdictSink`].

use crate::alignment::{AlignmentEvaluator, AlignmentVerdict};
use crate::capture::{CaptureService, CapturedImage};
use crate::config::Config;
use crate::landmarks::{DetectorHandle, LandmarkSource};
use crate::scheduler::{FrameScheduler, SchedulerStats, TickContext, TickOutcome, VerdictSink};
use crate::video::{StillCapture, VideoSource};
use crate::{Error, Result};
use log::{debug, error, info, warn};
use std::fmt;

/// User-visible session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Detector not loaded or source not ready; nothing runs
    Initializing,
    /// Scheduler running, no verdict yet
    Ready,
    Aligned,
    Unaligned,
    /// Still requested, waiting for decode and crop
    Capturing,
    /// Captured image held; scheduler stopped
    Captured,
    /// Image handed to the caller; terminal
    Accepted,
}

impl Phase {
    /// Phases in which the scheduler runs and verdicts drive the phase.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Ready | Self::Aligned | Self::Unaligned)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Aligned => "aligned",
            Self::Unaligned => "unaligned",
            Self::Capturing => "capturing",
            Self::Captured => "captured",
            Self::Accepted => "accepted",
        };
        f.write_str(name)
    }
}

/// Mutable session state, read by the render layer.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSession {
    phase: Phase,
    last_verdict: Option<AlignmentVerdict>,
    captured_image: Option<CapturedImage>,
}

impl CaptureSession {
    fn new() -> Self {
        Self {
            phase: Phase::Initializing,
            last_verdict: None,
            captured_image: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_verdict(&self) -> Option<&AlignmentVerdict> {
        self.last_verdict.as_ref()
    }

    /// Present only in [`Phase::Captured`].
    pub fn captured_image(&self) -> Option<&CapturedImage> {
        self.captured_image.as_ref()
    }
}

impl VerdictSink for CaptureSession {
    fn publish(&mut self, tick: u64, verdict: &AlignmentVerdict) {
        if !(self.phase.is_live() || self.phase == Phase::Capturing) {
            return;
        }
        if self.last_verdict.as_ref().map(|v| v.reason) != Some(verdict.reason) {
            debug!("Tick {tick}: verdict {} ({} faces)", verdict.reason, verdict.face_count);
        }
        self.last_verdict = Some(verdict.clone());
        if self.phase.is_live() {
            self.phase = if verdict.aligned {
                Phase::Aligned
            } else {
                Phase::Unaligned
            };
        }
    }
}

/// Host-driven transition triggers.
pub enum SessionEvent {
    /// Asynchronous detector initialization finished
    DetectorLoaded(Box<dyn LandmarkSource>),
    /// Detector initialization failed
    DetectorFailed(Error),
    /// The video source fired its ready event
    SourceReady,
    /// Display refresh at the given timestamp in milliseconds
    Refresh(f64),
    /// User asked to capture; the host then requests and decodes a still
    BeginCapture,
    /// The host finished (or failed) producing the captured image
    CaptureFinished(Result<CapturedImage>),
    Retake,
    Accept,
}

/// Top-level controller of one capture session.
pub struct SessionStateMachine {
    session: CaptureSession,
    detector: Option<DetectorHandle>,
    video: Box<dyn VideoSource>,
    source_ready: bool,
    scheduler: FrameScheduler,
    evaluator: AlignmentEvaluator,
    capture_service: CaptureService,
    init_error: Option<String>,
    phase_before_capture: Option<Phase>,
}

impl SessionStateMachine {
    /// Create a session in [`Phase::Initializing`] reading from `video`.
    pub fn new(config: &Config, video: Box<dyn VideoSource>) -> Self {
        Self {
            session: CaptureSession::new(),
            detector: None,
            video,
            source_ready: false,
            scheduler: FrameScheduler::new(config.scheduler.clone()),
            evaluator: AlignmentEvaluator::new(config.alignment.clone()),
            capture_service: CaptureService::new(config.capture.clone()),
            init_error: None,
            phase_before_capture: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn last_verdict(&self) -> Option<&AlignmentVerdict> {
        self.session.last_verdict()
    }

    pub fn captured_image(&self) -> Option<&CapturedImage> {
        self.session.captured_image()
    }

    /// Message of the last detector initialization failure, if any.
    pub fn init_error(&self) -> Option<&str> {
        self.init_error.as_deref()
    }

    pub fn is_detector_loaded(&self) -> bool {
        self.detector.as_ref().is_some_and(|d| !d.is_closed())
    }

    /// Capture is only permitted while the latest verdict is aligned.
    pub fn can_capture(&self) -> bool {
        self.session.phase == Phase::Aligned && self.session.last_verdict.as_ref().is_some_and(|v| v.aligned)
    }

    pub fn is_scheduler_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn scheduler_stats(&self) -> &SchedulerStats {
        self.scheduler.stats()
    }

    pub fn video_exhausted(&self) -> bool {
        self.video.is_exhausted()
    }

    /// Dispatch a host event.
    ///
    /// Only [`SessionEvent::Accept`] yields an image: the one handed to the caller.
    pub fn handle(&mut self, event: SessionEvent) -> Result<Option<CapturedImage>> {
        match event {
            SessionEvent::DetectorLoaded(source) => self.detector_loaded(source)?,
            SessionEvent::DetectorFailed(e) => self.detector_failed(&e),
            SessionEvent::SourceReady => self.source_ready(),
            SessionEvent::Refresh(timestamp_ms) => {
                self.on_refresh(timestamp_ms);
            }
            SessionEvent::BeginCapture => self.begin_capture()?,
            SessionEvent::CaptureFinished(result) => self.finish_capture(result)?,
            SessionEvent::Retake => self.retake()?,
            SessionEvent::Accept => return self.accept().map(Some),
        }
        Ok(None)
    }

    /// Run a detector loader. Can be retried while the session is still initializing.
    pub fn load_detector<F>(&mut self, loader: F) -> Result<()>
    where
        F: FnOnce() -> Result<Box<dyn LandmarkSource>>,
    {
        if self.session.phase != Phase::Initializing {
            return Err(Error::InvalidTransition(format!(
                "cannot load a detector while {}",
                self.session.phase
            )));
        }
        match loader() {
            Ok(source) => self.detector_loaded(source),
            Err(e) => {
                self.detector_failed(&e);
                Err(Error::DetectorInit(e.to_string()))
            }
        }
    }

    fn detector_loaded(&mut self, source: Box<dyn LandmarkSource>) -> Result<()> {
        if self.session.phase != Phase::Initializing {
            return Err(Error::InvalidTransition(format!(
                "detector loaded while {}",
                self.session.phase
            )));
        }
        if let Some(mut previous) = self.detector.take() {
            previous.release();
        }
        self.detector = Some(DetectorHandle::new(source));
        self.init_error = None;
        self.try_enter_ready();
        Ok(())
    }

    fn detector_failed(&mut self, e: &Error) {
        error!("Detector failed to load: {e}");
        self.init_error = Some(e.to_string());
    }

    /// Record the source-ready event.
    pub fn source_ready(&mut self) {
        if !self.source_ready {
            info!("Video source '{}' ready", self.video.name());
            self.source_ready = true;
        }
        self.try_enter_ready();
    }

    fn try_enter_ready(&mut self) {
        if self.session.phase == Phase::Initializing && self.source_ready && self.is_detector_loaded() {
            self.set_phase(Phase::Ready);
            self.scheduler.start();
        }
    }

    /// Drive one display refresh.
    pub fn on_refresh(&mut self, timestamp_ms: f64) -> TickOutcome {
        if self.session.phase == Phase::Initializing && !self.source_ready && self.video.is_ready() {
            self.source_ready();
        }

        let Some(detector) = self.detector.as_mut() else {
            return TickOutcome::Idle;
        };
        let before = self.session.phase;
        let outcome = self.scheduler.tick(
            TickContext {
                detector,
                video: self.video.as_mut(),
                evaluator: &self.evaluator,
                sink: &mut self.session,
            },
            timestamp_ms,
        );
        if self.session.phase != before {
            info!("Session phase: {before} -> {}", self.session.phase);
        }
        outcome
    }

    /// Enter [`Phase::Capturing`]. Fails unless the latest verdict is aligned.
    pub fn begin_capture(&mut self) -> Result<()> {
        if !self.can_capture() {
            return Err(Error::CaptureNotPermitted {
                phase: self.session.phase.to_string(),
            });
        }
        self.phase_before_capture = Some(self.session.phase);
        self.set_phase(Phase::Capturing);
        Ok(())
    }

    /// Complete a capture started with [`Self::begin_capture`].
    ///
    /// A successful still is kept even if verdicts went unaligned while it was
    /// decoding: the still was requested under an aligned verdict. On failure the
    /// session resumes the phase of the latest verdict and the error is handed
    /// back; the caller may retry.
    pub fn finish_capture(&mut self, result: Result<CapturedImage>) -> Result<()> {
        if self.session.phase != Phase::Capturing {
            return Err(Error::InvalidTransition(format!(
                "no capture in progress while {}",
                self.session.phase
            )));
        }
        let previous = self.phase_before_capture.take().unwrap_or(Phase::Ready);
        match result {
            Ok(image) => {
                self.scheduler.stop();
                info!(
                    "Captured {}x{} {} ({} bytes)",
                    image.width,
                    image.height,
                    image.mime_type(),
                    image.data.len()
                );
                self.session.captured_image = Some(image);
                self.set_phase(Phase::Captured);
                Ok(())
            }
            Err(e) => {
                warn!("Capture failed: {e}");
                // Ticks keep publishing while capturing; resume from the latest verdict
                let resumed = match self.session.last_verdict.as_ref() {
                    Some(verdict) if verdict.aligned => Phase::Aligned,
                    Some(_) => Phase::Unaligned,
                    None => previous,
                };
                self.set_phase(resumed);
                Err(e)
            }
        }
    }

    /// Capture synchronously from `still`.
    pub fn capture(&mut self, still: &mut dyn StillCapture) -> Result<&CapturedImage> {
        self.begin_capture()?;
        let result = self.capture_service.capture(still);
        self.finish_capture(result)?;
        self.session
            .captured_image
            .as_ref()
            .ok_or_else(|| Error::InvalidTransition("capture finished without an image".to_string()))
    }

    /// Discard the captured image and resume alignment.
    pub fn retake(&mut self) -> Result<()> {
        if self.session.phase != Phase::Captured {
            return Err(Error::InvalidTransition(format!(
                "cannot retake while {}",
                self.session.phase
            )));
        }
        self.session.captured_image = None;
        self.session.last_verdict = None;
        self.set_phase(Phase::Ready);
        self.scheduler.start();
        Ok(())
    }

    /// Hand the captured image to the caller and end the session.
    pub fn accept(&mut self) -> Result<CapturedImage> {
        if self.session.phase != Phase::Captured {
            return Err(Error::InvalidTransition(format!(
                "cannot accept while {}",
                self.session.phase
            )));
        }
        let image = self
            .session
            .captured_image
            .take()
            .ok_or_else(|| Error::InvalidTransition("captured phase without an image".to_string()))?;
        self.set_phase(Phase::Accepted);
        self.shutdown();
        Ok(image)
    }

    /// Stop the scheduler and release the detector. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        self.scheduler.stop();
        if let Some(detector) = self.detector.as_mut() {
            detector.release();
        }
    }

    fn set_phase(&mut self, next: Phase) {
        let previous = self.session.phase;
        if previous != next {
            info!("Session phase: {previous} -> {next}");
            self.session.phase = next;
        }
    }
}

impl Drop for SessionStateMachine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for SessionStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStateMachine")
            .field("session", &self.session)
            .field("detector", &self.detector)
            .field("source_ready", &self.source_ready)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
