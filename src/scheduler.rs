//! Frame scheduling loop.
//!
//! The host fires one refresh signal per display frame and calls
//! [`FrameScheduler::tick`] for it. A tick pulls the current frame, runs the
//! detector, evaluates alignment and publishes the verdict, in that order. The
//! scheduler never blocks waiting for data: anything not ready yet is a skipped
//! tick and the next refresh tries again.
//!
//! Each run owns a [`CancelToken`]. The token is checked when a tick starts and
//! again after the detector returns, so once [`CancelToken::cancel`] returns no
//! further verdict reaches the sink. Starting a new run cancels the previous one.

use crate::alignment::{AlignmentEvaluator, AlignmentVerdict};
use crate::config::SchedulerConfig;
use crate::landmarks::{Detection, DetectorHandle};
use crate::video::VideoSource;
use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellation handle for one scheduler run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Host display refresh signal.
pub trait RefreshSignal {
    /// Wait for the next refresh and return its timestamp in milliseconds,
    /// or `None` when the host stops delivering frames.
    fn next_frame(&mut self) -> Option<f64>;
}

/// Refresh signal paced by the wall clock at a fixed rate.
#[derive(Debug)]
pub struct FixedRateRefresh {
    interval: Duration,
    started: Instant,
    next_deadline: Instant,
}

impl FixedRateRefresh {
    pub fn new(fps: u32) -> Self {
        let interval = Duration::from_secs(1) / fps.max(1);
        let now = Instant::now();
        Self {
            interval,
            started: now,
            next_deadline: now,
        }
    }
}

impl RefreshSignal for FixedRateRefresh {
    fn next_frame(&mut self) -> Option<f64> {
        let now = Instant::now();
        if self.next_deadline > now {
            std::thread::sleep(self.next_deadline - now);
        }
        // Drop missed frames instead of bursting to catch up
        self.next_deadline = self.next_deadline.max(Instant::now()) + self.interval;
        Some(self.started.elapsed().as_secs_f64() * 1000.0)
    }
}

/// Refresh signal replaying a fixed list of timestamps.
#[derive(Debug, Clone, Default)]
pub struct ManualRefresh {
    timestamps: VecDeque<f64>,
}

impl ManualRefresh {
    pub fn new<I: IntoIterator<Item = f64>>(timestamps: I) -> Self {
        Self {
            timestamps: timestamps.into_iter().collect(),
        }
    }

    /// `count` refreshes spaced `interval_ms` apart, starting at zero.
    pub fn evenly_spaced(count: usize, interval_ms: f64) -> Self {
        Self::new((0..count).map(|i| i as f64 * interval_ms))
    }
}

impl RefreshSignal for ManualRefresh {
    fn next_frame(&mut self) -> Option<f64> {
        self.timestamps.pop_front()
    }
}

/// Receiver of published verdicts.
pub trait VerdictSink {
    fn publish(&mut self, tick: u64, verdict: &AlignmentVerdict);
}

impl<F: FnMut(u64, &AlignmentVerdict)> VerdictSink for F {
    fn publish(&mut self, tick: u64, verdict: &AlignmentVerdict) {
        self(tick, verdict);
    }
}

/// Why a tick did no evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The video source has not fired its ready event
    SourceNotReady,
    /// Not enough data buffered to decode a frame
    FrameNotDecodable,
    /// The detector reported the frame as stale
    DetectorNotReady,
    /// The detector failed on this frame
    DetectorError,
    /// Waiting out the backoff after repeated detector failures
    BackingOff,
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The scheduler is not running
    Idle,
    /// The run was cancelled; nothing was published
    Cancelled,
    /// Tick finished without a verdict
    Skipped(SkipReason),
    /// A verdict was published to the sink
    Published { tick: u64, verdict: AlignmentVerdict },
}

/// Collaborators for one tick. Borrowed, never owned, by the scheduler.
pub struct TickContext<'a> {
    pub detector: &'a mut DetectorHandle,
    pub video: &'a mut dyn VideoSource,
    pub evaluator: &'a AlignmentEvaluator,
    pub sink: &'a mut dyn VerdictSink,
}

/// Loop counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub published: u64,
    pub source_not_ready: u64,
    pub frames_not_decodable: u64,
    pub detector_not_ready: u64,
    pub detector_errors: u64,
    pub backoff_skips: u64,
    pub fps: f64,
}

/// Single-threaded cooperative frame loop.
#[derive(Debug)]
pub struct FrameScheduler {
    config: SchedulerConfig,
    token: Option<CancelToken>,
    last_timestamp_ms: Option<f64>,
    consecutive_errors: u32,
    backoff_remaining: u32,
    stats: SchedulerStats,
    started_at: Option<Instant>,
}

impl FrameScheduler {
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            token: None,
            last_timestamp_ms: None,
            consecutive_errors: 0,
            backoff_remaining: 0,
            stats: SchedulerStats::default(),
            started_at: None,
        }
    }

    /// Begin a new run, cancelling any run still in progress.
    pub fn start(&mut self) -> CancelToken {
        if let Some(previous) = self.token.take() {
            debug!("Cancelling previous scheduler run before restart");
            previous.cancel();
        }
        let token = CancelToken::new();
        self.token = Some(token.clone());
        self.consecutive_errors = 0;
        self.backoff_remaining = 0;
        self.started_at = Some(Instant::now());
        debug!("Frame scheduler started");
        token
    }

    /// Cancel the current run. No verdict is published after this returns.
    pub fn stop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
            debug!("Frame scheduler stopped after {} verdicts", self.stats.published);
        }
    }

    pub fn is_running(&self) -> bool {
        self.token.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Token of the current run, if any.
    pub fn token(&self) -> Option<&CancelToken> {
        self.token.as_ref()
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Number of verdicts published so far across all runs.
    pub fn published(&self) -> u64 {
        self.stats.published
    }

    /// Run one iteration for the refresh fired at `timestamp_ms`.
    pub fn tick(&mut self, ctx: TickContext<'_>, timestamp_ms: f64) -> TickOutcome {
        let Some(token) = self.token.clone() else {
            return TickOutcome::Idle;
        };
        if token.is_cancelled() {
            self.token = None;
            return TickOutcome::Cancelled;
        }
        self.stats.ticks += 1;

        if self.backoff_remaining > 0 {
            self.backoff_remaining -= 1;
            self.stats.backoff_skips += 1;
            return TickOutcome::Skipped(SkipReason::BackingOff);
        }

        if !ctx.video.is_ready() {
            self.stats.source_not_ready += 1;
            return TickOutcome::Skipped(SkipReason::SourceNotReady);
        }

        let frame = match ctx.video.current_frame() {
            Some(frame) if !frame.size.is_empty() => frame,
            _ => {
                self.stats.frames_not_decodable += 1;
                return TickOutcome::Skipped(SkipReason::FrameNotDecodable);
            }
        };

        let timestamp_ms = self.monotonic(timestamp_ms);
        let detections = match ctx.detector.detect(&frame, timestamp_ms) {
            Ok(Detection::Ready(detections)) => {
                self.consecutive_errors = 0;
                detections
            }
            Ok(Detection::NotReady) => {
                self.stats.detector_not_ready += 1;
                return TickOutcome::Skipped(SkipReason::DetectorNotReady);
            }
            Err(e) => {
                self.record_detector_error(&e);
                return TickOutcome::Skipped(SkipReason::DetectorError);
            }
        };

        // The run may have been cancelled while the detector was working
        if token.is_cancelled() {
            self.token = None;
            return TickOutcome::Cancelled;
        }

        let verdict = ctx.evaluator.evaluate(&detections, frame.size);
        self.stats.published += 1;
        self.update_fps();
        let tick = self.stats.published;
        ctx.sink.publish(tick, &verdict);

        TickOutcome::Published { tick, verdict }
    }

    /// Clamp a host timestamp so the detector never sees time run backwards.
    fn monotonic(&mut self, timestamp_ms: f64) -> f64 {
        let ts = match self.last_timestamp_ms {
            Some(last) if !(timestamp_ms >= last) => {
                debug!("Clamping timestamp {timestamp_ms} to {last}");
                last
            }
            _ => timestamp_ms,
        };
        self.last_timestamp_ms = Some(ts);
        ts
    }

    fn record_detector_error(&mut self, error: &crate::Error) {
        self.stats.detector_errors += 1;
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);

        let exponent = (self.consecutive_errors - 1).min(31);
        self.backoff_remaining = (1u32 << exponent).min(self.config.max_backoff_ticks);

        if self.consecutive_errors == 1 || self.consecutive_errors % self.config.error_log_every.max(1) == 0 {
            warn!(
                "Detector failed ({} in a row), skipping {} ticks: {}",
                self.consecutive_errors, self.backoff_remaining, error
            );
        } else {
            debug!("Detector failed again: {error}");
        }
    }

    fn update_fps(&mut self) {
        if let Some(started) = self.started_at {
            let elapsed = started.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                self.stats.fps = self.stats.published as f64 / elapsed;
            }
        }
    }
}
