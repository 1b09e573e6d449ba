//! Landmark source contract and the owned detector handle.

use crate::types::DetectionResult;
use crate::video::VideoFrame;
use crate::Result;
use log::{debug, info};

/// Outcome of asking the detector about one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// Faces found in the frame (possibly none)
    Ready(DetectionResult),
    /// The frame was stale or already consumed; skip this tick
    NotReady,
}

/// Pluggable face landmark detector.
///
/// Implementations return normalized landmark sets per detected face. Callers
/// pass monotonically non-decreasing timestamps for a given stream.
pub trait LandmarkSource {
    /// Detect faces in `frame`, captured at `timestamp_ms`.
    fn detect(&mut self, frame: &VideoFrame, timestamp_ms: f64) -> Result<Detection>;

    /// Release model resources. Called exactly once by [`DetectorHandle`].
    fn close(&mut self) {}

    /// Name used in log messages.
    fn name(&self) -> &str {
        "landmark-source"
    }
}

/// Exclusive owner of a loaded detector.
///
/// The detector is closed exactly once: on [`DetectorHandle::release`] or on drop,
/// whichever happens first.
pub struct DetectorHandle {
    source: Box<dyn LandmarkSource>,
    closed: bool,
}

impl DetectorHandle {
    pub fn new(source: Box<dyn LandmarkSource>) -> Self {
        info!("Detector '{}' loaded", source.name());
        Self { source, closed: false }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    /// Forward to the detector. A released handle reports [`Detection::NotReady`].
    pub fn detect(&mut self, frame: &VideoFrame, timestamp_ms: f64) -> Result<Detection> {
        if self.closed {
            return Ok(Detection::NotReady);
        }
        self.source.detect(frame, timestamp_ms)
    }

    /// Close the detector now. Later calls are no-ops.
    pub fn release(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        debug!("Closing detector '{}'", self.source.name());
        self.source.close();
    }
}

impl Drop for DetectorHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for DetectorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorHandle")
            .field("source", &self.source.name())
            .field("closed", &self.closed)
            .finish()
    }
}
