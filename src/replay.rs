//! Recorded landmark traces.
//!
//! A trace is a YAML list of frames, each with its natural size and the faces
//! the detector reported for it:
//!
//! ```yaml
//! frames:
//!   - width: 1280
//!     height: 720
//!     ready: false        # not enough data buffered yet
//!   - width: 1280
//!     height: 720
//!     faces:
//!       - - { x: 0.38, y: 0.29 }
//!         - { x: 0.62, y: 0.71 }
//! ```
//!
//! The same trace drives a [`ReplayVideo`] and a [`ReplayDetector`], which lets
//! the whole session run without a camera or a model.

use crate::landmarks::{Detection, LandmarkSource};
use crate::types::{DetectionResult, FrameSize};
use crate::video::{VideoFrame, VideoSource};
use crate::{Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// One recorded frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    pub width: u32,
    pub height: u32,

    /// False while the source could not decode this frame
    #[serde(default = "default_ready")]
    pub ready: bool,

    #[serde(default)]
    pub faces: DetectionResult,
}

fn default_ready() -> bool {
    true
}

impl TraceFrame {
    pub fn new(width: u32, height: u32, faces: DetectionResult) -> Self {
        Self {
            width,
            height,
            ready: true,
            faces,
        }
    }

    /// A frame the source could not decode yet.
    pub fn pending(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ready: false,
            faces: DetectionResult::empty(),
        }
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }
}

/// An ordered recording of frames and detections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkTrace {
    pub frames: Vec<TraceFrame>,
}

impl LandmarkTrace {
    pub fn new(frames: Vec<TraceFrame>) -> Self {
        Self { frames }
    }

    /// Load a trace from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let trace: Self = serde_yaml::from_str(content)?;
        if trace.frames.is_empty() {
            return Err(Error::InvalidInput("trace contains no frames".to_string()));
        }
        Ok(trace)
    }

    /// Save the trace to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Video source playing back the frame sizes of a trace.
///
/// Each pulled frame advances the cursor; frames marked not ready yield `None`.
#[derive(Debug, Clone)]
pub struct ReplayVideo {
    trace: Arc<LandmarkTrace>,
    cursor: usize,
}

impl ReplayVideo {
    pub fn new(trace: Arc<LandmarkTrace>) -> Self {
        Self { trace, cursor: 0 }
    }

    /// Frames pulled so far.
    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl VideoSource for ReplayVideo {
    fn is_ready(&self) -> bool {
        !self.trace.is_empty()
    }

    fn current_frame(&mut self) -> Option<VideoFrame> {
        let index = self.cursor;
        let frame = self.trace.frames.get(index)?;
        self.cursor += 1;
        if !frame.ready {
            debug!("Replay frame {index} not decodable yet");
            return None;
        }
        Some(VideoFrame::without_pixels(index as u64, frame.size()))
    }

    fn is_exhausted(&self) -> bool {
        self.cursor >= self.trace.len()
    }

    fn name(&self) -> &str {
        "replay"
    }
}

/// Landmark source answering with the faces recorded for each frame.
///
/// Asking twice for the same frame reports it as stale.
#[derive(Debug, Clone)]
pub struct ReplayDetector {
    trace: Arc<LandmarkTrace>,
    last_sequence: Option<u64>,
}

impl ReplayDetector {
    pub fn new(trace: Arc<LandmarkTrace>) -> Self {
        Self {
            trace,
            last_sequence: None,
        }
    }
}

impl LandmarkSource for ReplayDetector {
    fn detect(&mut self, frame: &VideoFrame, _timestamp_ms: f64) -> Result<Detection> {
        if self.last_sequence == Some(frame.sequence) {
            return Ok(Detection::NotReady);
        }
        let recorded = usize::try_from(frame.sequence)
            .ok()
            .and_then(|i| self.trace.frames.get(i))
            .ok_or_else(|| Error::Detection(format!("frame {} is not in the trace", frame.sequence)))?;
        self.last_sequence = Some(frame.sequence);
        Ok(Detection::Ready(recorded.faces.clone()))
    }

    fn name(&self) -> &str {
        "replay"
    }
}
