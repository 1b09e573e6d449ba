//! Video source and still-capture contracts.
//!
//! The host owns the camera; this crate only reads frames from it and asks it
//! for an encoded still when the session captures.

use crate::config::CaptureConfig;
use crate::types::FrameSize;
use crate::{Error, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};

/// One preview frame pulled from the source.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Position of the frame in the stream
    pub sequence: u64,
    /// Natural frame size, which may change between frames
    pub size: FrameSize,
    /// Pixel buffer; synthetic sources that only carry geometry leave it empty
    pub pixels: Option<RgbImage>,
}

impl VideoFrame {
    pub fn new(sequence: u64, pixels: RgbImage) -> Self {
        Self {
            sequence,
            size: FrameSize::new(pixels.width(), pixels.height()),
            pixels: Some(pixels),
        }
    }

    pub fn without_pixels(sequence: u64, size: FrameSize) -> Self {
        Self {
            sequence,
            size,
            pixels: None,
        }
    }
}

/// Live preview stream.
pub trait VideoSource {
    /// Whether the source has fired its ready event.
    fn is_ready(&self) -> bool;

    /// Current frame, or `None` while not enough data is buffered to decode one.
    fn current_frame(&mut self) -> Option<VideoFrame>;

    /// True once a finite source has no more frames.
    fn is_exhausted(&self) -> bool {
        false
    }

    /// Name used in log messages.
    fn name(&self) -> &str {
        "video-source"
    }
}

/// Resolution requested for a still capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StillRequest {
    pub target_width: u32,
    pub target_height: u32,
}

impl From<&CaptureConfig> for StillRequest {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            target_width: config.target_width,
            target_height: config.target_height,
        }
    }
}

/// Produces an encoded still image at (or near) the requested resolution.
pub trait StillCapture {
    fn capture_still(&mut self, request: &StillRequest) -> Result<Vec<u8>>;
}

/// Still source that reads an encoded image from disk.
#[derive(Debug, Clone)]
pub struct FileStillCapture {
    path: PathBuf,
}

impl FileStillCapture {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl StillCapture for FileStillCapture {
    fn capture_still(&mut self, _request: &StillRequest) -> Result<Vec<u8>> {
        std::fs::read(&self.path)
            .map_err(|e| Error::StillCapture(format!("{}: {e}", self.path.display())))
    }
}

/// Still source that returns the same encoded bytes every time.
#[derive(Debug, Clone)]
pub struct MemoryStillCapture {
    data: Vec<u8>,
}

impl MemoryStillCapture {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl StillCapture for MemoryStillCapture {
    fn capture_still(&mut self, _request: &StillRequest) -> Result<Vec<u8>> {
        Ok(self.data.clone())
    }
}
