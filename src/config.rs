//! Configuration management for the alignment guide and capture pipeline

use crate::constants::{
    DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_QUALITY, DEFAULT_CAPTURE_WIDTH, DEFAULT_CENTER_TOLERANCE_RATIO,
    DEFAULT_ELLIPSE_DIAMETER_RATIO, DEFAULT_ERROR_LOG_EVERY, DEFAULT_MAX_BACKOFF_TICKS, DEFAULT_MAX_SCALE,
    DEFAULT_MIN_SCALE, DEFAULT_RADIUS_DIVISOR, DEFAULT_TARGET_FPS, HIGH_RES_CAPTURE_HEIGHT, HIGH_RES_CAPTURE_WIDTH,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Guideline geometry and alignment thresholds
    pub alignment: AlignmentConfig,

    /// Still capture and output encoding
    pub capture: CaptureConfig,

    /// Frame loop pacing and failure backoff
    pub scheduler: SchedulerConfig,

    /// ONNX detector model configuration
    pub detector: DetectorConfig,
}

/// How the guideline's vertical radius is derived from the visible side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum GuidelineSize {
    /// `radius_y = visible_side / divisor`
    Divisor(f64),
    /// `radius_y = visible_side * ratio / 2`
    DiameterRatio(f64),
}

/// How the face-to-guideline scale ratio is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    /// `mean(face_w, face_h) / (2 * radius_y)`
    SingleAxis,
    /// `mean(face_w / (2 * radius_x), face_h / (2 * radius_y))`
    PerAxis,
}

/// Maximum allowed distance between face center and guideline center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum CenterTolerance {
    /// Fraction of the visible square's side length
    Ratio(f64),
    /// Absolute frame pixels
    Pixels(f64),
}

impl CenterTolerance {
    /// Threshold in pixels for a visible square of the given side.
    pub fn to_pixels(self, visible_side: f64) -> f64 {
        match self {
            Self::Ratio(ratio) => ratio * visible_side,
            Self::Pixels(px) => px,
        }
    }
}

/// Immutable alignment criteria
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Guideline size relative to the visible square
    pub guideline: GuidelineSize,

    /// Stretch the horizontal radius by the frame aspect ratio so the guide
    /// stays circular when a non-square frame is shown in a square viewport
    pub aspect_correction: bool,

    /// Scale ratio measurement
    pub scale_mode: ScaleMode,

    /// Exclusive lower bound of the scale ratio
    pub min_scale: f64,

    /// Exclusive upper bound of the scale ratio
    pub max_scale: f64,

    /// Exclusive bound on the face-center offset
    pub center_tolerance: CenterTolerance,

    /// Reject frames with more than one face
    pub reject_multiple_faces: bool,
}

/// Encoded output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// JPEG at the configured quality
    #[default]
    Jpeg,
    /// Lossless PNG
    Png,
    /// Lossless WebP
    Webp,
}

impl OutputFormat {
    /// MIME type of the encoded artifact.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

/// Still capture parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Requested still width (may differ from the preview resolution)
    pub target_width: u32,

    /// Requested still height
    pub target_height: u32,

    /// Output encoding
    pub format: OutputFormat,

    /// Encoder quality (0.0-1.0); only JPEG honours it
    pub quality: f32,

    /// Resize the square crop to this side length
    pub output_size: Option<u32>,

    /// Flip the output horizontally (selfie view)
    pub mirror: bool,
}

/// Frame loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Refresh rate of the host display signal
    pub target_fps: u32,

    /// Cap on ticks skipped after consecutive detector failures
    pub max_backoff_ticks: u32,

    /// Log every Nth consecutive detector failure at warn level
    pub error_log_every: u32,
}

/// ONNX detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Path to SCRFD face detection model
    pub face_detector: PathBuf,

    /// Path to facial landmarks model
    pub face_landmarks: PathBuf,

    /// Confidence threshold for face detection (0.0-1.0)
    pub confidence_threshold: f32,

    /// IOU threshold for non-maximum suppression (0.0-1.0)
    pub iou_threshold: f32,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            guideline: GuidelineSize::Divisor(DEFAULT_RADIUS_DIVISOR),
            aspect_correction: true,
            scale_mode: ScaleMode::SingleAxis,
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            center_tolerance: CenterTolerance::Ratio(DEFAULT_CENTER_TOLERANCE_RATIO),
            reject_multiple_faces: true,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_width: DEFAULT_CAPTURE_WIDTH,
            target_height: DEFAULT_CAPTURE_HEIGHT,
            format: OutputFormat::Jpeg,
            quality: DEFAULT_CAPTURE_QUALITY,
            output_size: None,
            mirror: false,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            max_backoff_ticks: DEFAULT_MAX_BACKOFF_TICKS,
            error_log_every: DEFAULT_ERROR_LOG_EVERY,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            face_detector: PathBuf::from("assets/face_detector.onnx"),
            face_landmarks: PathBuf::from("assets/face_landmarks.onnx"),
            confidence_threshold: 0.5,
            iou_threshold: 0.4,
        }
    }
}

/// Pre-configured settings covering the common guide layouts.
///
/// A preset replaces the alignment and capture sections; individual fields can
/// be overridden afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Circle guide, radius = side / 4, single-axis scale, one face only
    Standard,
    /// Ellipse guide sized by diameter ratio, per-axis scale
    Ellipse,
    /// Standard geometry but evaluates the largest face when several are visible
    MultiFace,
    /// Standard geometry with a 1920×1080 still and 1080px square output
    HighResolution,
}

impl FromStr for Preset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "standard" | "circle" => Ok(Self::Standard),
            "ellipse" => Ok(Self::Ellipse),
            "multi_face" | "multiface" | "multi-face" => Ok(Self::MultiFace),
            "high_resolution" | "highres" | "high-res" => Ok(Self::HighResolution),
            _ => Err(Error::ConfigError(format!("Unknown preset: {s}"))),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Standard => "standard",
            Self::Ellipse => "ellipse",
            Self::MultiFace => "multi_face",
            Self::HighResolution => "high_resolution",
        };
        f.write_str(name)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Apply a preset to the alignment and capture sections
    #[must_use]
    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.alignment = AlignmentConfig::default();
        self.capture = CaptureConfig::default();
        match preset {
            Preset::Standard => {}
            Preset::Ellipse => {
                self.alignment.guideline = GuidelineSize::DiameterRatio(DEFAULT_ELLIPSE_DIAMETER_RATIO);
                self.alignment.scale_mode = ScaleMode::PerAxis;
                self.alignment.aspect_correction = false;
            }
            Preset::MultiFace => {
                self.alignment.reject_multiple_faces = false;
            }
            Preset::HighResolution => {
                self.capture.target_width = HIGH_RES_CAPTURE_WIDTH;
                self.capture.target_height = HIGH_RES_CAPTURE_HEIGHT;
                self.capture.output_size = Some(HIGH_RES_CAPTURE_HEIGHT);
            }
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.alignment.validate()?;
        self.capture.validate()?;

        if self.scheduler.target_fps == 0 {
            return Err(Error::ConfigError("Target FPS must be greater than 0".to_string()));
        }
        if self.scheduler.error_log_every == 0 {
            return Err(Error::ConfigError("Error log interval must be greater than 0".to_string()));
        }

        if !(0.0..=1.0).contains(&self.detector.confidence_threshold) {
            return Err(Error::ConfigError(
                "Confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.detector.iou_threshold) {
            return Err(Error::ConfigError("IOU threshold must be between 0.0 and 1.0".to_string()));
        }

        Ok(())
    }
}

impl AlignmentConfig {
    /// Validate guideline and threshold settings
    pub fn validate(&self) -> Result<()> {
        match self.guideline {
            GuidelineSize::Divisor(d) if !(d.is_finite() && d > 0.0) => {
                return Err(Error::ConfigError("Radius divisor must be greater than 0".to_string()));
            }
            GuidelineSize::DiameterRatio(r) if !(r > 0.0 && r <= 1.0) => {
                return Err(Error::ConfigError(
                    "Diameter ratio must be in (0.0, 1.0]".to_string(),
                ));
            }
            _ => {}
        }

        if !(self.min_scale.is_finite() && self.max_scale.is_finite()) || self.min_scale <= 0.0 {
            return Err(Error::ConfigError("Minimum scale must be greater than 0".to_string()));
        }
        if self.min_scale >= self.max_scale {
            return Err(Error::ConfigError(format!(
                "Minimum scale {} must be below maximum scale {}",
                self.min_scale, self.max_scale
            )));
        }

        let tolerance = match self.center_tolerance {
            CenterTolerance::Ratio(v) | CenterTolerance::Pixels(v) => v,
        };
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(Error::ConfigError("Center tolerance must be greater than 0".to_string()));
        }

        Ok(())
    }
}

impl CaptureConfig {
    /// Validate capture request and encoder settings
    pub fn validate(&self) -> Result<()> {
        if self.target_width == 0 || self.target_height == 0 {
            return Err(Error::ConfigError("Capture dimensions must be greater than 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(Error::ConfigError(format!(
                "quality must be between 0.0 and 1.0, got {}",
                self.quality
            )));
        }
        if self.output_size == Some(0) {
            return Err(Error::ConfigError("Output size must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Face Alignment Capture Configuration

# Guideline geometry and alignment thresholds
alignment:
  guideline:
    mode: divisor        # divisor | diameter_ratio
    value: 4.0
  aspect_correction: true
  scale_mode: single_axis  # single_axis | per_axis
  min_scale: 0.6
  max_scale: 1.0
  center_tolerance:
    mode: ratio          # ratio | pixels
    value: 0.1
  reject_multiple_faces: true

# Still capture and encoding
capture:
  target_width: 1280
  target_height: 720
  format: jpeg           # jpeg | png | webp
  quality: 0.92
  output_size: null
  mirror: false

# Frame loop
scheduler:
  target_fps: 30
  max_backoff_ticks: 32
  error_log_every: 10

# ONNX detector (feature "onnx")
detector:
  face_detector: "assets/face_detector.onnx"
  face_landmarks: "assets/face_landmarks.onnx"
  confidence_threshold: 0.5
  iou_threshold: 0.4
"#;
