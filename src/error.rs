//! Error types for the face alignment capture library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[cfg(feature = "camera")]
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// `ONNX` Runtime inference failed
    #[cfg(feature = "onnx")]
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::OrtError),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The landmark detector could not be loaded
    #[error("Detector initialization failed: {0}")]
    DetectorInit(String),

    /// The landmark detector failed while processing a frame
    #[error("Detection error: {0}")]
    Detection(String),

    /// A still frame could not be obtained from the source
    #[error("Still capture failed: {0}")]
    StillCapture(String),

    /// A still frame could not be decoded into pixels
    #[error("Failed to decode still frame: {0}")]
    Decode(String),

    /// The cropped still could not be encoded
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// Decoded image has a zero dimension
    #[error("image dimensions are zero")]
    ZeroDimensions,

    /// Capture was requested outside the `Aligned` phase
    #[error("Capture not permitted in phase {phase}")]
    CaptureNotPermitted {
        /// Phase the session was in when capture was requested
        phase: String,
    },

    /// A session action is not valid in the current phase
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
