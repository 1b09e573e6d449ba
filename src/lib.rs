//! Face alignment guide and square still capture.
//!
//! This library evaluates, frame by frame, whether a detected face sits inside
//! an on-screen guideline and captures a square still once it does:
//! - Guideline geometry recomputed from the current frame size
//! - A pure alignment evaluator over normalized landmark sets
//! - A cooperative frame scheduler with explicit cancellation
//! - A cover-crop capture pipeline encoding JPEG, PNG or WebP
//! - A session state machine tying them together
//!
//! The landmark detector and the camera are collaborators behind the
//! [`landmarks::LandmarkSource`] and [`video::VideoSource`] traits. Recorded
//! traces ([`replay`]) implement both, an OpenCV camera is available with the
//! `camera` feature and an ONNX landmark model with the `onnx` feature.
//!
//! # Examples
//!
//! ## Evaluating one frame
//!
//! ```
//! use face_align_capture::alignment::{AlignmentEvaluator, AlignmentReason};
//! use face_align_capture::config::AlignmentConfig;
//! use face_align_capture::types::{DetectionResult, FrameSize, LandmarkSet, NormalizedPoint};
//!
//! let frame = FrameSize::new(1280, 720);
//! // 300x300 px face in the middle of the frame
//! let face: LandmarkSet = [(490.0, 210.0), (790.0, 510.0)]
//!     .into_iter()
//!     .map(|(x, y)| NormalizedPoint::new(x / 1280.0, y / 720.0))
//!     .collect();
//!
//! let evaluator = AlignmentEvaluator::new(AlignmentConfig::default());
//! let verdict = evaluator.evaluate(&DetectionResult::new(vec![face]), frame);
//! assert_eq!(verdict.reason, AlignmentReason::Aligned);
//! ```
//!
//! ## Running a session from a trace
//!
//! ```no_run
//! use face_align_capture::config::Config;
//! use face_align_capture::replay::{LandmarkTrace, ReplayDetector, ReplayVideo};
//! use face_align_capture::session::{Phase, SessionStateMachine};
//! use face_align_capture::video::FileStillCapture;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let trace = Arc::new(LandmarkTrace::from_file("trace.yaml")?);
//! let mut session = SessionStateMachine::new(&Config::default(), Box::new(ReplayVideo::new(trace.clone())));
//! session.load_detector(|| Ok(Box::new(ReplayDetector::new(trace))))?;
//!
//! let mut still = FileStillCapture::new("still.jpg");
//! let mut timestamp = 0.0;
//! while session.phase() != Phase::Captured && !session.video_exhausted() {
//!     session.on_refresh(timestamp);
//!     if session.can_capture() {
//!         session.capture(&mut still)?;
//!     }
//!     timestamp += 33.3;
//! }
//! if session.phase() == Phase::Captured {
//!     let image = session.accept()?;
//!     std::fs::write("face.jpg", &image.data)?;
//! }
//! # Ok(())
//! # }
//! ```

/// Core data types: points, landmark sets, frame sizes
pub mod types;

/// Guideline region and visible cover-crop square
pub mod geometry;

/// Per-frame alignment evaluation
pub mod alignment;

/// Landmark detector contract and owned detector handle
pub mod landmarks;

/// Video source and still capture contracts
pub mod video;

/// Frame scheduling loop with cancellation
pub mod scheduler;

/// Still capture, square crop and encoding
pub mod capture;

/// Session state machine
pub mod session;

/// Recorded landmark traces
pub mod replay;

/// OpenCV camera source
#[cfg(feature = "camera")]
pub mod camera;

/// ONNX face and landmark detector
#[cfg(feature = "onnx")]
pub mod onnx_landmarks;

/// Utility functions for numeric and image conversions
pub mod utils;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
