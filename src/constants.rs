//! Constants used throughout the crate

/// Guideline vertical radius is `visible_side / DEFAULT_RADIUS_DIVISOR`
pub const DEFAULT_RADIUS_DIVISOR: f64 = 4.0;

/// Guideline diameter as a fraction of the visible side for ellipse-style guides
pub const DEFAULT_ELLIPSE_DIAMETER_RATIO: f64 = 0.6;

/// Lower exclusive bound of the face-to-guideline scale ratio
pub const DEFAULT_MIN_SCALE: f64 = 0.6;

/// Upper exclusive bound of the face-to-guideline scale ratio
pub const DEFAULT_MAX_SCALE: f64 = 1.0;

/// Maximum face-center offset as a fraction of the visible side
pub const DEFAULT_CENTER_TOLERANCE_RATIO: f64 = 0.1;

/// Default still capture request
pub const DEFAULT_CAPTURE_WIDTH: u32 = 1280;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 720;

/// Still request used by the high resolution preset
pub const HIGH_RES_CAPTURE_WIDTH: u32 = 1920;
pub const HIGH_RES_CAPTURE_HEIGHT: u32 = 1080;

/// Default encoder quality (0.0-1.0)
pub const DEFAULT_CAPTURE_QUALITY: f32 = 0.92;

/// Display refresh rate assumed when none is configured
pub const DEFAULT_TARGET_FPS: u32 = 30;

/// Upper bound on ticks skipped after repeated detector failures
pub const DEFAULT_MAX_BACKOFF_TICKS: u32 = 32;

/// Log every Nth consecutive detector failure at warn level
pub const DEFAULT_ERROR_LOG_EVERY: u32 = 10;

/// Number of facial landmarks produced by the 68-point model
pub const NUM_FACIAL_LANDMARKS: usize = 68;

/// Image normalization constants for face detection
pub const IMAGE_NORMALIZATION_OFFSET: f32 = 127.5;
pub const IMAGE_NORMALIZATION_SCALE: f32 = 128.0;

/// Face box expansion applied before landmark regression
pub const FACE_BOX_EXPANSION: f32 = 0.2;
