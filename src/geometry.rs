//! Guideline geometry: the visible cover-crop square and the target region.
//!
//! Both are pure functions of the current frame size and the configuration and
//! are recomputed on every evaluation, so a source that changes resolution
//! mid-stream is picked up on the next tick.

use crate::config::{AlignmentConfig, GuidelineSize};
use crate::types::{FrameSize, PixelPoint};

/// The largest centered square of a frame shown with a cover fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleArea {
    /// Side of the square in frame pixels, `min(width, height)`
    pub side: f64,
    /// Left edge of the square (non-zero only for landscape frames)
    pub offset_x: f64,
    /// Top edge of the square (non-zero only for portrait frames)
    pub offset_y: f64,
}

impl VisibleArea {
    pub fn of(frame: FrameSize) -> Self {
        let side = f64::from(frame.short_side());
        Self {
            side,
            offset_x: (f64::from(frame.width) - side) / 2.0,
            offset_y: (f64::from(frame.height) - side) / 2.0,
        }
    }

    /// Whether a point lies in the cropped-off margin along the frame's long axis.
    ///
    /// Points exactly on the square's edge count as visible.
    pub fn crops_out(&self, frame: FrameSize, point: PixelPoint) -> bool {
        if frame.is_landscape() {
            point.x < self.offset_x || point.x > self.offset_x + self.side
        } else {
            point.y < self.offset_y || point.y > self.offset_y + self.side
        }
    }
}

/// Target region in frame pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidelineRegion {
    pub center: PixelPoint,
    pub radius_x: f64,
    pub radius_y: f64,
}

impl GuidelineRegion {
    /// Compute the guideline for the current frame size.
    ///
    /// `radius_y` comes from the visible side. With aspect correction enabled,
    /// `radius_x = radius_y * width / height`, so a frame squeezed into a square
    /// viewport still shows a circle.
    pub fn compute(frame: FrameSize, config: &AlignmentConfig) -> Self {
        let visible = VisibleArea::of(frame);
        let radius_y = match config.guideline {
            GuidelineSize::Divisor(divisor) => visible.side / divisor,
            GuidelineSize::DiameterRatio(ratio) => visible.side * ratio / 2.0,
        };
        let radius_x = if config.aspect_correction {
            radius_y * frame.aspect_ratio()
        } else {
            radius_y
        };

        Self {
            center: frame.center(),
            radius_x,
            radius_y,
        }
    }

    pub fn diameter_x(&self) -> f64 {
        self.radius_x * 2.0
    }

    pub fn diameter_y(&self) -> f64 {
        self.radius_y * 2.0
    }
}
