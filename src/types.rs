//! Core data types shared by the geometry, evaluator, scheduler and session.
//!
//! Coordinates come in two flavours and the type says which one:
//! [`NormalizedPoint`] lives in `[0, 1]` relative to the detection frame,
//! [`PixelPoint`] lives in the pixel space of a concrete frame buffer.

use serde::{Deserialize, Serialize};

/// A landmark position normalized to `[0, 1]` within the detection frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Scale into the pixel space of a frame of the given size.
    pub fn to_pixels(self, frame: FrameSize) -> PixelPoint {
        PixelPoint::new(self.x * f64::from(frame.width), self.y * f64::from(frame.height))
    }
}

/// A position in frame pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &PixelPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.hypot(dy)
    }
}

/// Pixel dimensions of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn short_side(&self) -> u32 {
        self.width.min(self.height)
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }

    /// Width over height. Zero for an empty frame.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        f64::from(self.width) / f64::from(self.height)
    }

    pub fn center(&self) -> PixelPoint {
        PixelPoint::new(f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }
}

/// One detected face: the detector's ordered landmark points.
///
/// Point order is defined by the detector and only matters for min/max extraction here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<NormalizedPoint>,
}

impl LandmarkSet {
    pub fn new(points: Vec<NormalizedPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[NormalizedPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Pixel-space bounding box of this face, or `None` when the set is empty.
    pub fn bounding_box(&self, frame: FrameSize) -> Option<FaceBoundingBox> {
        FaceBoundingBox::from_points(self.points.iter().map(|p| p.to_pixels(frame)))
    }
}

impl FromIterator<NormalizedPoint> for LandmarkSet {
    fn from_iter<I: IntoIterator<Item = NormalizedPoint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// All faces found in a single frame. Produced once per tick and never mutated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionResult {
    faces: Vec<LandmarkSet>,
}

impl DetectionResult {
    pub fn new(faces: Vec<LandmarkSet>) -> Self {
        Self { faces }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn faces(&self) -> &[LandmarkSet] {
        &self.faces
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

/// Pixel-space extents of one face. Derived per evaluation, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl FaceBoundingBox {
    pub fn from_points<I: IntoIterator<Item = PixelPoint>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let init = Self {
            min_x: first.x,
            max_x: first.x,
            min_y: first.y,
            max_y: first.y,
        };
        Some(iter.fold(init, |acc, p| Self {
            min_x: acc.min_x.min(p.x),
            max_x: acc.max_x.max(p.x),
            min_y: acc.min_y.min(p.y),
            max_y: acc.max_y.max(p.y),
        }))
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center_x(&self) -> f64 {
        (self.min_x + self.max_x) / 2.0
    }

    pub fn center_y(&self) -> f64 {
        (self.min_y + self.max_y) / 2.0
    }

    pub fn center(&self) -> PixelPoint {
        PixelPoint::new(self.center_x(), self.center_y())
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}
