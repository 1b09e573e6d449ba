//! Per-frame alignment evaluation.
//!
//! [`evaluate`] scores one frame's detections against the guideline region.
//! It is deterministic and side-effect free: the same detections, frame size
//! and configuration always produce the same [`AlignmentVerdict`].
//!
//! Decision order:
//! 1. no faces → [`AlignmentReason::NoFace`]
//! 2. more than one face with multi-face rejection on → [`AlignmentReason::MultipleFaces`]
//! 3. face center in the cropped-off margin → `Unaligned`
//! 4. center distance and scale ratio both strictly within bounds → `Aligned`
//!
//! Boundary values fail: a distance equal to the tolerance or a scale equal to
//! either bound yields `Unaligned`.

use crate::config::{AlignmentConfig, ScaleMode};
use crate::geometry::{GuidelineRegion, VisibleArea};
use crate::types::{DetectionResult, FaceBoundingBox, FrameSize, LandmarkSet};
use serde::Serialize;
use std::fmt;

/// Classification of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AlignmentReason {
    Unaligned,
    NoFace,
    MultipleFaces,
    Aligned,
}

impl fmt::Display for AlignmentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unaligned => "unaligned",
            Self::NoFace => "no_face",
            Self::MultipleFaces => "multiple_faces",
            Self::Aligned => "aligned",
        };
        f.write_str(name)
    }
}

/// Which check rejected an `Unaligned` face. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Misalignment {
    /// Face center is outside the square the user actually sees
    OutsideVisibleArea,
    /// Face center too far from the guideline center
    OffCenter,
    /// Scale ratio at or below the minimum
    TooSmall,
    /// Scale ratio at or above the maximum
    TooLarge,
}

/// User-facing hint derived from a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Guidance {
    NoFace,
    MultipleFaces,
    MoveIntoView,
    CenterFace,
    MoveCloser,
    MoveBack,
    HoldStill,
}

/// Result of evaluating one frame. Recomputed every tick, never carried over.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentVerdict {
    pub aligned: bool,
    pub reason: AlignmentReason,
    /// Pixel distance between face center and guideline center
    pub distance: Option<f64>,
    /// Face-to-guideline scale ratio
    pub scale: Option<f64>,
    pub face_count: usize,
    pub misalignment: Option<Misalignment>,
}

impl AlignmentVerdict {
    fn no_face() -> Self {
        Self {
            aligned: false,
            reason: AlignmentReason::NoFace,
            distance: None,
            scale: None,
            face_count: 0,
            misalignment: None,
        }
    }

    fn multiple_faces(face_count: usize) -> Self {
        Self {
            aligned: false,
            reason: AlignmentReason::MultipleFaces,
            distance: None,
            scale: None,
            face_count,
            misalignment: None,
        }
    }

    fn unaligned(face_count: usize, misalignment: Option<Misalignment>) -> Self {
        Self {
            aligned: false,
            reason: AlignmentReason::Unaligned,
            distance: None,
            scale: None,
            face_count,
            misalignment,
        }
    }

    pub fn guidance(&self) -> Guidance {
        match self.reason {
            AlignmentReason::NoFace => Guidance::NoFace,
            AlignmentReason::MultipleFaces => Guidance::MultipleFaces,
            AlignmentReason::Aligned => Guidance::HoldStill,
            AlignmentReason::Unaligned => match self.misalignment {
                Some(Misalignment::OutsideVisibleArea) => Guidance::MoveIntoView,
                Some(Misalignment::TooSmall) => Guidance::MoveCloser,
                Some(Misalignment::TooLarge) => Guidance::MoveBack,
                Some(Misalignment::OffCenter) | None => Guidance::CenterFace,
            },
        }
    }
}

/// Evaluator bound to one immutable configuration.
#[derive(Debug, Clone)]
pub struct AlignmentEvaluator {
    config: AlignmentConfig,
}

impl AlignmentEvaluator {
    #[must_use]
    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    /// Evaluate detections for a frame, recomputing the guideline from its size.
    pub fn evaluate(&self, detections: &DetectionResult, frame: FrameSize) -> AlignmentVerdict {
        let region = GuidelineRegion::compute(frame, &self.config);
        evaluate(detections, frame, &region, &self.config)
    }
}

/// Score detections against a guideline region.
pub fn evaluate(
    detections: &DetectionResult,
    frame: FrameSize,
    region: &GuidelineRegion,
    config: &AlignmentConfig,
) -> AlignmentVerdict {
    let face_count = detections.face_count();
    if face_count == 0 {
        return AlignmentVerdict::no_face();
    }
    if face_count > 1 && config.reject_multiple_faces {
        return AlignmentVerdict::multiple_faces(face_count);
    }

    let Some(bbox) = select_face(detections.faces(), frame) else {
        return AlignmentVerdict::unaligned(face_count, None);
    };

    let visible = VisibleArea::of(frame);
    if visible.crops_out(frame, bbox.center()) {
        return AlignmentVerdict::unaligned(face_count, Some(Misalignment::OutsideVisibleArea));
    }

    let distance = bbox.center().distance(&region.center);
    let max_distance = config.center_tolerance.to_pixels(visible.side);
    let scale = scale_ratio(&bbox, region, config.scale_mode);

    let misalignment = if !(distance < max_distance) {
        Some(Misalignment::OffCenter)
    } else if !(scale > config.min_scale) {
        Some(Misalignment::TooSmall)
    } else if !(scale < config.max_scale) {
        Some(Misalignment::TooLarge)
    } else {
        None
    };

    let aligned = misalignment.is_none();
    AlignmentVerdict {
        aligned,
        reason: if aligned {
            AlignmentReason::Aligned
        } else {
            AlignmentReason::Unaligned
        },
        distance: Some(distance),
        scale: Some(scale),
        face_count,
        misalignment,
    }
}

/// Face-to-guideline size ratio.
pub fn scale_ratio(bbox: &FaceBoundingBox, region: &GuidelineRegion, mode: ScaleMode) -> f64 {
    match mode {
        ScaleMode::SingleAxis => (bbox.width() + bbox.height()) / 2.0 / region.diameter_y(),
        ScaleMode::PerAxis => (bbox.width() / region.diameter_x() + bbox.height() / region.diameter_y()) / 2.0,
    }
}

/// The single face to evaluate: the only one, or the largest when several are allowed.
fn select_face(faces: &[LandmarkSet], frame: FrameSize) -> Option<FaceBoundingBox> {
    faces
        .iter()
        .filter_map(|face| face.bounding_box(frame))
        .max_by(|a, b| a.area().total_cmp(&b.area()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CenterTolerance;
    use crate::types::NormalizedPoint;

    /// Square face of `side` pixels centered at (`cx`, `cy`) in a `frame`.
    fn face(frame: FrameSize, cx: f64, cy: f64, side: f64) -> LandmarkSet {
        let w = f64::from(frame.width);
        let h = f64::from(frame.height);
        let half = side / 2.0;
        vec![
            NormalizedPoint::new((cx - half) / w, (cy - half) / h),
            NormalizedPoint::new((cx + half) / w, (cy - half) / h),
            NormalizedPoint::new(cx / w, cy / h),
            NormalizedPoint::new((cx - half) / w, (cy + half) / h),
            NormalizedPoint::new((cx + half) / w, (cy + half) / h),
        ]
        .into_iter()
        .collect()
    }

    fn hd() -> FrameSize {
        FrameSize::new(1280, 720)
    }

    fn eval(detections: &DetectionResult) -> AlignmentVerdict {
        AlignmentEvaluator::new(AlignmentConfig::default()).evaluate(detections, hd())
    }

    #[test]
    fn test_no_face() {
        let verdict = eval(&DetectionResult::empty());
        assert_eq!(verdict.reason, AlignmentReason::NoFace);
        assert!(!verdict.aligned);
        assert_eq!(verdict.face_count, 0);
        assert_eq!(verdict.guidance(), Guidance::NoFace);
    }

    #[test]
    fn test_centered_face_is_aligned() {
        let detections = DetectionResult::new(vec![face(hd(), 640.0, 360.0, 300.0)]);
        let verdict = eval(&detections);
        assert_eq!(verdict.reason, AlignmentReason::Aligned);
        assert!(verdict.aligned);
        assert!(verdict.distance.unwrap() < 1e-9);
        assert!((verdict.scale.unwrap() - 300.0 / 360.0).abs() < 1e-9);
        assert_eq!(verdict.guidance(), Guidance::HoldStill);
    }

    #[test]
    fn test_offset_face_is_unaligned() {
        let detections = DetectionResult::new(vec![face(hd(), 790.0, 360.0, 300.0)]);
        let verdict = eval(&detections);
        assert_eq!(verdict.reason, AlignmentReason::Unaligned);
        assert!((verdict.distance.unwrap() - 150.0).abs() < 1e-9);
        assert_eq!(verdict.misalignment, Some(Misalignment::OffCenter));
        assert_eq!(verdict.guidance(), Guidance::CenterFace);
    }

    /// Frame whose normalized coordinates stay exact in binary floating point.
    fn dyadic() -> FrameSize {
        FrameSize::new(1024, 512)
    }

    #[test]
    fn test_distance_at_threshold_fails() {
        let config = AlignmentConfig {
            center_tolerance: CenterTolerance::Pixels(64.0),
            ..AlignmentConfig::default()
        };
        let evaluator = AlignmentEvaluator::new(config);

        // diameter_y = 256, face side 192 -> scale 0.75
        let at_threshold = DetectionResult::new(vec![face(dyadic(), 576.0, 256.0, 192.0)]);
        let verdict = evaluator.evaluate(&at_threshold, dyadic());
        assert_eq!(verdict.distance, Some(64.0));
        assert_eq!(verdict.reason, AlignmentReason::Unaligned);
        assert_eq!(verdict.misalignment, Some(Misalignment::OffCenter));

        let inside = DetectionResult::new(vec![face(dyadic(), 544.0, 256.0, 192.0)]);
        assert_eq!(evaluator.evaluate(&inside, dyadic()).reason, AlignmentReason::Aligned);
    }

    #[test]
    fn test_scale_bounds_are_exclusive() {
        let config = AlignmentConfig {
            min_scale: 0.5,
            max_scale: 1.0,
            ..AlignmentConfig::default()
        };
        let evaluator = AlignmentEvaluator::new(config);

        // diameter_y = 256: scale 0.5 -> 128px, scale 1.0 -> 256px
        let small = evaluator.evaluate(&DetectionResult::new(vec![face(dyadic(), 512.0, 256.0, 128.0)]), dyadic());
        assert_eq!(small.scale, Some(0.5));
        assert_eq!(small.misalignment, Some(Misalignment::TooSmall));
        assert_eq!(small.guidance(), Guidance::MoveCloser);

        let large = evaluator.evaluate(&DetectionResult::new(vec![face(dyadic(), 512.0, 256.0, 256.0)]), dyadic());
        assert_eq!(large.scale, Some(1.0));
        assert_eq!(large.misalignment, Some(Misalignment::TooLarge));
        assert_eq!(large.guidance(), Guidance::MoveBack);
    }

    #[test]
    fn test_multiple_faces_rejected() {
        let detections = DetectionResult::new(vec![
            face(hd(), 640.0, 360.0, 300.0),
            face(hd(), 640.0, 360.0, 300.0),
        ]);
        let verdict = eval(&detections);
        assert_eq!(verdict.reason, AlignmentReason::MultipleFaces);
        assert_eq!(verdict.face_count, 2);
        assert!(!verdict.aligned);
    }

    #[test]
    fn test_multiple_faces_allowed_uses_largest() {
        let config = AlignmentConfig {
            reject_multiple_faces: false,
            ..AlignmentConfig::default()
        };
        let detections = DetectionResult::new(vec![
            face(hd(), 400.0, 200.0, 50.0),
            face(hd(), 640.0, 360.0, 300.0),
        ]);
        let verdict = AlignmentEvaluator::new(config).evaluate(&detections, hd());
        assert_eq!(verdict.reason, AlignmentReason::Aligned);
        assert_eq!(verdict.face_count, 2);
    }

    #[test]
    fn test_face_in_cropped_margin() {
        // visible square spans x in [280, 1000]
        let detections = DetectionResult::new(vec![face(hd(), 150.0, 360.0, 300.0)]);
        let config = AlignmentConfig {
            center_tolerance: CenterTolerance::Pixels(10_000.0),
            ..AlignmentConfig::default()
        };
        let verdict = AlignmentEvaluator::new(config).evaluate(&detections, hd());
        assert_eq!(verdict.reason, AlignmentReason::Unaligned);
        assert_eq!(verdict.misalignment, Some(Misalignment::OutsideVisibleArea));
        assert!(verdict.distance.is_none());
        assert_eq!(verdict.guidance(), Guidance::MoveIntoView);
    }

    #[test]
    fn test_absolute_tolerance() {
        let config = AlignmentConfig {
            center_tolerance: CenterTolerance::Pixels(200.0),
            ..AlignmentConfig::default()
        };
        let detections = DetectionResult::new(vec![face(hd(), 790.0, 360.0, 300.0)]);
        let verdict = AlignmentEvaluator::new(config).evaluate(&detections, hd());
        assert_eq!(verdict.reason, AlignmentReason::Aligned);
    }

    #[test]
    fn test_per_axis_scale() {
        let config = AlignmentConfig {
            scale_mode: ScaleMode::PerAxis,
            aspect_correction: false,
            ..AlignmentConfig::default()
        };
        let region = GuidelineRegion::compute(hd(), &config);
        let bbox = face(hd(), 640.0, 360.0, 288.0).bounding_box(hd()).unwrap();
        let scale = scale_ratio(&bbox, &region, config.scale_mode);
        assert!((scale - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_empty_landmark_set_is_unaligned() {
        let verdict = eval(&DetectionResult::new(vec![LandmarkSet::default()]));
        assert_eq!(verdict.reason, AlignmentReason::Unaligned);
        assert_eq!(verdict.face_count, 1);
    }
}
