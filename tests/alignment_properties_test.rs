//! Property tests and reference scenarios for the alignment evaluator


use face_align_capture::{
    alignment::{evaluate, AlignmentEvaluator, AlignmentReason, Guidance, Misalignment},
    config::{AlignmentConfig, CenterTolerance, Preset, Config},
    geometry::GuidelineRegion,
    types::{DetectionResult, FrameSize},
};
use proptest::prelude::*;
use test_helpers::{detections, face_at, square_face};

fn default_evaluator() -> AlignmentEvaluator {
    AlignmentEvaluator::new(AlignmentConfig::default())
}

#[test]
fn test_reference_scenario_aligned() {
    let frame = FrameSize::new(1280, 720);
    let region = GuidelineRegion::compute(frame, &AlignmentConfig::default());
    assert_eq!(region.radius_y, 180.0);

    let verdict = default_evaluator().evaluate(&detections(vec![square_face(frame, 640.0, 360.0, 300.0)]), frame);
    assert!(verdict.aligned);
    assert_eq!(verdict.reason, AlignmentReason::Aligned);
    assert!((verdict.scale.unwrap() - 0.8333).abs() < 1e-3);
}

#[test]
fn test_reference_scenario_offset() {
    let frame = FrameSize::new(1280, 720);
    let verdict = default_evaluator().evaluate(&detections(vec![square_face(frame, 790.0, 360.0, 300.0)]), frame);
    assert!(!verdict.aligned);
    assert_eq!(verdict.reason, AlignmentReason::Unaligned);
    assert!((verdict.distance.unwrap() - 150.0).abs() < 1e-9);
}

#[test]
fn test_reference_scenario_empty() {
    let verdict = default_evaluator().evaluate(&DetectionResult::empty(), FrameSize::new(1280, 720));
    assert_eq!(verdict.reason, AlignmentReason::NoFace);
    assert!(!verdict.aligned);
    assert_eq!(verdict.guidance(), Guidance::NoFace);
}

#[test]
fn test_portrait_frame_crops_vertically() {
    // 720x1280: visible square spans y in [280, 1000]
    let frame = FrameSize::new(720, 1280);
    let config = AlignmentConfig {
        center_tolerance: CenterTolerance::Pixels(10_000.0),
        ..AlignmentConfig::default()
    };
    let verdict = AlignmentEvaluator::new(config).evaluate(&detections(vec![square_face(frame, 360.0, 150.0, 300.0)]), frame);
    assert_eq!(verdict.misalignment, Some(Misalignment::OutsideVisibleArea));
}

#[test]
fn test_ellipse_preset_per_axis_scale() {
    let config = Config::default().with_preset(Preset::Ellipse).alignment;
    let frame = FrameSize::new(1280, 720);
    // diameter ratio 0.6 of 720 -> both diameters 432 without aspect correction
    let verdict = AlignmentEvaluator::new(config).evaluate(&detections(vec![face_at(frame, 640.0, 360.0, 300.0, 400.0)]), frame);
    let expected = (300.0 / 432.0 + 400.0 / 432.0) / 2.0;
    assert!((verdict.scale.unwrap() - expected).abs() < 1e-9);
    assert_eq!(verdict.reason, AlignmentReason::Aligned);
}

#[test]
fn test_free_function_matches_evaluator() {
    let frame = FrameSize::new(800, 600);
    let config = AlignmentConfig::default();
    let region = GuidelineRegion::compute(frame, &config);
    let faces = detections(vec![square_face(frame, 420.0, 310.0, 240.0)]);
    assert_eq!(
        evaluate(&faces, frame, &region, &config),
        AlignmentEvaluator::new(config).evaluate(&faces, frame)
    );
}

fn frame_strategy() -> impl Strategy<Value = FrameSize> {
    (200u32..3000, 200u32..3000).prop_map(|(w, h)| FrameSize::new(w, h))
}

proptest! {
    #[test]
    fn prop_centered_midpoint_face_is_aligned(frame in frame_strategy()) {
        let config = AlignmentConfig::default();
        let region = GuidelineRegion::compute(frame, &config);
        let midpoint = (config.min_scale + config.max_scale) / 2.0;
        let side = midpoint * region.diameter_y();
        let center = frame.center();

        let verdict = default_evaluator().evaluate(&detections(vec![square_face(frame, center.x, center.y, side)]), frame);
        prop_assert!(verdict.aligned);
        prop_assert_eq!(verdict.reason, AlignmentReason::Aligned);
    }

    #[test]
    fn prop_far_face_is_unaligned(
        frame in frame_strategy(),
        factor in 1.05f64..3.0,
        angle in 0.0f64..std::f64::consts::TAU,
        scale in 0.1f64..2.0,
    ) {
        let config = AlignmentConfig::default();
        let region = GuidelineRegion::compute(frame, &config);
        let tolerance = config.center_tolerance.to_pixels(f64::from(frame.short_side()));
        let distance = tolerance * factor;
        let center = frame.center();
        let face = square_face(
            frame,
            center.x + distance * angle.cos(),
            center.y + distance * angle.sin(),
            scale * region.diameter_y(),
        );

        let verdict = default_evaluator().evaluate(&detections(vec![face]), frame);
        prop_assert!(!verdict.aligned);
        prop_assert_eq!(verdict.reason, AlignmentReason::Unaligned);
    }

    #[test]
    fn prop_out_of_range_scale_is_unaligned(
        frame in frame_strategy(),
        scale in prop_oneof![0.05f64..0.58, 1.02f64..2.5],
        offset in 0.0f64..0.5,
    ) {
        let config = AlignmentConfig::default();
        let region = GuidelineRegion::compute(frame, &config);
        let tolerance = config.center_tolerance.to_pixels(f64::from(frame.short_side()));
        let center = frame.center();
        let face = square_face(frame, center.x + tolerance * offset, center.y, scale * region.diameter_y());

        let verdict = default_evaluator().evaluate(&detections(vec![face]), frame);
        prop_assert!(!verdict.aligned);
        prop_assert_eq!(verdict.reason, AlignmentReason::Unaligned);
    }

    #[test]
    fn prop_evaluation_is_pure(
        frame in frame_strategy(),
        cx in 0.0f64..1.0,
        cy in 0.0f64..1.0,
        side in 10.0f64..800.0,
    ) {
        let faces = detections(vec![square_face(
            frame,
            cx * f64::from(frame.width),
            cy * f64::from(frame.height),
            side,
        )]);
        let evaluator = default_evaluator();
        prop_assert_eq!(evaluator.evaluate(&faces, frame), evaluator.evaluate(&faces, frame));
    }

    #[test]
    fn prop_multiple_faces_never_aligned(frame in frame_strategy(), extra in 1usize..4) {
        let center = frame.center();
        let side = 0.4 * f64::from(frame.short_side());
        let faces = (0..=extra).map(|_| square_face(frame, center.x, center.y, side)).collect();

        let verdict = default_evaluator().evaluate(&detections(faces), frame);
        prop_assert_eq!(verdict.reason, AlignmentReason::MultipleFaces);
        prop_assert!(!verdict.aligned);
        prop_assert_eq!(verdict.face_count, extra + 1);
    }
}
