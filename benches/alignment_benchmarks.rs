//! Performance benchmarks for the per-frame alignment path and still processing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use face_align_capture::{
    alignment::AlignmentEvaluator,
    capture::{cover_crop, CaptureService},
    config::{CaptureConfig, Config, OutputFormat, Preset},
    types::{DetectionResult, FrameSize, LandmarkSet, NormalizedPoint},
};
use image::{DynamicImage, Rgb, RgbImage};
use std::io::Cursor;
use std::time::Duration;

/// 68-point face outline on a circle around the frame center
fn ring_face(radius: f64) -> LandmarkSet {
    (0..68)
        .map(|i| {
            let angle = f64::from(i) / 68.0 * std::f64::consts::TAU;
            NormalizedPoint::new(0.5 + radius * angle.cos(), 0.5 + radius * angle.sin())
        })
        .collect()
}

/// Evaluator cost per tick for the common frame sizes and presets
fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    let frames = [
        FrameSize::new(640, 480),
        FrameSize::new(1280, 720),
        FrameSize::new(1920, 1080),
    ];
    let one_face = DetectionResult::new(vec![ring_face(0.2)]);
    let crowd = DetectionResult::new((0..4).map(|i| ring_face(0.05 * f64::from(i + 1))).collect());

    for preset in [Preset::Standard, Preset::Ellipse, Preset::MultiFace] {
        let evaluator = AlignmentEvaluator::new(Config::default().with_preset(preset).alignment);
        for frame in frames {
            group.bench_with_input(
                BenchmarkId::new(preset.to_string(), format!("{}x{}", frame.width, frame.height)),
                &frame,
                |b, &frame| b.iter(|| black_box(evaluator.evaluate(black_box(&one_face), frame))),
            );
        }
        group.bench_function(BenchmarkId::new(preset.to_string(), "four_faces"), |b| {
            b.iter(|| black_box(evaluator.evaluate(black_box(&crowd), FrameSize::new(1280, 720))));
        });
    }

    group.finish();
}

fn bench_cover_crop(c: &mut Criterion) {
    c.bench_function("cover_crop", |b| {
        b.iter(|| black_box(cover_crop(black_box(1920), black_box(1080))));
    });
}

/// Full decode, crop and encode of a camera-sized still
fn bench_process_still(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_still");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    let still = RgbImage::from_fn(1280, 720, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    let mut encoded = Vec::new();
    DynamicImage::ImageRgb8(still)
        .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Png)
        .unwrap();

    for (name, config) in [
        ("jpeg", CaptureConfig::default()),
        (
            "png",
            CaptureConfig {
                format: OutputFormat::Png,
                ..CaptureConfig::default()
            },
        ),
        (
            "jpeg_resized_512",
            CaptureConfig {
                output_size: Some(512),
                ..CaptureConfig::default()
            },
        ),
    ] {
        let service = CaptureService::new(config);
        group.bench_function(name, |b| {
            b.iter(|| black_box(service.process(black_box(&encoded)).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_cover_crop, bench_process_still);
criterion_main!(benches);
