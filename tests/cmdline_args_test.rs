//! Tests for the command-line interface of the binary


use face_align_capture::{
    config::Config,
    replay::{LandmarkTrace, TraceFrame},
    types::DetectionResult,
};
use std::process::Command;
use test_helpers::{aligned_trace, scratch_dir, split_png};

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_face-align-capture"))
}

#[test]
fn test_print_config_is_loadable() {
    let output = binary().arg("--print-config").output().unwrap();
    assert!(output.status.success());

    let text = String::from_utf8(output.stdout).unwrap();
    let config: Config = serde_yaml::from_str(&text).unwrap();
    config.validate().unwrap();
}

#[test]
fn test_missing_input_fails() {
    let output = binary().output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no input"));
}

#[test]
fn test_unknown_preset_rejected() {
    let output = binary().args(["--preset", "oval", "--trace", "t.yaml"]).output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_invalid_fps_override_rejected() {
    let dir = scratch_dir("cli-fps");
    let trace = dir.join("trace.yaml");
    aligned_trace(1).to_file(&trace).unwrap();

    let output = binary()
        .args(["--fps", "0", "--trace"])
        .arg(&trace)
        .output()
        .unwrap();
    assert!(!output.status.success());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_trace_auto_capture_writes_square_image() {
    let dir = scratch_dir("cli-capture");
    let trace = dir.join("trace.yaml");
    let mut frames = vec![TraceFrame::new(1280, 720, DetectionResult::empty())];
    frames.extend(aligned_trace(2).frames);
    LandmarkTrace::new(frames).to_file(&trace).unwrap();

    let still = dir.join("still.png");
    std::fs::write(&still, split_png(300, 200)).unwrap();
    let out = dir.join("face.jpg");

    let output = binary()
        .args(["--fps", "120", "--auto-capture", "--trace"])
        .arg(&trace)
        .arg("--still")
        .arg(&still)
        .arg("--output")
        .arg(&out)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let image = image::open(&out).unwrap();
    assert_eq!((image.width(), image.height()), (200, 200));

    std::fs::remove_dir_all(&dir).ok();
}
