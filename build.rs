//! Build script for detecting system dependencies and providing installation guidance.
//!
//! OpenCV and pkg-config are only needed when the `camera` feature is enabled;
//! the default build is pure Rust.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if env::var_os("CARGO_FEATURE_CAMERA").is_some() {
        check_pkg_config();
        check_opencv();
    }

    if env::var_os("CARGO_FEATURE_ONNX").is_some() {
        check_models();
    }
}

fn check_opencv() {
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");
    println!("cargo:rerun-if-env-changed=OPENCV_LINK_PATHS");
    println!("cargo:rerun-if-env-changed=OPENCV_INCLUDE_PATHS");

    for package in ["opencv4", "opencv"] {
        let output = Command::new("pkg-config").args(["--modversion", package]).output();
        if let Ok(output) = output {
            if output.status.success() {
                let version = String::from_utf8_lossy(&output.stdout);
                println!("cargo:warning=Found OpenCV version: {}", version.trim());
                return;
            }
        }
    }

    println!("cargo:warning=OpenCV not found via pkg-config. The camera feature needs it.");
    println!("cargo:warning=On Ubuntu: sudo apt-get install libopencv-dev");
    println!("cargo:warning=On macOS: brew install opencv");
}

fn check_pkg_config() {
    let output = Command::new("pkg-config").arg("--version").output();

    match output {
        Ok(output) if output.status.success() => {}
        _ => {
            println!("cargo:warning=pkg-config not found. This is required to find OpenCV.");
            println!("cargo:warning=On Ubuntu: sudo apt-get install pkg-config");
            println!("cargo:warning=On macOS: brew install pkg-config");
        }
    }
}

fn check_models() {
    let manifest = env::var("CARGO_MANIFEST_DIR").unwrap_or_default();
    for model in ["assets/face_detector.onnx", "assets/face_landmarks.onnx"] {
        let path = std::path::Path::new(&manifest).join(model);
        if !path.exists() {
            println!("cargo:warning={model} not found; point detector paths in the config at your models");
        }
    }
}
