//! Configuration files and presets


use face_align_capture::{
    config::{CenterTolerance, Config, GuidelineSize, OutputFormat, Preset, ScaleMode, EXAMPLE_CONFIG},
    Error,
};
use test_helpers::scratch_dir;

#[test]
fn test_saved_config_loads_back() {
    let dir = scratch_dir("config");
    let path = dir.join("config.yaml");

    let mut config = Config::default().with_preset(Preset::Ellipse);
    config.alignment.center_tolerance = CenterTolerance::Pixels(48.0);
    config.capture.format = OutputFormat::Webp;
    config.capture.mirror = true;
    config.scheduler.target_fps = 60;
    config.to_file(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.alignment, config.alignment);
    assert_eq!(loaded.capture, config.capture);
    assert_eq!(loaded.scheduler.target_fps, 60);
    loaded.validate().unwrap();

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_example_config_file_is_valid() {
    let dir = scratch_dir("example-config");
    let path = dir.join("example.yaml");
    std::fs::write(&path, EXAMPLE_CONFIG).unwrap();

    let config = Config::from_file(&path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.alignment.guideline, GuidelineSize::Divisor(4.0));
    assert_eq!(config.alignment.scale_mode, ScaleMode::SingleAxis);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_malformed_config_file() {
    let dir = scratch_dir("bad-config");
    let path = dir.join("bad.yaml");
    std::fs::write(&path, "alignment:\n  min_scale: [1, 2]\n").unwrap();

    assert!(matches!(Config::from_file(&path), Err(Error::ConfigError(_))));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_every_preset_is_valid() {
    for preset in [
        Preset::Standard,
        Preset::Ellipse,
        Preset::MultiFace,
        Preset::HighResolution,
    ] {
        let config = Config::default().with_preset(preset);
        assert!(config.validate().is_ok(), "{preset} should validate");
        assert_eq!(preset.to_string().parse::<Preset>().unwrap(), preset);
    }
}

#[test]
fn test_preset_resets_previous_overrides() {
    let mut config = Config::default();
    config.alignment.min_scale = 0.3;
    config.capture.mirror = true;
    config.scheduler.target_fps = 15;

    let config = config.with_preset(Preset::Standard);
    assert_eq!(config.alignment.min_scale, 0.6);
    assert!(!config.capture.mirror);
    // the scheduler section is not part of a preset
    assert_eq!(config.scheduler.target_fps, 15);
}
