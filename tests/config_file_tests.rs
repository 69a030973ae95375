//! Loading and saving YAML settings files

use face_overlay::config::{FeatureGroup, Settings, SliderKind};
use face_overlay::keypoints::Feature;
use face_overlay::pipeline::PipelineSettings;
use face_overlay::Error;
use std::time::Duration;

#[test]
fn test_settings_survive_a_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("face-overlay.yaml");

    let mut settings = Settings::default();
    settings.assets.default_identity = Some("kim".to_string());
    settings.video.camera_index = 2;
    settings.smoothing.filter = "none".to_string();
    settings
        .overlay
        .apply_slider(FeatureGroup::Mouth, SliderKind::OffsetY, 12.0)
        .unwrap();
    settings.overlay.set_enabled(Feature::Nose, false);
    settings.to_file(&path).unwrap();

    let loaded = Settings::from_file(&path).unwrap();
    loaded.validate().unwrap();
    assert_eq!(loaded.assets.default_identity.as_deref(), Some("kim"));
    assert_eq!(loaded.video.camera_index, 2);
    assert_eq!(loaded.smoothing.filter, "none");
    assert_eq!(loaded.overlay, settings.overlay);
}

#[test]
fn test_empty_file_gives_defaults() {
    let settings = Settings::from_yaml("{}").unwrap();
    settings.validate().unwrap();
    assert_eq!(settings.overlay, Settings::default().overlay);
    assert_eq!(settings.detection.confidence_threshold, 0.2);
}

#[test]
fn test_missing_and_malformed_files() {
    let err = Settings::from_file("/nonexistent/face-overlay.yaml").unwrap_err();
    assert!(matches!(err, Error::Io(_)));

    let err = Settings::from_yaml("video: [not, a, mapping]").unwrap_err();
    assert!(matches!(err, Error::ConfigError(_)));
}

#[test]
fn test_pipeline_settings_follow_video_section() {
    let yaml = "video:\n  frame_size:\n    width: 320\n    height: 240\n  tick_interval_ms: 33\n";
    let settings = Settings::from_yaml(yaml).unwrap();

    let pipeline = PipelineSettings::from_settings(&settings);
    assert_eq!((pipeline.frame_size.width, pipeline.frame_size.height), (320, 240));
    assert_eq!(pipeline.tick_interval, Duration::from_millis(33));
    assert_eq!(pipeline.smoothing_filter, "exponential:0.3");
}
