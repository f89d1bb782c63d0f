//! Tests for configuration loading, validation, and persistence

use camrec::config::RecorderConfig;
use camrec::types::{MediaConstraints, MediaMime};
use tempfile::tempdir;

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempdir().expect("tempdir");
    let config = RecorderConfig::load_from_file(dir.path().join("nope.toml")).unwrap();
    assert_eq!(config.constraints(), MediaConstraints::audio_video());
    assert_eq!(config.container(), Some(MediaMime::Mp4));
}

#[test]
fn saved_config_loads_back_identically() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("camrec.toml");

    let mut config = RecorderConfig::default();
    config.media.audio = false;
    config.media.device_id = Some("1".to_string());
    config.media.fps = 24.0;
    config.encode.bitrate = 3_000_000;
    config.toast.auto_dismiss_ms = 5000;
    config.save_to_file(&path).unwrap();

    let loaded = RecorderConfig::load_from_file(&path).unwrap();
    assert!(!loaded.media.audio);
    assert_eq!(loaded.media.device_id.as_deref(), Some("1"));
    assert!((loaded.media.fps - 24.0).abs() < f64::EPSILON);
    assert_eq!(loaded.encode.bitrate, 3_000_000);
    assert_eq!(loaded.toast.auto_dismiss_ms, 5000);
}

#[test]
fn invalid_values_are_rejected_on_load() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("bad.toml");

    let mut config = RecorderConfig::default();
    config.encode.container = "video/avi".to_string();
    // Bypass save-side validation by writing the TOML directly.
    std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

    assert!(RecorderConfig::load_from_file(&path).is_err());
}

#[test]
fn garbage_toml_is_an_error_not_a_default() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("garbage.toml");
    std::fs::write(&path, "not = [valid").unwrap();
    assert!(RecorderConfig::load_from_file(&path).is_err());
}
