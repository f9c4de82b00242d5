use std::fs;

use serde_json::{Value, json};
use slidy::settings::{
    AnimationStyle, DEFAULT_SETTINGS_KEY, ImageFillMode, PlaybackSettings, SettingsStore,
};
use tempfile::tempdir;

#[test]
fn missing_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let store = SettingsStore::new(dir.path().join("absent.json"), DEFAULT_SETTINGS_KEY);
    assert_eq!(
        store.load_or(&PlaybackSettings::default()),
        PlaybackSettings::default()
    );
}

#[test]
fn corrupt_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, "{ not json").unwrap();
    let store = SettingsStore::new(&path, DEFAULT_SETTINGS_KEY);
    assert_eq!(
        store.load_or(&PlaybackSettings::default()),
        PlaybackSettings::default()
    );
}

#[test]
fn invalid_value_under_key_yields_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(
        &path,
        json!({ "slideshow:settings": { "autoplay": "sometimes" } }).to_string(),
    )
    .unwrap();
    let store = SettingsStore::new(&path, DEFAULT_SETTINGS_KEY);
    assert_eq!(
        store.load_or(&PlaybackSettings::default()),
        PlaybackSettings::default()
    );
}

#[test]
fn partial_blob_is_merged_over_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(
        &path,
        json!({ "slideshow:settings": { "shuffleLoop": true, "autoplayInterval": 0 } }).to_string(),
    )
    .unwrap();
    let store = SettingsStore::new(&path, DEFAULT_SETTINGS_KEY);
    let loaded = store.load_or(&PlaybackSettings::default());
    assert!(loaded.shuffle_loop);
    assert!(loaded.autoplay);
    assert_eq!(loaded.autoplay_interval_ms, 1);
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempdir().unwrap();
    let store = SettingsStore::new(dir.path().join("nested/dir/settings.json"), "custom");
    let settings = PlaybackSettings {
        autoplay: false,
        autoplay_interval_ms: 90_000,
        loop_images: false,
        shuffle_loop: true,
        image_fill_mode: ImageFillMode::Cover,
        animation: None,
    };
    store.save(&settings).unwrap();
    assert_eq!(store.load_or(&PlaybackSettings::default()), settings);

    let raw: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(raw["custom"]["autoplayInterval"], json!(90_000));
    assert_eq!(raw["custom"]["imageFillMode"], json!("cover"));
    assert_eq!(raw["custom"]["animation"], Value::Null);
}

#[test]
fn save_keeps_unrelated_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, json!({ "theme": "dark" }).to_string()).unwrap();
    let store = SettingsStore::new(&path, DEFAULT_SETTINGS_KEY);
    let settings = PlaybackSettings {
        animation: Some(AnimationStyle::Fade),
        ..PlaybackSettings::default()
    };
    store.save(&settings).unwrap();

    let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["theme"], json!("dark"));
    assert_eq!(raw[DEFAULT_SETTINGS_KEY]["animation"], json!("fade"));
}

#[test]
fn save_replaces_a_corrupt_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, "[1, 2").unwrap();
    let store = SettingsStore::new(&path, DEFAULT_SETTINGS_KEY);
    let settings = PlaybackSettings {
        loop_images: false,
        ..PlaybackSettings::default()
    };
    store.save(&settings).unwrap();
    assert_eq!(store.load_or(&PlaybackSettings::default()), settings);
}
