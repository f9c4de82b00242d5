use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, ensure};
use serde::Deserialize;

use crate::settings::{
    AnimationStyle, DEFAULT_SETTINGS_KEY, ImageFillMode, PlaybackSettings, SettingsStore,
};
use crate::shell::DEFAULT_POINTER_INACTIVITY;

pub const DEFAULT_SETTINGS_PATH: &str = "slidy-settings.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Root directory to scan recursively for images.
    pub photo_library_path: PathBuf,
    /// JSON file holding persisted playback settings.
    pub settings_path: PathBuf,
    /// Key the playback settings are stored under in `settings_path`.
    pub settings_key: String,
    /// Pointer idle time before the controls hide.
    #[serde(with = "humantime_serde")]
    pub pointer_inactivity: Duration,
    /// Optional deterministic seed for every shuffle.
    pub startup_shuffle_seed: Option<u64>,
    /// Shuffle the collection once after the startup scan.
    pub startup_shuffle: bool,
    /// Overrides for the built-in playback defaults, used when nothing is
    /// stored yet or the stored blob is unreadable.
    pub default_settings: DefaultSettings,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            photo_library_path: PathBuf::new(),
            settings_path: PathBuf::from(DEFAULT_SETTINGS_PATH),
            settings_key: DEFAULT_SETTINGS_KEY.to_string(),
            pointer_inactivity: DEFAULT_POINTER_INACTIVITY,
            startup_shuffle_seed: None,
            startup_shuffle: false,
            default_settings: DefaultSettings::default(),
        }
    }
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.photo_library_path.as_os_str().is_empty(),
            "photo-library-path must be set"
        );
        ensure!(
            !self.settings_path.as_os_str().is_empty(),
            "settings-path must not be empty"
        );
        ensure!(
            !self.settings_key.trim().is_empty(),
            "settings-key must not be empty"
        );
        ensure!(
            !self.pointer_inactivity.is_zero(),
            "pointer-inactivity must be greater than zero"
        );
        if let Some(interval) = self.default_settings.autoplay_interval {
            ensure!(
                interval >= Duration::from_millis(1),
                "default-settings.autoplay-interval must be at least 1ms"
            );
        }
        Ok(self)
    }

    pub fn settings_store(&self) -> SettingsStore {
        SettingsStore::new(&self.settings_path, &self.settings_key)
    }

    pub fn playback_defaults(&self) -> PlaybackSettings {
        self.default_settings.apply(PlaybackSettings::default())
    }
}

/// Partial playback settings in configuration form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct DefaultSettings {
    pub autoplay: Option<bool>,
    #[serde(with = "humantime_serde")]
    pub autoplay_interval: Option<Duration>,
    #[serde(rename = "loop")]
    pub loop_images: Option<bool>,
    pub shuffle_loop: Option<bool>,
    pub image_fill_mode: Option<ImageFillMode>,
    /// `none` disables animation.
    #[serde(deserialize_with = "deserialize_animation")]
    pub animation: Option<Option<AnimationStyle>>,
}

impl DefaultSettings {
    pub fn apply(&self, mut base: PlaybackSettings) -> PlaybackSettings {
        if let Some(autoplay) = self.autoplay {
            base.autoplay = autoplay;
        }
        if let Some(interval) = self.autoplay_interval {
            base.autoplay_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        }
        if let Some(loop_images) = self.loop_images {
            base.loop_images = loop_images;
        }
        if let Some(shuffle_loop) = self.shuffle_loop {
            base.shuffle_loop = shuffle_loop;
        }
        if let Some(fill) = self.image_fill_mode {
            base.image_fill_mode = fill;
        }
        if let Some(animation) = self.animation {
            base.animation = animation;
        }
        base.normalized()
    }
}

fn deserialize_animation<'de, D>(deserializer: D) -> Result<Option<Option<AnimationStyle>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let raw = String::deserialize(deserializer)?;
    AnimationStyle::parse_optional(&raw).map(Some).ok_or_else(|| {
        D::Error::unknown_variant(&raw, &["none", "fade", "slide", "slide-fade"])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_over_builtin_settings() {
        let overrides = DefaultSettings {
            autoplay: Some(false),
            autoplay_interval: Some(Duration::from_secs(3)),
            animation: Some(None),
            ..DefaultSettings::default()
        };
        let settings = overrides.apply(PlaybackSettings::default());
        assert!(!settings.autoplay);
        assert_eq!(settings.autoplay_interval_ms, 3000);
        assert_eq!(settings.animation, None);
        assert!(settings.loop_images);
    }
}
