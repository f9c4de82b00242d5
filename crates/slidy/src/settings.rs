use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

/// Key the settings blob is stored under inside the settings file.
pub const DEFAULT_SETTINGS_KEY: &str = "slideshow:settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageFillMode {
    Cover,
    #[default]
    Contain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnimationStyle {
    Fade,
    Slide,
    SlideFade,
}

impl AnimationStyle {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Fade => "fade",
            Self::Slide => "slide",
            Self::SlideFade => "slide-fade",
        }
    }

    /// Parse a user-facing name; `none` (or empty) disables animation.
    pub fn parse_optional(raw: &str) -> Option<Option<Self>> {
        match raw.trim() {
            "" | "none" => Some(None),
            "fade" => Some(Some(Self::Fade)),
            "slide" => Some(Some(Self::Slide)),
            "slide-fade" => Some(Some(Self::SlideFade)),
            _ => None,
        }
    }
}

impl fmt::Display for AnimationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Playback configuration persisted between runs.
///
/// Field names on the wire follow the settings blob written by earlier
/// versions (`autoplayInterval`, `shuffleLoop`, ...), so existing files keep
/// loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSettings {
    pub autoplay: bool,
    /// Delay between automatic advances, in milliseconds. Always at least 1.
    #[serde(rename = "autoplayInterval")]
    pub autoplay_interval_ms: u64,
    #[serde(rename = "loop")]
    pub loop_images: bool,
    pub shuffle_loop: bool,
    pub image_fill_mode: ImageFillMode,
    /// `None` replaces images without any transition.
    pub animation: Option<AnimationStyle>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            autoplay: true,
            autoplay_interval_ms: 5000,
            loop_images: true,
            shuffle_loop: false,
            image_fill_mode: ImageFillMode::Contain,
            animation: Some(AnimationStyle::SlideFade),
        }
    }
}

impl PlaybackSettings {
    pub fn autoplay_interval(&self) -> Duration {
        Duration::from_millis(self.autoplay_interval_ms.max(1))
    }

    /// Clamp values that the settings form would never produce.
    pub fn normalized(mut self) -> Self {
        self.autoplay_interval_ms = self.autoplay_interval_ms.max(1);
        self
    }

    /// Human readable interval, e.g. `5s` or `1m 30s`.
    pub fn describe_interval(&self) -> String {
        humantime::format_duration(self.autoplay_interval()).to_string()
    }
}

/// JSON key/value file holding the settings blob.
///
/// Reads never fail: a missing file, a missing key or a value that does not
/// parse all yield the supplied defaults.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    key: String,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn load_or(&self, defaults: &PlaybackSettings) -> PlaybackSettings {
        let entries = match self.read_entries() {
            Ok(Some(entries)) => entries,
            Ok(None) => {
                debug!(path = %self.path.display(), "settings file missing; using defaults");
                return defaults.clone();
            }
            Err(err) => {
                warn!(path = %self.path.display(), "settings file unreadable; using defaults: {err:#}");
                return defaults.clone();
            }
        };

        let Some(stored) = entries.get(&self.key) else {
            debug!(key = %self.key, "no stored settings; using defaults");
            return defaults.clone();
        };

        match merge_over_defaults(defaults, stored) {
            Ok(settings) => settings.normalized(),
            Err(err) => {
                warn!(key = %self.key, "stored settings invalid; using defaults: {err}");
                defaults.clone()
            }
        }
    }

    /// Write `settings` under this store's key, keeping other keys intact.
    pub fn save(&self, settings: &PlaybackSettings) -> Result<()> {
        // A corrupt file is replaced rather than blocking every later save.
        let mut entries = self.read_entries().ok().flatten().unwrap_or_default();
        let value = serde_json::to_value(settings).context("failed to encode settings")?;
        entries.insert(self.key.clone(), value);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let encoded = serde_json::to_string_pretty(&JsonValue::Object(entries))
            .context("failed to encode settings file")?;
        std::fs::write(&self.path, encoded)
            .with_context(|| format!("failed to write settings to {}", self.path.display()))?;
        debug!(path = %self.path.display(), key = %self.key, "settings saved");
        Ok(())
    }

    fn read_entries(&self) -> Result<Option<Map<String, JsonValue>>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_str::<JsonValue>(&raw)? {
            JsonValue::Object(map) => Ok(Some(map)),
            other => anyhow::bail!("expected a JSON object, found {other}"),
        }
    }
}

/// Overlay the stored object on the defaults so blobs written before a field
/// existed still load.
fn merge_over_defaults(
    defaults: &PlaybackSettings,
    stored: &JsonValue,
) -> serde_json::Result<PlaybackSettings> {
    let mut base = serde_json::to_value(defaults)?;
    if let (JsonValue::Object(base), JsonValue::Object(stored)) = (&mut base, stored) {
        for (key, value) in stored {
            base.insert(key.clone(), value.clone());
        }
        serde_json::from_value(JsonValue::Object(std::mem::take(base)))
    } else {
        serde_json::from_value(stored.clone())
    }
}
