//! Persisted user settings: mode, output option and destination.
//!
//! Stored as a small JSON file so the next run starts where the last one
//! left off. Field names are camelCase to stay compatible with settings
//! written by the web front end.
//!
//! Loading never fails the caller: a missing file yields defaults, a corrupt
//! one is logged and also yields defaults. A field holding an unknown or
//! mistyped value falls back on its own; the other fields are kept. Saving is explicit and returns
//! errors, since the caller changed something and should know it was lost.

use crate::config::{ClientConfig, ConversionMode, ConversionSettings, OutputOption};
use crate::error::SettingsError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The three persisted fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default, deserialize_with = "or_default")]
    pub selected_mode: ConversionMode,
    #[serde(default, deserialize_with = "or_default")]
    pub output_option: OutputOption,
    #[serde(default, deserialize_with = "or_default")]
    pub destination_path: String,
}

/// Decode one field, substituting its default when the stored value does
/// not fit (for example a mode name this build does not know).
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        warn!("Ignoring stored setting: {}", e);
        T::default()
    }))
}

impl UserSettings {
    pub fn to_conversion_settings(&self) -> ConversionSettings {
        let settings = ConversionSettings::new(self.selected_mode, self.output_option);
        if self.destination_path.is_empty() {
            settings
        } else {
            settings.with_destination(self.destination_path.clone())
        }
    }
}

impl From<&ConversionSettings> for UserSettings {
    fn from(s: &ConversionSettings) -> Self {
        Self {
            selected_mode: s.mode,
            output_option: s.output_option,
            destination_path: s.destination_path.clone().unwrap_or_default(),
        }
    }
}

/// A settings file on disk.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<platform config dir>/giaconvert/settings.json`.
    pub fn default_location() -> Result<PathBuf, SettingsError> {
        dirs::config_dir()
            .map(|d| d.join("giaconvert").join("settings.json"))
            .ok_or(SettingsError::NoConfigDir)
    }

    /// Use the configured path, or the platform default.
    pub fn from_config(config: &ClientConfig) -> Result<Self, SettingsError> {
        match &config.settings_path {
            Some(p) => Ok(Self::new(p)),
            None => Ok(Self::new(Self::default_location()?)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file. `Ok(None)` if it does not exist.
    pub fn try_load(&self) -> Result<Option<UserSettings>, SettingsError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| SettingsError::Json {
                path: self.path.clone(),
                source,
            })
    }

    /// Read the file, falling back to defaults.
    pub fn load(&self) -> UserSettings {
        match self.try_load() {
            Ok(Some(s)) => s,
            Ok(None) => UserSettings::default(),
            Err(e) => {
                warn!("Failed to load user settings, using defaults: {}", e);
                UserSettings::default()
            }
        }
    }

    /// Write the file atomically (temp file + rename).
    pub fn save(&self, settings: &UserSettings) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(settings).map_err(|source| SettingsError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }

    /// Save `next` only if it differs from `current`. Returns whether it wrote.
    pub fn update(&self, current: &UserSettings, next: &UserSettings) -> Result<bool, SettingsError> {
        if current == next {
            return Ok(false);
        }
        self.save(next)?;
        Ok(true)
    }
}
