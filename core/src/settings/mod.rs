pub mod file;

use anyhow::Result;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// The key under which settings are persisted
pub const STORAGE_KEY: &str = "gis-viewer-settings";

/// Viewer settings. Persisted independently of layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub initial_zoom: f64,
    pub initial_lat: f64,
    pub initial_lng: f64,

    /// Minimum distance between retained ring points. `0` disables
    /// simplification.
    pub simplify_tolerance: f64,

    /// Layers with more features than this are simplified before rendering
    pub max_features_without_simplify: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            initial_zoom: 7.0,
            initial_lat: 23.685,
            initial_lng: 90.356,
            simplify_tolerance: 0.001,
            max_features_without_simplify: 500,
        }
    }
}

/// A partial settings change. `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub initial_zoom: Option<f64>,
    pub initial_lat: Option<f64>,
    pub initial_lng: Option<f64>,
    pub simplify_tolerance: Option<f64>,
    pub max_features_without_simplify: Option<usize>,
}

impl SettingsUpdate {
    /// Creates an update that changes a single setting. `key` may be given
    /// in camelCase (as persisted) or snake_case. Numbers must be finite.
    pub fn parse(key: &str, value: &str) -> Result<Self, SettingsError> {
        let invalid = || SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let float = || match value.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(f),
            _ => Err(invalid()),
        };

        let mut u = SettingsUpdate::default();
        match key {
            "initialZoom" | "initial_zoom" => u.initial_zoom = Some(float()?),
            "initialLat" | "initial_lat" => u.initial_lat = Some(float()?),
            "initialLng" | "initial_lng" => u.initial_lng = Some(float()?),
            "simplifyTolerance" | "simplify_tolerance" => {
                let t = float()?;
                if t < 0.0 {
                    return Err(invalid());
                }
                u.simplify_tolerance = Some(t)
            }
            "maxFeaturesWithoutSimplify" | "max_features_without_simplify" => {
                u.max_features_without_simplify =
                    Some(value.trim().parse::<usize>().map_err(|_| invalid())?)
            }
            _ => return Err(SettingsError::UnknownKey(key.to_string())),
        }
        Ok(u)
    }

    /// Returns a copy of `settings` with this update applied
    pub fn apply(&self, settings: &Settings) -> Settings {
        Settings {
            initial_zoom: self.initial_zoom.unwrap_or(settings.initial_zoom),
            initial_lat: self.initial_lat.unwrap_or(settings.initial_lat),
            initial_lng: self.initial_lng.unwrap_or(settings.initial_lng),
            simplify_tolerance: self
                .simplify_tolerance
                .unwrap_or(settings.simplify_tolerance),
            max_features_without_simplify: self
                .max_features_without_simplify
                .unwrap_or(settings.max_features_without_simplify),
        }
    }
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Unknown setting `{0}'")]
    UnknownKey(String),

    #[error("Invalid value `{value}' for setting `{key}'")]
    InvalidValue { key: String, value: String },

    #[error("Unable to serialize settings")]
    Serialize(#[from] serde_json::Error),

    #[error("Unable to access settings storage")]
    Storage(#[source] anyhow::Error),
}

/// A key-value store for persisted values
pub trait SettingsStore {
    /// Retrieve the value stored under the given key
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value under the given key, replacing the previous one
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// An implementation of the [`SettingsStore`] trait that keeps values in
/// memory
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: FxHashMap<String, String>,
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Loads settings from the store. Stored values are merged over the
/// defaults. Missing or unreadable settings yield the defaults.
pub fn load_settings(store: &dyn SettingsStore) -> Settings {
    let stored = match store.get(STORAGE_KEY) {
        Ok(Some(s)) => s,
        Ok(None) => return Settings::default(),
        Err(e) => {
            debug!("Unable to read settings, using defaults: {e:#}");
            return Settings::default();
        }
    };

    match serde_json::from_str(&stored) {
        Ok(s) => s,
        Err(e) => {
            debug!("Stored settings are corrupt, using defaults: {e}");
            Settings::default()
        }
    }
}

pub fn save_settings(
    store: &mut dyn SettingsStore,
    settings: &Settings,
) -> Result<(), SettingsError> {
    let s = serde_json::to_string(settings)?;
    store.set(STORAGE_KEY, &s).map_err(SettingsError::Storage)
}

/// Applies a partial update to the stored settings and saves the result
pub fn update_settings(
    store: &mut dyn SettingsStore,
    update: &SettingsUpdate,
) -> Result<Settings, SettingsError> {
    let settings = update.apply(&load_settings(store));
    save_settings(store, &settings)?;
    Ok(settings)
}

/// Replaces the stored settings with the defaults
pub fn reset_settings(store: &mut dyn SettingsStore) -> Result<Settings, SettingsError> {
    let settings = Settings::default();
    save_settings(store, &settings)?;
    Ok(settings)
}
