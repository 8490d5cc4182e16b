//! Global settings of the kline session.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use std::sync::{LazyLock, RwLock};

use super::utility::get_file_path;

/// Default settings
fn default_settings() -> HashMap<String, SettingValue> {
    let mut settings = HashMap::new();

    // Log settings
    settings.insert("log.active".to_string(), SettingValue::Bool(true));
    settings.insert("log.level".to_string(), SettingValue::Int(20)); // INFO level
    settings.insert("log.console".to_string(), SettingValue::Bool(true));
    settings.insert("log.file".to_string(), SettingValue::Bool(false));
    settings.insert("log.json".to_string(), SettingValue::Bool(false));

    // Session settings
    settings.insert("session.symbol".to_string(), SettingValue::String("BTCUSDT".to_string()));
    settings.insert("session.interval".to_string(), SettingValue::String("1m".to_string()));
    settings.insert("backfill.limit".to_string(), SettingValue::Int(500));

    // Indicator settings
    settings.insert("indicator.window".to_string(), SettingValue::Int(20));
    settings.insert("indicator.active".to_string(), SettingValue::String(String::new()));

    // Binance settings
    settings.insert("binance.server".to_string(), SettingValue::String("REAL".to_string()));
    settings.insert("binance.proxy_host".to_string(), SettingValue::String(String::new()));
    settings.insert("binance.proxy_port".to_string(), SettingValue::Int(0));

    settings
}

/// Setting value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl SettingValue {
    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SettingValue::Float(f) => Some(*f),
            SettingValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Global settings container
pub struct Settings {
    settings: RwLock<HashMap<String, SettingValue>>,
}

impl Settings {
    /// Create new Settings with defaults, overridden by the settings file
    pub fn new() -> Self {
        Self::load_from(&get_file_path(SETTING_FILENAME))
    }

    /// Create Settings with defaults, overridden by the JSON file at `path`
    /// if it exists and parses.
    pub fn load_from(path: &Path) -> Self {
        let mut settings = default_settings();

        if let Some(file_settings) = load_settings_from_file(path) {
            settings.extend(file_settings);
        }

        Self {
            settings: RwLock::new(settings),
        }
    }

    /// Get a setting value
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.settings.read().ok()?.get(key).cloned()
    }

    /// Get a string setting
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(|s| s.to_string()))
    }

    /// Get an integer setting
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_int())
    }

    /// Get a non-negative integer setting
    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get_int(key).and_then(|i| usize::try_from(i).ok())
    }

    /// Get a float setting
    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_float())
    }

    /// Get a bool setting
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// Set a setting value
    pub fn set(&self, key: impl Into<String>, value: SettingValue) {
        if let Ok(mut settings) = self.settings.write() {
            settings.insert(key.into(), value);
        }
    }

    /// Get all settings as HashMap
    pub fn get_all(&self) -> HashMap<String, SettingValue> {
        self.settings.read()
            .map(|settings| settings.clone())
            .unwrap_or_default()
    }

    /// Save settings to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let settings = self.settings.read().map_err(|e| e.to_string())?;
        let json = serde_json::to_string_pretty(&*settings)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Save settings to the settings file
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&get_file_path(SETTING_FILENAME))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

/// Setting filename
const SETTING_FILENAME: &str = "kline_setting.json";

/// Load settings from JSON file
fn load_settings_from_file(filepath: &Path) -> Option<HashMap<String, SettingValue>> {
    if filepath.exists() {
        let content = fs::read_to_string(filepath).ok()?;
        match serde_json::from_str(&content) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!("Ignoring unreadable settings file {:?}: {}", filepath, e);
                None
            }
        }
    } else {
        None
    }
}

/// Global settings instance
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::new);
