//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Tick cadence and the starting ratio
//! - Ratio entry precision, cap and preset buttons
//! - Break alert sound and lead time
//! - History display and export location
//!
//! Configuration is stored at `~/.config/flowmodoro/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::data_dir;
use crate::alert::DEFAULT_LEAD_MS;
use crate::error::ConfigError;
use crate::history::RENDER_LIMIT;
use crate::ratio::{Ratio, RatioBounds, RatioPrecision, RatioStore};
use crate::timer::{EngineOptions, DEFAULT_TICK_INTERVAL_MS};

/// Timer-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Ratio active at startup, e.g. `5.0` for 5:1.
    #[serde(default = "default_ratio")]
    pub default_ratio: f64,
}

/// Ratio entry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatioConfig {
    #[serde(default)]
    pub precision: RatioPrecision,
    /// Largest accepted ratio. Zero means unbounded.
    #[serde(default = "default_ratio_max")]
    pub max: f64,
    /// Whole `n:1` ratios offered as buttons.
    #[serde(default = "default_presets")]
    pub presets: Vec<u32>,
}

/// Break alert configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Path to the alert sound file (optional).
    /// If unset, the terminal bell is used.
    #[serde(default)]
    pub sound: Option<String>,
    #[serde(default = "default_lead_secs")]
    pub lead_secs: u64,
    #[serde(default)]
    pub muted: bool,
}

/// History configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_render_limit")]
    pub render_limit: usize,
    /// Directory exports are written to. Defaults to the working directory.
    #[serde(default)]
    pub export_dir: Option<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/flowmodoro/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub ratio: RatioConfig,
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

// Default functions
fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}
fn default_ratio() -> f64 {
    Ratio::DEFAULT.as_f64()
}
fn default_ratio_max() -> f64 {
    Ratio::MAX_CAPPED.as_f64()
}
fn default_presets() -> Vec<u32> {
    vec![1, 2, 3, 4, 5]
}
fn default_true() -> bool {
    true
}
fn default_lead_secs() -> u64 {
    DEFAULT_LEAD_MS / 1000
}
fn default_render_limit() -> usize {
    RENDER_LIMIT
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            default_ratio: default_ratio(),
        }
    }
}

impl Default for RatioConfig {
    fn default() -> Self {
        Self {
            precision: RatioPrecision::default(),
            max: default_ratio_max(),
            presets: default_presets(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: None,
            lead_secs: default_lead_secs(),
            muted: false,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            render_limit: default_render_limit(),
            export_dir: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timer: TimerConfig::default(),
            ratio: RatioConfig::default(),
            alert: AlertConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let not_a_number = || invalid(format!("cannot parse '{value}' as number"));
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            let n = value.parse::<f64>().map_err(|_| not_a_number())?;
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(not_a_number)?
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    // Unset optional: take JSON if it parses (numbers, null), else a string.
                    serde_json::Value::Null => serde_json::from_str(value)
                        .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or create the default file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Self = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate().map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// See [`Config::save`].
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving. Returns error if key is
    /// unknown or the value does not fit the key's type.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] or [`ConfigError::InvalidValue`].
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Self = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check values that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max = self.ratio.max;
        let scaled = (max * f64::from(Ratio::SCALE)).round();
        if !max.is_finite() || max < 0.0 || (max > 0.0 && scaled < 1.0) {
            return Err(ConfigError::InvalidValue {
                key: "ratio.max".to_string(),
                message: format!("{max} must be 0 (no cap) or at least 0.1"),
            });
        }
        Ok(())
    }

    /// Set a config value by key and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    /// Bounds for ratio entry. Zero means uncapped; [`Config::validate`]
    /// rules out caps that would round to zero.
    pub fn ratio_bounds(&self) -> RatioBounds {
        let max = self.ratio.max;
        if max.is_finite() && max > 0.0 {
            let scaled = (max * f64::from(Ratio::SCALE)).round().max(1.0);
            RatioBounds {
                max: Ratio::from_scaled(scaled.min(f64::from(u32::MAX)) as u32),
            }
        } else {
            RatioBounds::unbounded()
        }
    }

    /// Engine switches derived from this configuration.
    ///
    /// An invalid `timer.default_ratio` falls back to 5:1.
    pub fn engine_options(&self) -> EngineOptions {
        let bounds = self.ratio_bounds();
        let mut store = RatioStore::new(Ratio::DEFAULT, bounds, self.ratio.precision);
        let initial_ratio = store
            .set_ratio_value(self.timer.default_ratio)
            .unwrap_or_else(|e| {
                warn!(error = %e, "invalid timer.default_ratio, using {}", Ratio::DEFAULT);
                Ratio::DEFAULT
            });

        EngineOptions {
            initial_ratio,
            ratio_bounds: bounds,
            ratio_precision: self.ratio.precision,
            alert_enabled: self.alert.enabled,
            tick_interval_ms: self.timer.tick_interval_ms,
            history_limit: self.history.render_limit,
        }
    }

    pub fn alert_lead_ms(&self) -> u64 {
        self.alert.lead_secs.saturating_mul(1000)
    }
}
