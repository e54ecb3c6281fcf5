//! Configuration file handling.
//!
//! Settings live in a single TOML file. Every section is optional and every
//! field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! [rotation]
//! mode = "history"
//! auto_focus_on_update = true
//!
//! [filter]
//! block_folders = true
//! block_shaders = false
//!
//! [history]
//! max_entries = 50
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::logging::{LogConfig, LogLevel};
use crate::selection_filter::BlockRules;

/// Smallest accepted history capacity.
pub const MIN_HISTORY_ENTRIES: usize = 10;
/// Largest accepted history capacity.
pub const MAX_HISTORY_ENTRIES: usize = 200;

// =============================================================================
// Enums
// =============================================================================

/// Dispatch policy applied when the selection changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
    /// Round-robin: the head panel shows the selection, then moves to the tail.
    #[default]
    Cycle,
    /// Cascade: panel *i* shows the *i*-th most recent selection.
    History,
}

impl std::fmt::Display for RotationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cycle => f.write_str("cycle"),
            Self::History => f.write_str("history"),
        }
    }
}

impl FromStr for RotationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cycle" => Ok(Self::Cycle),
            "history" => Ok(Self::History),
            _ => Err(format!(
                "unknown rotation mode: {s}. Expected one of: cycle, history"
            )),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-friendly output
    #[default]
    Pretty,
    /// JSON lines
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown log format: {s}. Expected pretty or json")),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// `[rotation]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    pub mode: RotationMode,
    /// Focus the updated panel after each rotation step
    pub auto_focus_on_update: bool,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            mode: RotationMode::Cycle,
            auto_focus_on_update: true,
        }
    }
}

/// `[history]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Entries kept in the selection history (clamped to 10..=200)
    pub max_entries: usize,
    pub record_scene_objects: bool,
    pub record_assets: bool,
    /// Drop entries for destroyed objects when a session starts
    pub auto_clean_invalid: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            record_scene_objects: true,
            record_assets: true,
            auto_clean_invalid: true,
        }
    }
}

fn default_max_entries() -> usize {
    50
}

/// Clamp a requested history capacity into the accepted range.
#[must_use]
pub fn clamp_history_entries(requested: usize) -> usize {
    requested.clamp(MIN_HISTORY_ENTRIES, MAX_HISTORY_ENTRIES)
}

// =============================================================================
// Root config
// =============================================================================

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rotation: RotationConfig,
    pub filter: BlockRules,
    pub history: HistoryConfig,
    pub logging: LogConfig,
}

impl Config {
    /// Parse from TOML text and normalize.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(text).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let shown = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(shown.clone())
            } else {
                ConfigError::ReadFailed(shown.clone(), e.to_string())
            }
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %shown, mode = %config.rotation.mode, "loaded config");
        Ok(config)
    }

    /// Load from `path`, treating a missing file as "all defaults".
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load_from(path) {
            Err(ConfigError::FileNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeFailed(e.to_string()))
    }

    /// Write to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let text = self.to_toml_string()?;
        let shown = path.display().to_string();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::ReadFailed(shown.clone(), e.to_string()))?;
            }
        }
        std::fs::write(path, text).map_err(|e| ConfigError::ReadFailed(shown, e.to_string()))
    }

    /// Default config location under the platform config directory.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("panel-rotation")
            .join("config.toml")
    }

    /// Bring out-of-range values back into range.
    pub fn normalize(&mut self) {
        let clamped = clamp_history_entries(self.history.max_entries);
        if clamped != self.history.max_entries {
            tracing::warn!(
                requested = self.history.max_entries,
                clamped,
                "history.max_entries out of range"
            );
            self.history.max_entries = clamped;
        }
    }

    /// Reject values that cannot be normalized.
    pub fn validate(&self) -> Result<(), ConfigError> {
        LogLevel::from_str(&self.logging.level).map_err(ConfigError::ValidationError)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.rotation.mode, RotationMode::Cycle);
        assert!(config.rotation.auto_focus_on_update);
        assert_eq!(config.history.max_entries, 50);
        assert!(config.filter.block_folders);
        assert!(!config.filter.block_fonts);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [rotation]
            mode = "history"

            [filter]
            block_shaders = true
            "#,
        )
        .unwrap();
        assert_eq!(config.rotation.mode, RotationMode::History);
        assert!(config.rotation.auto_focus_on_update);
        assert!(config.filter.block_shaders);
        assert!(config.filter.block_default_assets);
    }

    #[test]
    fn history_capacity_is_clamped() {
        let low = Config::from_toml_str("[history]\nmax_entries = 2").unwrap();
        assert_eq!(low.history.max_entries, MIN_HISTORY_ENTRIES);
        let high = Config::from_toml_str("[history]\nmax_entries = 5000").unwrap();
        assert_eq!(high.history.max_entries, MAX_HISTORY_ENTRIES);
    }

    #[test]
    fn invalid_log_level_rejected() {
        let err = Config::from_toml_str("[logging]\nlevel = \"shouty\"").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn bad_toml_is_parse_error() {
        let err = Config::from_toml_str("[rotation\nmode=").unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed(_)));
        let err = Config::from_toml_str("[rotation]\nmode = \"spiral\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed(_)));
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("config.toml");
        let mut config = Config::default();
        config.rotation.mode = RotationMode::History;
        config.history.record_assets = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_variants() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::FileNotFound(_))
        ));
        assert_eq!(Config::load_or_default(&path).unwrap(), Config::default());
    }

    #[test]
    fn rotation_mode_parse_and_display() {
        assert_eq!("Cycle".parse::<RotationMode>().unwrap(), RotationMode::Cycle);
        assert_eq!(
            "HISTORY".parse::<RotationMode>().unwrap(),
            RotationMode::History
        );
        assert!("spiral".parse::<RotationMode>().is_err());
        assert_eq!(RotationMode::History.to_string(), "history");
    }

    #[test]
    fn default_path_is_under_app_dir() {
        assert!(Config::default_path().ends_with("panel-rotation/config.toml"));
    }
}
