//! Configuration and settings management for FocusKit
//!
//! Provides configuration file handling, defaults, and validation.
//! Supports JSON and TOML file formats stored in the platform config directory.
//!
//! Configuration is organized into logical sections:
//! - Calibration (which table file to load)
//! - Automation (compensation delays, B-axis offset)
//! - Scan (raster program speeds, settle delay, surface file)
//! - Power (automatic laser power ramp and travel envelope)

use crate::error::{ConfigError, SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "focuskit";
const CONFIG_FILE: &str = "config.toml";

/// Calibration table selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationSettings {
    /// Calibration table file (.json or .toml)
    pub table_path: PathBuf,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            table_path: PathBuf::from("data/calibration/default_lens.json"),
        }
    }
}

/// Live compensation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationSettings {
    /// Delay between a stable pause and the engraving compensation (ms)
    pub engrave_delay_ms: u64,
    /// Delay between a playing tick and the cutting correction (ms)
    pub cut_delay_ms: u64,
    /// B-axis position that a zero correction maps to
    pub b_offset: f32,
    /// Send engraving corrections to the motion controller
    ///
    /// When false the correction is only reported.
    pub auto_send_b: bool,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            engrave_delay_ms: 2000,
            cut_delay_ms: 1000,
            b_offset: 0.0,
            auto_send_b: true,
        }
    }
}

/// Height scan settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Settling delay between reaching a sample and reading dz (ms)
    pub settle_delay_ms: u64,
    /// Travel feed rate for the raster program (units/min)
    pub feed_rate: f32,
    /// Acceleration for the raster program (units/s²)
    pub acceleration: f32,
    /// Where the last scanned surface is persisted
    pub surface_path: PathBuf,
    /// Largest grid a scan request may allocate
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
}

fn default_max_samples() -> usize {
    10_000
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1000,
            feed_rate: 6000.0,
            acceleration: 500.0,
            surface_path: PathBuf::from("surface.json"),
            max_samples: default_max_samples(),
        }
    }
}

/// Machine travel envelope used by the power ramp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TravelEnvelope {
    /// Minimum X
    pub min_x: f32,
    /// Maximum X
    pub max_x: f32,
    /// Minimum Y
    pub min_y: f32,
    /// Maximum Y
    pub max_y: f32,
}

impl Default for TravelEnvelope {
    fn default() -> Self {
        Self {
            min_x: 600.0,
            max_x: 2200.0,
            min_y: 0.0,
            max_y: 1500.0,
        }
    }
}

/// Automatic laser power settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerSettings {
    /// Ramp power with machine position
    pub auto_power: bool,
    /// Power at the far end of the air path
    pub min_power: f32,
    /// Power at the near end of the air path
    pub max_power: f32,
    /// Minimum change worth sending
    pub epsilon: f32,
    /// Minimum interval between power updates (ms)
    pub min_interval_ms: u64,
    /// Divisor applied to the power before it is sent
    pub output_divisor: f32,
    /// Travel envelope for the air path fraction
    #[serde(default)]
    pub envelope: TravelEnvelope,
}

impl Default for PowerSettings {
    fn default() -> Self {
        Self {
            auto_power: false,
            min_power: 1.0,
            max_power: 0.8,
            epsilon: 0.01,
            min_interval_ms: 1000,
            output_divisor: 5.0,
            envelope: TravelEnvelope::default(),
        }
    }
}

/// Complete application configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Calibration table selection
    #[serde(default)]
    pub calibration: CalibrationSettings,
    /// Live compensation
    #[serde(default)]
    pub automation: AutomationSettings,
    /// Height scan
    #[serde(default)]
    pub scan: ScanSettings,
    /// Automatic laser power
    #[serde(default)]
    pub power: PowerSettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform configuration directory for FocusKit
    pub fn config_dir() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| {
                ConfigError::UnsupportedPlatform(std::env::consts::OS.to_string()).into()
            })
    }

    /// Default configuration file path
    pub fn default_path() -> SettingsResult<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = match extension(path) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            other => {
                return Err(
                    ConfigError::UnsupportedFormat(other.unwrap_or("<none>").to_string()).into(),
                )
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load config from `path`, falling back to defaults when it does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match extension(path) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self)?,
            other => {
                return Err(
                    ConfigError::UnsupportedFormat(other.unwrap_or("<none>").to_string()).into(),
                )
            }
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| SettingsError::ConfigDirectory(e.to_string()))?;
        }
        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if self.calibration.table_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingPath("calibration.table_path".to_string()).into());
        }

        if self.automation.engrave_delay_ms == 0 {
            return Err(out_of_range("automation.engrave_delay_ms", 0));
        }

        if self.automation.cut_delay_ms == 0 {
            return Err(out_of_range("automation.cut_delay_ms", 0));
        }

        if !self.automation.b_offset.is_finite() {
            return Err(out_of_range("automation.b_offset", self.automation.b_offset));
        }

        if self.scan.surface_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingPath("scan.surface_path".to_string()).into());
        }

        if self.scan.feed_rate <= 0.0 {
            return Err(out_of_range("scan.feed_rate", self.scan.feed_rate));
        }

        if self.scan.acceleration <= 0.0 {
            return Err(out_of_range("scan.acceleration", self.scan.acceleration));
        }

        if self.scan.max_samples == 0 {
            return Err(out_of_range("scan.max_samples", 0));
        }

        // min > max is allowed here; the power ramp stays silent in that case
        if !(0.0..=1.0).contains(&self.power.min_power) {
            return Err(out_of_range("power.min_power", self.power.min_power));
        }

        if !(0.0..=1.0).contains(&self.power.max_power) {
            return Err(out_of_range("power.max_power", self.power.max_power));
        }

        if self.power.epsilon < 0.0 {
            return Err(out_of_range("power.epsilon", self.power.epsilon));
        }

        if self.power.output_divisor <= 0.0 {
            return Err(out_of_range("power.output_divisor", self.power.output_divisor));
        }

        let env = &self.power.envelope;
        if env.max_x <= env.min_x || env.max_y <= env.min_y {
            return Err(out_of_range(
                "power.envelope",
                format!("{}..{} x {}..{}", env.min_x, env.max_x, env.min_y, env.max_y),
            ));
        }

        Ok(())
    }

    /// Resolve relative data paths against `base`
    ///
    /// Used so paths in a config file are relative to that file.
    pub fn resolve_paths(&mut self, base: &Path) {
        if self.calibration.table_path.is_relative() {
            self.calibration.table_path = base.join(&self.calibration.table_path);
        }
        if self.scan.surface_path.is_relative() {
            self.scan.surface_path = base.join(&self.scan.surface_path);
        }
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

fn out_of_range(key: &str, value: impl ToString) -> SettingsError {
    ConfigError::ValueOutOfRange {
        key: key.to_string(),
        value: value.to_string(),
    }
    .into()
}
