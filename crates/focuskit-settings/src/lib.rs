//! FocusKit Settings Crate
//!
//! Handles application configuration: defaults, validation, and JSON/TOML
//! persistence in the platform configuration directory.

pub mod config;
pub mod error;

pub use config::{
    AutomationSettings, CalibrationSettings, Config, PowerSettings, ScanSettings, TravelEnvelope,
};
pub use error::{ConfigError, SettingsError, SettingsResult};
