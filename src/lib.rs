//! # FocusKit
//!
//! Autofocus and height-compensation controller for laser engraving and
//! cutting machines.
//!
//! A camera reports a focus metric (`dz`); FocusKit turns it into B-axis
//! corrections while engraving, builds a height map of the workpiece with a
//! raster scan, and follows that map while cutting.
//!
//! ## Architecture
//!
//! FocusKit is organized as a workspace with multiple crates:
//!
//! 1. **focuskit-core** - Data model, events, calibration tables, height surfaces
//! 2. **focuskit-settings** - Configuration files and validation
//! 3. **focuskit-automation** - Compensation state machine, scan session, power ramp
//! 4. **focuskit-communication** - Collaborator links and the async runtime
//! 5. **focuskit** - Replay binary that wires everything together

use std::path::Path;

use anyhow::Context;

pub use focuskit_automation::{Automator, Effect, Notification, ScanPhase};
pub use focuskit_communication::{
    AutomationHandle, AutomationListener, AutomationRuntime, LoggingMotionLink, LoggingPlayer,
    StatusSnapshot,
};
pub use focuskit_core::{
    AutomationEvent, AutomationState, CalibrationTable, HeightSurface, JsonSurfaceStore,
};
pub use focuskit_settings::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging
///
/// Honors `RUST_LOG` and defaults to `info`. Logs go to stderr so the final
/// status report on stdout stays machine readable. With `json` set, every
/// line is a JSON object.
pub fn init_logging(json: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .try_init()
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

/// Load the configuration
///
/// Without `path` the platform default location is used. Missing files fall
/// back to defaults; relative data paths in an existing file are resolved
/// against the file's directory.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => Config::default_path().context("Cannot locate the config directory")?,
    };

    let mut config = Config::load_or_default(&path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;

    if path.exists() {
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
    }

    Ok(config)
}

/// Parse one line of a recorded session
///
/// Blank lines and `#` comments yield `None`.
pub fn parse_event_line(line: &str) -> anyhow::Result<Option<AutomationEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let event = serde_json::from_str(line).with_context(|| format!("Invalid event: {}", line))?;
    Ok(Some(event))
}
