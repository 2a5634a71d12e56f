//! Error handling for FocusKit
//!
//! Provides error types for every layer of the compensation core:
//! - Compensation errors (no calibration entry, out of scan range, missing sample)
//! - Calibration table errors (invalid or unreadable table data)
//! - Surface errors (grid construction, sorting, persistence)
//!
//! All error types use `thiserror` for ergonomic error handling.

use std::io;
use thiserror::Error;

/// Compensation error type
///
/// Raised while turning a focus metric or a machine position into a
/// correction. All variants are recoverable: callers report them and
/// suppress motion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompensationError {
    /// The focus metric falls outside every calibrated bracket
    #[error("No entry in calibration table for dz={metric}")]
    NoCalibrationEntry {
        /// The focus metric that was looked up.
        metric: f32,
    },

    /// The machine position lies outside the scanned surface
    #[error("Position X{x} Y{y} is out of scan range")]
    OutOfScanRange {
        /// Requested X coordinate.
        x: f32,
        /// Requested Y coordinate.
        y: f32,
    },

    /// A scan sample could not be captured and needs operator input
    #[error("Sample {index} needs a manual value")]
    MissingSample {
        /// Capture-order index of the sample.
        index: usize,
    },

    /// The scanned surface has not been approved for cutting
    #[error("Scanned surface not approved")]
    ScanNotApproved,
}

/// Calibration table error type
#[derive(Error, Debug)]
pub enum CalibrationError {
    /// Fewer samples than needed to form a bracket
    #[error("Calibration table needs at least 2 samples, got {count}")]
    TooFewSamples {
        /// Number of samples supplied.
        count: usize,
    },

    /// A sample is NaN or infinite
    #[error("Calibration sample {index} is not finite")]
    NonFinite {
        /// Position of the offending sample.
        index: usize,
    },

    /// Focus metrics are not strictly decreasing
    #[error("Calibration table not strictly decreasing at sample {index}: {previous} -> {current}")]
    NotDecreasing {
        /// Position of the offending sample.
        index: usize,
        /// Focus metric of the preceding sample.
        previous: f32,
        /// Focus metric of the offending sample.
        current: f32,
    },

    /// Table file has an unsupported extension
    #[error("Unsupported calibration file format: {0}")]
    UnsupportedFormat(String),

    /// I/O error while reading the table
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON error while parsing the table
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML error while parsing the table
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Surface error type
///
/// Covers height surface construction, access before sorting, and
/// persistence. Persistence failures never modify an in-memory surface.
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// Grid parameters or a point list do not describe a valid grid
    #[error("Invalid surface grid: {0}")]
    InvalidGrid(String),

    /// The row-major representation was read before sorting
    #[error("Surface has not been sorted")]
    NotSorted,

    /// The surface holds no points
    #[error("Surface is empty")]
    Empty,

    /// Position outside the scanned extent
    #[error("Position X{x} Y{y} is out of scan range")]
    OutOfRange {
        /// Requested X coordinate.
        x: f32,
        /// Requested Y coordinate.
        y: f32,
    },

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SurfaceError {
    /// Check if this error came from reading or writing the surface file
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            SurfaceError::Io(_) | SurfaceError::Json(_) | SurfaceError::InvalidGrid(_)
        )
    }
}
