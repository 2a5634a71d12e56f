//! Focus calibration tables
//!
//! A calibration table maps the camera focus metric (`dz`) to a B-axis
//! correction. Samples are ordered by strictly decreasing focus metric, the
//! direction of the physical calibration sweep, and lookups interpolate
//! linearly inside the first bracket that contains the metric. Metrics
//! outside the calibrated range never extrapolate.

use crate::error::{CalibrationError, CompensationError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One calibration measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f32, f32)", into = "(f32, f32)")]
pub struct CalibrationSample {
    /// Camera focus metric
    pub focus_metric: f32,
    /// B-axis correction for that metric
    pub correction: f32,
}

impl CalibrationSample {
    /// Create a new sample
    pub fn new(focus_metric: f32, correction: f32) -> Self {
        Self {
            focus_metric,
            correction,
        }
    }
}

impl From<(f32, f32)> for CalibrationSample {
    fn from((focus_metric, correction): (f32, f32)) -> Self {
        Self::new(focus_metric, correction)
    }
}

impl From<CalibrationSample> for (f32, f32) {
    fn from(sample: CalibrationSample) -> Self {
        (sample.focus_metric, sample.correction)
    }
}

#[derive(Debug, Deserialize)]
struct CalibrationFile {
    #[serde(default)]
    name: Option<String>,
    samples: Vec<CalibrationSample>,
}

/// Immutable, validated calibration table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationTable {
    name: String,
    samples: Vec<CalibrationSample>,
}

impl CalibrationTable {
    /// Build a table, validating the sample ordering
    pub fn new(
        name: impl Into<String>,
        samples: Vec<CalibrationSample>,
    ) -> Result<Self, CalibrationError> {
        if samples.len() < 2 {
            return Err(CalibrationError::TooFewSamples {
                count: samples.len(),
            });
        }

        for (index, sample) in samples.iter().enumerate() {
            if !sample.focus_metric.is_finite() || !sample.correction.is_finite() {
                return Err(CalibrationError::NonFinite { index });
            }
        }

        for (i, pair) in samples.windows(2).enumerate() {
            if pair[1].focus_metric >= pair[0].focus_metric {
                return Err(CalibrationError::NotDecreasing {
                    index: i + 1,
                    previous: pair[0].focus_metric,
                    current: pair[1].focus_metric,
                });
            }
        }

        Ok(Self {
            name: name.into(),
            samples,
        })
    }

    /// Build a table from `(focus_metric, correction)` pairs
    pub fn from_pairs(
        name: impl Into<String>,
        pairs: &[(f32, f32)],
    ) -> Result<Self, CalibrationError> {
        Self::new(name, pairs.iter().copied().map(Into::into).collect())
    }

    /// Parse a table from JSON text
    pub fn from_json_str(content: &str) -> Result<Self, CalibrationError> {
        let file: CalibrationFile = serde_json::from_str(content)?;
        Self::new(file.name.unwrap_or_else(|| "unnamed".to_string()), file.samples)
    }

    /// Parse a table from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, CalibrationError> {
        let file: CalibrationFile = toml::from_str(content)?;
        Self::new(file.name.unwrap_or_else(|| "unnamed".to_string()), file.samples)
    }

    /// Load a table from a `.json` or `.toml` file
    pub fn load_from_file(path: &Path) -> Result<Self, CalibrationError> {
        let content = std::fs::read_to_string(path)?;

        let table = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            Some("toml") => Self::from_toml_str(&content)?,
            other => {
                return Err(CalibrationError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };

        tracing::info!(
            "Loaded calibration table '{}' ({} samples) from {}",
            table.name,
            table.samples.len(),
            path.display()
        );
        Ok(table)
    }

    /// Convert a focus metric into a correction
    ///
    /// The bracket is the first adjacent pair `(s[i], s[i+1])` with
    /// `s[i+1].focus_metric <= metric < s[i].focus_metric`.
    pub fn lookup(&self, metric: f32) -> Result<f32, CompensationError> {
        self.samples
            .windows(2)
            .find(|pair| metric >= pair[1].focus_metric && metric < pair[0].focus_metric)
            .map(|pair| {
                let (upper, lower) = (pair[0], pair[1]);
                let t = (metric - lower.focus_metric) / (upper.focus_metric - lower.focus_metric);
                lower.correction + t * (upper.correction - lower.correction)
            })
            .ok_or(CompensationError::NoCalibrationEntry { metric })
    }

    /// Calibrated interval `[min, max)` of focus metrics
    pub fn range(&self) -> (f32, f32) {
        let first = self.samples[0].focus_metric;
        let last = self.samples[self.samples.len() - 1].focus_metric;
        (last, first)
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Samples in bracket-search order
    pub fn samples(&self) -> &[CalibrationSample] {
        &self.samples
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a validated table
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
