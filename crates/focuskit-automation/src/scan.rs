//! Height scan session.
//!
//! Owns the scanned [`HeightSurface`] and the capture cursor. The session is
//! purely data: deferred snapshots and player control are driven by the
//! automator, which turns the outcomes returned here into effects.

use focuskit_core::{CompensationError, HeightSurface, SurfacePoint};
use focuskit_settings::ScanSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::program::generate_scan_program;

/// Scan session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScanPhase {
    /// No scan has run since the surface was last replaced
    #[default]
    Idle,
    /// The program is running and samples are being captured
    Scanning,
    /// Waiting for the operator to supply a sample
    AwaitingEntry,
    /// Every sample was captured and the surface is sorted
    Complete,
    /// The scan was cancelled or stopped early
    Cancelled,
}

impl ScanPhase {
    /// Check if a scan is in progress
    pub fn is_active(&self) -> bool {
        matches!(self, ScanPhase::Scanning | ScanPhase::AwaitingEntry)
    }
}

/// Rejected scan session operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    /// A scan is already in progress
    #[error("A scan is already in progress")]
    AlreadyScanning,

    /// The operation needs a running scan
    #[error("No scan in progress")]
    NotScanning,

    /// No sample is waiting for a manual value
    #[error("No missing entry requested")]
    NoEntryRequested,

    /// The first sample has nothing to repeat
    #[error("Sample 0 needs an explicit value")]
    FirstSampleNeedsValue,

    /// There is no complete surface to approve
    #[error("No complete scan to approve")]
    NothingToApprove,

    /// The grid could not be built
    #[error("Invalid scan grid: {0}")]
    InvalidGrid(String),

    /// The requested grid exceeds the configured sample limit
    #[error("Scan needs {samples} samples, limit is {limit}")]
    TooManySamples {
        /// Samples the request would capture
        samples: usize,
        /// Configured maximum
        limit: usize,
    },

    /// Every cell already holds a sample
    #[error("All {total} samples already captured")]
    GridFull {
        /// Samples in the grid
        total: usize,
    },
}

/// Result of a snapshot or manual entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureOutcome {
    /// The value was stored at `index`
    Stored {
        /// Capture-order index that was written
        index: usize,
        /// Stored height
        value: f32,
        /// Samples stored so far
        captured: usize,
        /// Samples in the grid
        total: usize,
    },
    /// The sample at `index` needs a manual value
    Missing {
        /// Capture-order index waiting for a value
        index: usize,
    },
}

/// Result of the player stopping
#[derive(Debug, Clone, PartialEq)]
pub enum ScanFinish {
    /// All samples captured; the sorted surface should be persisted
    Complete(HeightSurface),
    /// Stopped early; the partial surface was dropped
    Incomplete {
        /// Samples stored before the stop
        captured: usize,
        /// Samples in the grid
        total: usize,
    },
}

/// Height scan session
#[derive(Debug, Clone, Default)]
pub struct ScanSession {
    phase: ScanPhase,
    surface: HeightSurface,
    capture_index: usize,
    approved: bool,
}

impl ScanSession {
    /// Create an idle session with an empty surface
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a scan and return the raster program
    ///
    /// The previous surface is discarded and approval is revoked.
    pub fn start(
        &mut self,
        width: u32,
        height: u32,
        step: u32,
        left_offset: u32,
        settings: &ScanSettings,
    ) -> Result<String, ScanError> {
        if self.phase.is_active() {
            return Err(ScanError::AlreadyScanning);
        }

        let samples = HeightSurface::sample_count(width, height, step, left_offset)
            .map_err(|e| ScanError::InvalidGrid(e.to_string()))?;
        if samples > settings.max_samples {
            return Err(ScanError::TooManySamples {
                samples,
                limit: settings.max_samples,
            });
        }

        let surface = HeightSurface::create_zero_surface(width, height, step, left_offset)
            .map_err(|e| ScanError::InvalidGrid(e.to_string()))?;
        let program = generate_scan_program(&surface, settings);

        info!(
            "Starting height scan: {} rows x {} cols",
            surface.rows(),
            surface.cols()
        );

        self.surface = surface;
        self.capture_index = 0;
        self.approved = false;
        self.phase = ScanPhase::Scanning;
        Ok(program)
    }

    /// Store the result of a deferred snapshot
    ///
    /// Snapshots past the last cell are refused and leave the cursor alone.
    pub fn capture(
        &mut self,
        correction: Result<f32, CompensationError>,
    ) -> Result<CaptureOutcome, ScanError> {
        if self.phase != ScanPhase::Scanning {
            return Err(ScanError::NotScanning);
        }
        if self.capture_index >= self.surface.len() {
            return Err(ScanError::GridFull {
                total: self.surface.len(),
            });
        }

        match correction {
            Ok(value) => self.store(value),
            Err(e) => {
                warn!("Scan sample {}: {}", self.capture_index, e);
                self.phase = ScanPhase::AwaitingEntry;
                Ok(CaptureOutcome::Missing {
                    index: self.capture_index,
                })
            }
        }
    }

    /// Answer a missing-entry request
    ///
    /// `None` repeats the previous sample's height, which the first sample
    /// does not have.
    pub fn supply(&mut self, value: Option<f32>) -> Result<CaptureOutcome, ScanError> {
        if self.phase != ScanPhase::AwaitingEntry {
            return Err(ScanError::NoEntryRequested);
        }

        let value = match value {
            Some(v) => v,
            None => {
                let previous = self
                    .capture_index
                    .checked_sub(1)
                    .and_then(|i| self.surface.point(i))
                    .ok_or(ScanError::FirstSampleNeedsValue)?;
                debug!(
                    "Repeating sample {} for {}",
                    self.capture_index - 1,
                    self.capture_index
                );
                previous.z
            }
        };

        self.phase = ScanPhase::Scanning;
        self.store(value)
    }

    fn store(&mut self, value: f32) -> Result<CaptureOutcome, ScanError> {
        let index = self.capture_index;
        let total = self.surface.len();
        if !self
            .surface
            .update_point(index, SurfacePoint::new(0.0, 0.0, value))
        {
            return Err(ScanError::GridFull { total });
        }
        self.capture_index += 1;
        debug!("Stored sample {} = {:.3}", index, value);

        Ok(CaptureOutcome::Stored {
            index,
            value,
            captured: self.capture_index,
            total,
        })
    }

    /// The player stopped
    pub fn finish(&mut self) -> Result<ScanFinish, ScanError> {
        if !self.phase.is_active() {
            return Err(ScanError::NotScanning);
        }

        let total = self.surface.len();
        if self.capture_index >= total {
            self.surface.sort_points();
            self.phase = ScanPhase::Complete;
            info!("Height scan complete: {} samples", total);
            Ok(ScanFinish::Complete(self.surface.clone()))
        } else {
            let captured = self.capture_index;
            self.drop_partial();
            warn!("Height scan stopped after {} of {} samples", captured, total);
            Ok(ScanFinish::Incomplete { captured, total })
        }
    }

    /// Abort the running scan
    pub fn cancel(&mut self) -> Result<(), ScanError> {
        if !self.phase.is_active() {
            return Err(ScanError::NotScanning);
        }
        info!("Height scan cancelled at sample {}", self.capture_index);
        self.drop_partial();
        Ok(())
    }

    fn drop_partial(&mut self) {
        self.surface.clear();
        self.capture_index = 0;
        self.phase = ScanPhase::Cancelled;
    }

    /// Trust the surface for cutting
    pub fn approve(&mut self) -> Result<(), ScanError> {
        if self.phase.is_active() || !self.surface.is_sorted() || self.surface.is_empty() {
            return Err(ScanError::NothingToApprove);
        }
        self.approved = true;
        info!("Scanned surface approved");
        Ok(())
    }

    /// Replace the surface with a loaded one
    pub fn load(&mut self, surface: HeightSurface) -> Result<(), ScanError> {
        if self.phase.is_active() {
            return Err(ScanError::AlreadyScanning);
        }
        self.capture_index = surface.len();
        self.surface = surface;
        self.approved = false;
        self.phase = ScanPhase::Complete;
        Ok(())
    }

    /// Drop the surface
    pub fn clear(&mut self) -> Result<(), ScanError> {
        if self.phase.is_active() {
            return Err(ScanError::AlreadyScanning);
        }
        self.surface.clear();
        self.capture_index = 0;
        self.approved = false;
        self.phase = ScanPhase::Idle;
        Ok(())
    }

    /// Current phase
    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// The scanned surface
    pub fn surface(&self) -> &HeightSurface {
        &self.surface
    }

    /// Next capture-order index
    pub fn capture_index(&self) -> usize {
        self.capture_index
    }

    /// Samples in the current grid
    pub fn total(&self) -> usize {
        self.surface.len()
    }

    /// Check if the operator approved the surface
    pub fn is_approved(&self) -> bool {
        self.approved
    }
}
