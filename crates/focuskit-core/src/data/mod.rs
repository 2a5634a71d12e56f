//! Data models for machine position, motion controller status and readiness
//!
//! This module provides:
//! - Machine position as reported by the motion controller (X, Y, Z, B)
//! - Motion controller play/pause status
//! - The automation state enum
//! - The readiness snapshot consulted by state recomputation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine coordinates reported by the motion controller
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X-axis position
    pub x: f32,
    /// Y-axis position
    pub y: f32,
    /// Z-axis position
    pub z: f32,
    /// B-axis (focus lens) position
    pub b: f32,
}

impl Position {
    /// Create a new position
    pub fn new(x: f32, y: f32, z: f32, b: f32) -> Self {
        debug_assert!(
            x.is_finite() && y.is_finite() && z.is_finite() && b.is_finite(),
            "Position axes must be finite: x={x}, y={y}, z={z}, b={b}"
        );
        Self { x, y, z, b }
    }

    /// The X/Y pair used for stability checks and surface lookups
    pub fn xy(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X:{:.3} Y:{:.3} Z:{:.3} B:{:.3}",
            self.x, self.y, self.z, self.b
        )
    }
}

/// Play/pause status of the motion controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum McStatus {
    /// No program loaded or running
    #[default]
    Idle,
    /// Program running
    Playing,
    /// Program paused
    Paused,
}

impl fmt::Display for McStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            McStatus::Idle => write!(f, "Idle"),
            McStatus::Playing => write!(f, "Playing"),
            McStatus::Paused => write!(f, "Paused"),
        }
    }
}

/// Active automation mode
///
/// Exactly one state is active at a time. Outside of a scan it is derived
/// from the readiness predicate and the cut-mode flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AutomationState {
    /// No compensation activity
    #[default]
    Disabled,
    /// Live calibration-table compensation at pause points
    AutoEngraving,
    /// Surface-interpolated compensation while the program plays
    AutoCutting,
    /// A height scan owns the machine
    Scanning,
    /// A height scan is blocked waiting for an operator value
    EntryMissing,
}

impl AutomationState {
    /// Check if a scan session currently owns the state
    pub fn is_scan_owned(&self) -> bool {
        matches!(self, AutomationState::Scanning | AutomationState::EntryMissing)
    }

    /// Check if automatic compensation is active
    pub fn is_working(&self) -> bool {
        matches!(
            self,
            AutomationState::AutoEngraving | AutomationState::AutoCutting
        )
    }
}

impl fmt::Display for AutomationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomationState::Disabled => write!(f, "Disabled"),
            AutomationState::AutoEngraving => write!(f, "Auto Engraving"),
            AutomationState::AutoCutting => write!(f, "Auto Cutting"),
            AutomationState::Scanning => write!(f, "Scanning"),
            AutomationState::EntryMissing => write!(f, "Entry Missing"),
        }
    }
}

/// Last-known inputs from every collaborator
///
/// Each handler mutates one field; state recomputation reads the whole
/// snapshot after the handler finished.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReadinessSnapshot {
    /// Camera reports a valid focus metric
    pub dz_valid: bool,
    /// Motion controller link is up
    pub mc_connected: bool,
    /// Coordinate feed is valid
    pub coords_valid: bool,
    /// Operator enabled automation
    pub enabled: bool,
    /// Camera capture is running
    pub camera_connected: bool,
    /// Operator selected cutting mode
    pub cut_mode: bool,
    /// Last focus metric
    pub dz: f32,
    /// Last machine position
    pub position: Position,
    /// Last motion controller status
    pub mc_status: McStatus,
}

impl ReadinessSnapshot {
    /// All readiness inputs hold
    pub fn working(&self) -> bool {
        self.dz_valid && self.mc_connected && self.coords_valid && self.enabled && self.camera_connected
    }

    /// State derived from readiness outside of a scan
    pub fn derived_state(&self) -> AutomationState {
        match (self.working(), self.cut_mode) {
            (true, true) => AutomationState::AutoCutting,
            (true, false) => AutomationState::AutoEngraving,
            (false, _) => AutomationState::Disabled,
        }
    }
}
