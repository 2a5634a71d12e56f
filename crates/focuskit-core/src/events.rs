//! Event type definitions for the automation controller.
//!
//! This module defines every inbound event the controller consumes,
//! organized by the collaborator that produces it. Events are cloneable and
//! serializable so a session can be logged and replayed.

use serde::{Deserialize, Serialize};

use crate::data::McStatus;
use crate::surface::HeightSurface;

/// Root event enum for all controller inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AutomationEvent {
    /// Camera driver events
    Camera(CameraEvent),
    /// Motion controller link events
    Motion(MotionEvent),
    /// Scan program player events
    Player(PlayerEvent),
    /// Operator commands
    Operator(OperatorEvent),
    /// Deferred task expirations
    Timer(TimerEvent),
    /// Results of storage requests
    #[serde(skip)]
    Storage(StorageEvent),
}

impl AutomationEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            AutomationEvent::Camera(_) => EventCategory::Camera,
            AutomationEvent::Motion(_) => EventCategory::Motion,
            AutomationEvent::Player(_) => EventCategory::Player,
            AutomationEvent::Operator(_) => EventCategory::Operator,
            AutomationEvent::Timer(_) => EventCategory::Timer,
            AutomationEvent::Storage(_) => EventCategory::Storage,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            AutomationEvent::Camera(e) => e.description(),
            AutomationEvent::Motion(e) => e.description(),
            AutomationEvent::Player(e) => e.description(),
            AutomationEvent::Operator(e) => e.description(),
            AutomationEvent::Timer(e) => e.description(),
            AutomationEvent::Storage(e) => e.description(),
        }
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Camera driver events.
    Camera,
    /// Motion controller events.
    Motion,
    /// Scan program player events.
    Player,
    /// Operator commands.
    Operator,
    /// Deferred task expirations.
    Timer,
    /// Storage results.
    Storage,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Camera => write!(f, "Camera"),
            EventCategory::Motion => write!(f, "Motion"),
            EventCategory::Player => write!(f, "Player"),
            EventCategory::Operator => write!(f, "Operator"),
            EventCategory::Timer => write!(f, "Timer"),
            EventCategory::Storage => write!(f, "Storage"),
        }
    }
}

/// Camera driver events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CameraEvent {
    /// New focus metric.
    DzChanged(f32),
    /// Focus metric validity changed; camera connectivity follows it.
    DzValidChanged(bool),
    /// Capture stopped.
    Stopped,
}

impl CameraEvent {
    /// Get a short description
    pub fn description(&self) -> String {
        match self {
            CameraEvent::DzChanged(dz) => format!("dz changed to {}", dz),
            CameraEvent::DzValidChanged(valid) => format!("dz valid: {}", valid),
            CameraEvent::Stopped => "camera stopped".to_string(),
        }
    }
}

/// Motion controller link events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MotionEvent {
    /// Link connected or disconnected.
    ConnectionChanged(bool),
    /// Coordinate feed validity changed.
    CoordsValidChanged(bool),
    /// New machine coordinates.
    CoordsChanged {
        /// X-axis position.
        x: f32,
        /// Y-axis position.
        y: f32,
        /// Z-axis position.
        z: f32,
        /// B-axis position.
        b: f32,
    },
    /// Play/pause status report.
    StateChanged(McStatus),
    /// Acknowledgment of an answer-required command.
    Acknowledged,
    /// An answer-required command never reached the controller.
    SendFailed {
        /// Command line that was not delivered.
        command: String,
        /// Link error text.
        reason: String,
    },
}

impl MotionEvent {
    /// Get a short description
    pub fn description(&self) -> String {
        match self {
            MotionEvent::ConnectionChanged(c) => format!("MC connected: {}", c),
            MotionEvent::CoordsValidChanged(v) => format!("coords valid: {}", v),
            MotionEvent::CoordsChanged { x, y, z, b } => {
                format!("coords X{} Y{} Z{} B{}", x, y, z, b)
            }
            MotionEvent::StateChanged(s) => format!("MC state {}", s),
            MotionEvent::Acknowledged => "MC acknowledgment".to_string(),
            MotionEvent::SendFailed { command, reason } => {
                format!("send of {} failed: {}", command, reason)
            }
        }
    }
}

/// Scan program player events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlayerEvent {
    /// Program reached a pause marker.
    PausedAtSample,
    /// Program fully stopped.
    ProgramStopped,
}

impl PlayerEvent {
    /// Get a short description
    pub fn description(&self) -> String {
        match self {
            PlayerEvent::PausedAtSample => "player paused at sample".to_string(),
            PlayerEvent::ProgramStopped => "player stopped".to_string(),
        }
    }
}

/// Operator commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OperatorEvent {
    /// Enable or disable automation.
    Enable(bool),
    /// Select cutting (true) or engraving (false).
    SetCutMode(bool),
    /// Configure automatic laser power.
    SetAutoPower {
        /// Whether power follows position.
        enabled: bool,
        /// Power at the far corner of the envelope.
        min: f32,
        /// Power at the near corner of the envelope.
        max: f32,
    },
    /// Start a height scan.
    ScanSurface {
        /// Scan width in machine units.
        width: u32,
        /// Scan height in machine units.
        height: u32,
        /// Grid step.
        step: u32,
        /// X offset of the first column.
        left_offset: u32,
    },
    /// Trust the completed scan for cutting.
    ApproveScan,
    /// Answer a missing-entry request; `None` repeats the previous sample.
    SupplyMissingEntry(Option<f32>),
    /// Abort the running scan.
    CancelScan,
    /// Load the last persisted scan.
    LoadLastScan,
    /// Drop the scanned surface.
    ClearSurface,
}

impl OperatorEvent {
    /// Get a short description
    pub fn description(&self) -> String {
        match self {
            OperatorEvent::Enable(e) => format!("enable: {}", e),
            OperatorEvent::SetCutMode(c) => format!("cut mode: {}", c),
            OperatorEvent::SetAutoPower { enabled, min, max } => {
                format!("auto power: {} ({}..{})", enabled, min, max)
            }
            OperatorEvent::ScanSurface {
                width,
                height,
                step,
                left_offset,
            } => format!(
                "scan {}x{} step {} offset {}",
                width, height, step, left_offset
            ),
            OperatorEvent::ApproveScan => "approve scan".to_string(),
            OperatorEvent::SupplyMissingEntry(Some(v)) => format!("manual entry {}", v),
            OperatorEvent::SupplyMissingEntry(None) => "skip missing entry".to_string(),
            OperatorEvent::CancelScan => "cancel scan".to_string(),
            OperatorEvent::LoadLastScan => "load last scan".to_string(),
            OperatorEvent::ClearSurface => "clear surface".to_string(),
        }
    }
}

/// Token identifying one scheduled deferred task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskToken(pub u64);

/// Deferred task kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeferredTask {
    /// Engraving compensation at a pause point.
    EngraveCompensation,
    /// Surface correction while cutting.
    CutCorrection,
    /// Scan snapshot after the settling delay.
    ScanSnapshot,
    /// Power throttle interval elapsed.
    PowerWindow,
}

/// Deferred task expirations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEvent {
    /// Which task expired.
    pub task: DeferredTask,
    /// Token issued when the task was scheduled.
    pub token: TaskToken,
}

impl TimerEvent {
    /// Get a short description
    pub fn description(&self) -> String {
        format!("timer {:?} #{}", self.task, self.token.0)
    }
}

/// Results of storage requests executed by the runtime
#[derive(Debug, Clone)]
pub enum StorageEvent {
    /// A persisted surface was loaded.
    SurfaceLoaded(HeightSurface),
    /// Reading or writing the surface file failed.
    PersistenceFailed(String),
    /// The surface was saved.
    SurfaceSaved,
}

impl StorageEvent {
    /// Get a short description
    pub fn description(&self) -> String {
        match self {
            StorageEvent::SurfaceLoaded(s) => format!("surface loaded ({} points)", s.len()),
            StorageEvent::PersistenceFailed(e) => format!("persistence failed: {}", e),
            StorageEvent::SurfaceSaved => "surface saved".to_string(),
        }
    }
}
