//! Cloneable sender for inbound events
//!
//! Camera, motion controller, player and operator drivers each hold an
//! [`AutomationHandle`] and push events into the runtime's channel. The
//! runtime stops once every handle is dropped and no deferred task remains.

use focuskit_core::{
    AutomationEvent, CameraEvent, McStatus, MotionEvent, OperatorEvent, PlayerEvent,
};
use tokio::sync::mpsc;

use crate::error::{LinkError, LinkResult};

/// Sender side of the automation event channel
#[derive(Debug, Clone)]
pub struct AutomationHandle {
    tx: mpsc::UnboundedSender<AutomationEvent>,
}

impl AutomationHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<AutomationEvent>) -> Self {
        Self { tx }
    }

    /// Push any event
    pub fn send(&self, event: AutomationEvent) -> LinkResult<()> {
        self.tx.send(event).map_err(|_| LinkError::RuntimeStopped)
    }

    /// Check if the runtime stopped receiving
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    // Camera

    /// New focus metric
    pub fn dz_changed(&self, dz: f32) -> LinkResult<()> {
        self.send(AutomationEvent::Camera(CameraEvent::DzChanged(dz)))
    }

    /// Focus metric validity changed
    pub fn dz_valid_changed(&self, valid: bool) -> LinkResult<()> {
        self.send(AutomationEvent::Camera(CameraEvent::DzValidChanged(valid)))
    }

    /// Camera capture stopped
    pub fn camera_stopped(&self) -> LinkResult<()> {
        self.send(AutomationEvent::Camera(CameraEvent::Stopped))
    }

    // Motion controller

    /// Link connected or disconnected
    pub fn connection_changed(&self, connected: bool) -> LinkResult<()> {
        self.send(AutomationEvent::Motion(MotionEvent::ConnectionChanged(
            connected,
        )))
    }

    /// Coordinate feed validity changed
    pub fn coords_valid_changed(&self, valid: bool) -> LinkResult<()> {
        self.send(AutomationEvent::Motion(MotionEvent::CoordsValidChanged(valid)))
    }

    /// New machine coordinates
    pub fn coords_changed(&self, x: f32, y: f32, z: f32, b: f32) -> LinkResult<()> {
        self.send(AutomationEvent::Motion(MotionEvent::CoordsChanged {
            x,
            y,
            z,
            b,
        }))
    }

    /// Play/pause status report
    pub fn mc_state_changed(&self, status: McStatus) -> LinkResult<()> {
        self.send(AutomationEvent::Motion(MotionEvent::StateChanged(status)))
    }

    /// Acknowledgment of an answer-required command
    pub fn acknowledged(&self) -> LinkResult<()> {
        self.send(AutomationEvent::Motion(MotionEvent::Acknowledged))
    }

    // Player

    /// Scan program reached a pause marker
    pub fn paused_at_sample(&self) -> LinkResult<()> {
        self.send(AutomationEvent::Player(PlayerEvent::PausedAtSample))
    }

    /// Scan program stopped
    pub fn program_stopped(&self) -> LinkResult<()> {
        self.send(AutomationEvent::Player(PlayerEvent::ProgramStopped))
    }

    // Operator

    /// Enable or disable automation
    pub fn enable(&self, enabled: bool) -> LinkResult<()> {
        self.operator(OperatorEvent::Enable(enabled))
    }

    /// Select cutting or engraving
    pub fn set_cut_mode(&self, cut_mode: bool) -> LinkResult<()> {
        self.operator(OperatorEvent::SetCutMode(cut_mode))
    }

    /// Configure automatic laser power
    pub fn set_auto_power(&self, enabled: bool, min: f32, max: f32) -> LinkResult<()> {
        self.operator(OperatorEvent::SetAutoPower { enabled, min, max })
    }

    /// Start a height scan
    pub fn scan_surface(
        &self,
        width: u32,
        height: u32,
        step: u32,
        left_offset: u32,
    ) -> LinkResult<()> {
        self.operator(OperatorEvent::ScanSurface {
            width,
            height,
            step,
            left_offset,
        })
    }

    /// Approve the completed scan
    pub fn approve_scan(&self) -> LinkResult<()> {
        self.operator(OperatorEvent::ApproveScan)
    }

    /// Answer a missing-entry request
    pub fn supply_missing_entry(&self, value: Option<f32>) -> LinkResult<()> {
        self.operator(OperatorEvent::SupplyMissingEntry(value))
    }

    /// Abort the running scan
    pub fn cancel_scan(&self) -> LinkResult<()> {
        self.operator(OperatorEvent::CancelScan)
    }

    /// Load the last persisted scan
    pub fn load_last_scan(&self) -> LinkResult<()> {
        self.operator(OperatorEvent::LoadLastScan)
    }

    /// Drop the scanned surface
    pub fn clear_surface(&self) -> LinkResult<()> {
        self.operator(OperatorEvent::ClearSurface)
    }

    fn operator(&self, event: OperatorEvent) -> LinkResult<()> {
        self.send(AutomationEvent::Operator(event))
    }
}
