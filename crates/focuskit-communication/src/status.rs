//! Shared status snapshot

use chrono::{DateTime, Utc};
use focuskit_automation::{Automator, ScanPhase};
use focuskit_core::{AutomationState, ReadinessSnapshot};
use serde::Serialize;

/// Point-in-time view of the controller for UIs and logs
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    /// Automation state
    pub state: AutomationState,
    /// Last-known readiness inputs
    pub readiness: ReadinessSnapshot,
    /// Last status message
    pub message: String,
    /// Scan session phase
    pub scan_phase: ScanPhase,
    /// Samples captured in the current or last scan
    pub captured: usize,
    /// Samples in the current grid
    pub total: usize,
    /// Whether the surface is approved for cutting
    pub approved: bool,
    /// Whether a cut correction awaits acknowledgment
    pub answer_pending: bool,
    /// Last laser power sent
    pub last_power: f32,
    /// When the snapshot was taken
    pub updated_at: DateTime<Utc>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            state: AutomationState::Disabled,
            readiness: ReadinessSnapshot::default(),
            message: String::new(),
            scan_phase: ScanPhase::Idle,
            captured: 0,
            total: 0,
            approved: false,
            answer_pending: false,
            last_power: 0.0,
            updated_at: Utc::now(),
        }
    }
}

impl StatusSnapshot {
    /// Capture the automator's current state
    pub fn capture(automator: &Automator) -> Self {
        let session = automator.session();
        Self {
            state: automator.state(),
            readiness: *automator.readiness(),
            message: automator.message().to_string(),
            scan_phase: session.phase(),
            captured: session.capture_index(),
            total: session.total(),
            approved: session.is_approved(),
            answer_pending: automator.answer_pending(),
            last_power: automator.throttle().last_sent(),
            updated_at: Utc::now(),
        }
    }
}
