//! Outbound effects produced by the automator.
//!
//! The automator never talks to collaborators directly. Every command,
//! deferred task, notification and storage request is returned as an
//! [`Effect`] and executed by the hosting runtime in order.

use std::fmt;
use std::time::Duration;

use focuskit_core::{AutomationState, DeferredTask, HeightSurface, TaskToken};

/// A side effect requested by the automator
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a line to the motion controller
    SendToMc(String),
    /// Send a line that the motion controller must acknowledge
    SendToMcWithAnswer(String),
    /// Set the laser power output
    SetLaserPower(f32),
    /// Start the scan program on the player
    StartScanProgram(String),
    /// Resume the scan program after a stored sample
    ContinueScan,
    /// Stop the scan program
    StopScanProgram,
    /// Run a deferred task after `delay`
    Schedule {
        /// Task kind
        task: DeferredTask,
        /// Token to hand back when the task fires
        token: TaskToken,
        /// Delay from now
        delay: Duration,
    },
    /// Persist the surface
    SaveSurface(HeightSurface),
    /// Load the last persisted surface
    LoadSurface,
    /// Notify listeners
    Notify(Notification),
}

impl Effect {
    /// Check if this effect is a motion controller command
    pub fn is_command(&self) -> bool {
        matches!(self, Effect::SendToMc(_) | Effect::SendToMcWithAnswer(_))
    }
}

/// Listener notifications
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Automation state changed
    StateChanged(AutomationState),
    /// Status text for the operator
    Message(String),
    /// A scan sample needs a manual value
    MissingEntryRequested {
        /// Capture-order index of the sample
        index: usize,
    },
    /// Scan progress after a stored sample
    ScanProgress {
        /// Samples stored so far
        captured: usize,
        /// Samples in the grid
        total: usize,
    },
    /// Laser power changed
    PowerChanged(f32),
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::StateChanged(state) => write!(f, "state: {}", state),
            Notification::Message(text) => write!(f, "{}", text),
            Notification::MissingEntryRequested { index } => {
                write!(f, "manual value required for sample {}", index)
            }
            Notification::ScanProgress { captured, total } => {
                write!(f, "scanned {}/{}", captured, total)
            }
            Notification::PowerChanged(power) => write!(f, "power {:.3}", power),
        }
    }
}

/// Issues monotonically increasing task tokens
#[derive(Debug, Default)]
pub(crate) struct TokenSource {
    next: u64,
}

impl TokenSource {
    pub(crate) fn issue(&mut self) -> TaskToken {
        self.next += 1;
        TaskToken(self.next)
    }
}
