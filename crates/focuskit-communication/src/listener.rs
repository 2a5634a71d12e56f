//! Automation listener interface
//!
//! Defines the listener trait for automation notifications

use async_trait::async_trait;
use focuskit_core::AutomationState;

/// Handle for a registered automation listener.
///
/// Uniquely identifies a listener subscription. Can be used to unsubscribe
/// from automation notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AutomationListenerHandle(pub String);

/// Listener trait for automation notifications
///
/// Implement this trait to follow the controller from a UI or a log sink.
#[async_trait]
pub trait AutomationListener: Send + Sync {
    /// Called when the automation state changes
    async fn on_state_changed(&self, _state: AutomationState) {}

    /// Called with operator-facing status text
    async fn on_message(&self, _message: &str) {}

    /// Called when a scan sample needs a manual value
    async fn on_missing_entry(&self, _index: usize) {}

    /// Called after every stored scan sample
    async fn on_scan_progress(&self, _captured: usize, _total: usize) {}

    /// Called when the laser power changes
    async fn on_power_changed(&self, _power: f32) {}
}
