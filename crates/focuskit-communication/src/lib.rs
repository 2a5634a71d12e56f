//! # FocusKit Communication
//!
//! Collaborator links and the async runtime that hosts the automator.
//! Motion controller and scan player are reached through the
//! [`MotionLink`] and [`ScanProgramPlayer`] traits; inbound drivers push
//! events through a cloneable [`AutomationHandle`]; listeners receive
//! notifications asynchronously.

pub mod error;
pub mod handle;
pub mod link;
pub mod listener;
pub mod runtime;
pub mod status;

pub use error::{LinkError, LinkResult};
pub use handle::AutomationHandle;
pub use link::{LoggingMotionLink, LoggingPlayer, MotionLink, ScanProgramPlayer};
pub use listener::{AutomationListener, AutomationListenerHandle};
pub use runtime::AutomationRuntime;
pub use status::StatusSnapshot;
