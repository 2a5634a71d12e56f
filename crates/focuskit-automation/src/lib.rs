//! # FocusKit Automation
//!
//! The height compensation controller: a pure state machine that turns
//! camera, motion controller, player and operator events into commands.
//!
//! ## Components
//!
//! - **Automator**: readiness tracking, engraving and cutting compensation
//! - **Scan session**: serpentine height scan with manual entry fallback
//! - **Power throttle**: position-dependent laser power
//! - **Timer queue**: logical clock for deferred tasks
//!
//! Nothing here performs I/O. The runtime in `focuskit-communication`
//! executes the returned [`Effect`]s.

pub mod automator;
pub mod effects;
pub mod power;
pub mod program;
pub mod scan;
pub mod timer;

pub use automator::Automator;
pub use effects::{Effect, Notification};
pub use power::{PowerThrottle, PowerUpdate};
pub use program::{count_pauses, generate_scan_program};
pub use scan::{CaptureOutcome, ScanError, ScanFinish, ScanPhase, ScanSession};
pub use timer::TimerQueue;
