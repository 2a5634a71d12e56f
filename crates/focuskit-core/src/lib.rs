//! # FocusKit Core
//!
//! Core types for FocusKit, the autofocus and height-compensation controller
//! for laser engraving/cutting machines.
//! Provides the machine data model, the inbound event model, focus
//! calibration tables and scanned height surfaces.

pub mod calibration;
pub mod data;
pub mod error;
pub mod events;
pub mod surface;

pub use calibration::{CalibrationSample, CalibrationTable};

pub use data::{AutomationState, McStatus, Position, ReadinessSnapshot};

pub use error::{CalibrationError, CompensationError, SurfaceError};

pub use events::{
    AutomationEvent, CameraEvent, DeferredTask, EventCategory, MotionEvent, OperatorEvent,
    PlayerEvent, StorageEvent, TaskToken, TimerEvent,
};

pub use surface::{HeightSurface, JsonSurfaceStore, SurfacePoint, SurfaceStore};
