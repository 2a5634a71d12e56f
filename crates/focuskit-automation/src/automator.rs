//! Compensation state machine.
//!
//! [`Automator`] consumes [`AutomationEvent`]s one at a time and returns the
//! [`Effect`]s the runtime must execute. It never blocks and never performs
//! I/O; deferred work is requested as [`Effect::Schedule`] and comes back as
//! a [`TimerEvent`] carrying the token it was issued with. A timer whose
//! token no longer matches the armed one is stale and does nothing.

use std::time::Duration;

use focuskit_core::{
    AutomationEvent, AutomationState, CalibrationTable, CameraEvent, CompensationError,
    DeferredTask, HeightSurface, McStatus, MotionEvent, OperatorEvent, PlayerEvent,
    ReadinessSnapshot, StorageEvent, SurfaceError, TaskToken, TimerEvent,
};
use focuskit_settings::{AutomationSettings, Config, ScanSettings};
use tracing::{debug, info, warn};

use crate::effects::{Effect, Notification, TokenSource};
use crate::power::PowerThrottle;
use crate::scan::{CaptureOutcome, ScanError, ScanFinish, ScanPhase, ScanSession};

/// One-shot guards for deferred tasks
///
/// A guard is armed together with the token of the task it scheduled.
/// Disarming drops the token so the pending task fires as a no-op.
#[derive(Debug, Default, Clone)]
struct Guards {
    compensation_armed: bool,
    compensation_token: Option<TaskToken>,
    cut_armed: bool,
    cut_token: Option<TaskToken>,
    answer_pending: bool,
    snapshot_token: Option<TaskToken>,
    power_token: Option<TaskToken>,
}

impl Guards {
    fn disarm_compensation(&mut self) {
        self.compensation_armed = false;
        self.compensation_token = None;
    }

    fn disarm_cut(&mut self) {
        self.cut_armed = false;
        self.cut_token = None;
    }
}

/// Laser height compensation controller
#[derive(Debug)]
pub struct Automator {
    automation: AutomationSettings,
    scan_settings: ScanSettings,
    table: CalibrationTable,
    readiness: ReadinessSnapshot,
    state: AutomationState,
    session: ScanSession,
    throttle: PowerThrottle,
    guards: Guards,
    pause_check: Option<(f32, f32)>,
    message: String,
    tokens: TokenSource,
}

impl Automator {
    /// Create an automator with the given calibration table
    pub fn new(config: &Config, table: CalibrationTable) -> Self {
        Self {
            automation: config.automation.clone(),
            scan_settings: config.scan.clone(),
            table,
            readiness: ReadinessSnapshot::default(),
            state: AutomationState::Disabled,
            session: ScanSession::new(),
            throttle: PowerThrottle::new(&config.power),
            guards: Guards::default(),
            pause_check: None,
            message: String::new(),
            tokens: TokenSource::default(),
        }
    }

    /// Apply one event and return the effects it produced
    pub fn apply_event(&mut self, event: AutomationEvent) -> Vec<Effect> {
        debug!("Event: {}", event.description());
        let mut effects = Vec::new();

        match event {
            AutomationEvent::Camera(e) => self.on_camera(e, &mut effects),
            AutomationEvent::Motion(e) => self.on_motion(e, &mut effects),
            AutomationEvent::Player(e) => self.on_player(e, &mut effects),
            AutomationEvent::Operator(e) => self.on_operator(e, &mut effects),
            AutomationEvent::Timer(e) => self.on_timer(e, &mut effects),
            AutomationEvent::Storage(e) => self.on_storage(e, &mut effects),
        }

        effects
    }

    fn on_camera(&mut self, event: CameraEvent, effects: &mut Vec<Effect>) {
        match event {
            CameraEvent::DzChanged(dz) => self.readiness.dz = dz,
            CameraEvent::DzValidChanged(valid) => {
                self.readiness.dz_valid = valid;
                self.readiness.camera_connected = valid;
                self.recompute_state(effects);
            }
            CameraEvent::Stopped => {
                self.readiness.camera_connected = false;
                self.recompute_state(effects);
            }
        }
    }

    fn on_motion(&mut self, event: MotionEvent, effects: &mut Vec<Effect>) {
        match event {
            MotionEvent::ConnectionChanged(connected) => {
                self.readiness.mc_connected = connected;
                if !connected && self.guards.answer_pending {
                    warn!("Motion controller disconnected with a correction awaiting acknowledgment");
                    self.guards.answer_pending = false;
                }
                self.recompute_state(effects);
            }
            MotionEvent::CoordsValidChanged(valid) => {
                self.readiness.coords_valid = valid;
                self.recompute_state(effects);
            }
            MotionEvent::CoordsChanged { x, y, z, b } => {
                let pos = &mut self.readiness.position;
                pos.x = x;
                pos.y = y;
                pos.z = z;
                pos.b = b;
                self.update_power(x, y, effects);
            }
            MotionEvent::StateChanged(status) => {
                self.readiness.mc_status = status;
                self.on_mc_status(status, effects);
            }
            MotionEvent::Acknowledged => {
                if self.guards.answer_pending {
                    debug!("Correction acknowledged");
                    self.guards.answer_pending = false;
                } else {
                    warn!("Ignoring acknowledgment with no correction pending");
                }
            }
            MotionEvent::SendFailed { command, reason } => {
                warn!("Correction {} not delivered: {}", command, reason);
                self.guards.answer_pending = false;
                self.report(format!("Correction {} not sent: {}", command, reason), effects);
            }
        }
    }

    fn on_mc_status(&mut self, status: McStatus, effects: &mut Vec<Effect>) {
        if status == McStatus::Playing {
            self.guards.disarm_compensation();
        } else {
            self.guards.disarm_cut();
        }

        match (self.state, status) {
            (AutomationState::AutoEngraving, McStatus::Paused) => self.engraving_paused(effects),
            (AutomationState::AutoCutting, McStatus::Playing) => self.cutting_tick(effects),
            _ => {}
        }
    }

    fn engraving_paused(&mut self, effects: &mut Vec<Effect>) {
        let xy = self.readiness.position.xy();
        if self.pause_check != Some(xy) {
            debug!("Paused at X{} Y{}, waiting for a stable position", xy.0, xy.1);
            self.pause_check = Some(xy);
            return;
        }

        if self.guards.compensation_armed {
            return;
        }

        let token = self.tokens.issue();
        self.guards.compensation_armed = true;
        self.guards.compensation_token = Some(token);
        debug!("Arming engraving compensation #{}", token.0);
        effects.push(Effect::Schedule {
            task: DeferredTask::EngraveCompensation,
            token,
            delay: Duration::from_millis(self.automation.engrave_delay_ms),
        });
    }

    fn cutting_tick(&mut self, effects: &mut Vec<Effect>) {
        if self.guards.cut_armed || self.guards.answer_pending {
            return;
        }

        let token = self.tokens.issue();
        self.guards.cut_armed = true;
        self.guards.cut_token = Some(token);
        debug!("Arming cut correction #{}", token.0);
        effects.push(Effect::Schedule {
            task: DeferredTask::CutCorrection,
            token,
            delay: Duration::from_millis(self.automation.cut_delay_ms),
        });
    }

    fn update_power(&mut self, x: f32, y: f32, effects: &mut Vec<Effect>) {
        let Some(update) = self.throttle.on_coords(x, y) else {
            return;
        };

        let token = self.tokens.issue();
        self.guards.power_token = Some(token);
        effects.push(Effect::SetLaserPower(update.output));
        effects.push(Effect::Notify(Notification::PowerChanged(update.power)));
        effects.push(Effect::Schedule {
            task: DeferredTask::PowerWindow,
            token,
            delay: self.throttle.interval(),
        });
    }

    fn on_player(&mut self, event: PlayerEvent, effects: &mut Vec<Effect>) {
        match event {
            PlayerEvent::PausedAtSample => {
                if self.session.phase() != ScanPhase::Scanning {
                    debug!("Ignoring sample pause outside of a running scan");
                    return;
                }
                if self.guards.snapshot_token.is_some() {
                    debug!("Snapshot already armed");
                    return;
                }

                let token = self.tokens.issue();
                self.guards.snapshot_token = Some(token);
                effects.push(Effect::Schedule {
                    task: DeferredTask::ScanSnapshot,
                    token,
                    delay: Duration::from_millis(self.scan_settings.settle_delay_ms),
                });
            }
            PlayerEvent::ProgramStopped => {
                let Ok(finish) = self.session.finish() else {
                    debug!("Player stopped with no scan in progress");
                    return;
                };
                self.guards.snapshot_token = None;

                match finish {
                    ScanFinish::Complete(surface) => {
                        let total = surface.len();
                        effects.push(Effect::SaveSurface(surface));
                        self.report(format!("Scan complete: {} samples", total), effects);
                    }
                    ScanFinish::Incomplete { captured, total } => {
                        self.report(
                            format!("Scan stopped after {} of {} samples", captured, total),
                            effects,
                        );
                    }
                }
                self.leave_scan(effects);
            }
        }
    }

    fn on_operator(&mut self, event: OperatorEvent, effects: &mut Vec<Effect>) {
        match event {
            OperatorEvent::Enable(enabled) => {
                self.readiness.enabled = enabled;
                self.recompute_state(effects);
            }
            OperatorEvent::SetCutMode(cut_mode) => {
                self.readiness.cut_mode = cut_mode;
                self.recompute_state(effects);
            }
            OperatorEvent::SetAutoPower { enabled, min, max } => {
                info!("Auto power {} ({}..{})", enabled, min, max);
                self.throttle.configure(enabled, min, max);
            }
            OperatorEvent::ScanSurface {
                width,
                height,
                step,
                left_offset,
            } => self.start_scan(width, height, step, left_offset, effects),
            OperatorEvent::ApproveScan => match self.session.approve() {
                Ok(()) => self.report("Scanned surface approved", effects),
                Err(e) => self.report(e.to_string(), effects),
            },
            OperatorEvent::SupplyMissingEntry(value) => self.supply_entry(value, effects),
            OperatorEvent::CancelScan => {
                if let Err(e) = self.session.cancel() {
                    self.report(e.to_string(), effects);
                    return;
                }
                self.guards.snapshot_token = None;
                effects.push(Effect::StopScanProgram);
                self.report("Scan cancelled", effects);
                self.leave_scan(effects);
            }
            OperatorEvent::LoadLastScan => {
                if self.state.is_scan_owned() {
                    self.report(ScanError::AlreadyScanning.to_string(), effects);
                    return;
                }
                effects.push(Effect::LoadSurface);
            }
            OperatorEvent::ClearSurface => match self.session.clear() {
                Ok(()) => self.report("Scanned surface cleared", effects),
                Err(e) => self.report(e.to_string(), effects),
            },
        }
    }

    fn start_scan(
        &mut self,
        width: u32,
        height: u32,
        step: u32,
        left_offset: u32,
        effects: &mut Vec<Effect>,
    ) {
        if self.state.is_scan_owned() {
            self.report(ScanError::AlreadyScanning.to_string(), effects);
            return;
        }
        if !(self.readiness.dz_valid && self.readiness.mc_connected) {
            self.report(
                "Cannot scan: camera or motion controller not ready",
                effects,
            );
            return;
        }

        match self
            .session
            .start(width, height, step, left_offset, &self.scan_settings)
        {
            Ok(program) => {
                self.guards.disarm_compensation();
                self.guards.disarm_cut();
                self.guards.snapshot_token = None;
                self.set_state(AutomationState::Scanning, effects);
                effects.push(Effect::StartScanProgram(program));
                let total = self.session.total();
                self.report(format!("Scanning {} samples", total), effects);
            }
            Err(e) => self.report(e.to_string(), effects),
        }
    }

    fn supply_entry(&mut self, value: Option<f32>, effects: &mut Vec<Effect>) {
        match self.session.supply(value) {
            Ok(outcome) => {
                self.set_state(AutomationState::Scanning, effects);
                self.captured(outcome, effects);
            }
            Err(ScanError::FirstSampleNeedsValue) => {
                self.report(ScanError::FirstSampleNeedsValue.to_string(), effects);
                effects.push(Effect::Notify(Notification::MissingEntryRequested {
                    index: self.session.capture_index(),
                }));
            }
            Err(e) => self.report(e.to_string(), effects),
        }
    }

    fn captured(&mut self, outcome: CaptureOutcome, effects: &mut Vec<Effect>) {
        match outcome {
            CaptureOutcome::Stored {
                captured, total, ..
            } => {
                effects.push(Effect::Notify(Notification::ScanProgress { captured, total }));
                effects.push(Effect::ContinueScan);
            }
            CaptureOutcome::Missing { index } => {
                self.set_state(AutomationState::EntryMissing, effects);
                self.report(
                    CompensationError::MissingSample { index }.to_string(),
                    effects,
                );
                effects.push(Effect::Notify(Notification::MissingEntryRequested { index }));
            }
        }
    }

    fn on_timer(&mut self, event: TimerEvent, effects: &mut Vec<Effect>) {
        match event.task {
            DeferredTask::EngraveCompensation => {
                if self.guards.compensation_token != Some(event.token) {
                    debug!("Stale engraving compensation #{}", event.token.0);
                    return;
                }
                self.guards.compensation_token = None;
                self.engrave_compensation(effects);
            }
            DeferredTask::CutCorrection => {
                if self.guards.cut_token != Some(event.token) {
                    debug!("Stale cut correction #{}", event.token.0);
                    return;
                }
                self.guards.disarm_cut();
                self.cut_correction(effects);
            }
            DeferredTask::ScanSnapshot => {
                if self.guards.snapshot_token != Some(event.token) {
                    debug!("Stale scan snapshot #{}", event.token.0);
                    return;
                }
                self.guards.snapshot_token = None;
                self.scan_snapshot(effects);
            }
            DeferredTask::PowerWindow => {
                if self.guards.power_token == Some(event.token) {
                    self.guards.power_token = None;
                    self.throttle.window_elapsed();
                }
            }
        }
    }

    fn engrave_compensation(&mut self, effects: &mut Vec<Effect>) {
        if self.state != AutomationState::AutoEngraving {
            return;
        }

        match self.table.lookup(self.readiness.dz) {
            Ok(correction) => {
                let command = b_command(self.automation.b_offset + correction);
                if self.automation.auto_send_b {
                    info!("Engraving compensation: {}", command.trim_end());
                    effects.push(Effect::SendToMc(command.clone()));
                    effects.push(Effect::SendToMc("M24\n".to_string()));
                }
                self.report(command.trim_end().to_string(), effects);
            }
            Err(e) => {
                warn!("Engraving compensation skipped: {}", e);
                self.report(e.to_string(), effects);
            }
        }
    }

    fn cut_correction(&mut self, effects: &mut Vec<Effect>) {
        if self.state != AutomationState::AutoCutting || self.guards.answer_pending {
            return;
        }
        if !self.session.is_approved() {
            self.report(CompensationError::ScanNotApproved.to_string(), effects);
            return;
        }

        let (x, y) = self.readiness.position.xy();
        match self.session.surface().interpolate(x, y) {
            Ok(height) => {
                let command = b_command(self.automation.b_offset + height);
                info!("Cut correction: {}", command.trim_end());
                self.guards.answer_pending = true;
                effects.push(Effect::SendToMcWithAnswer(command.clone()));
                self.report(command.trim_end().to_string(), effects);
            }
            Err(SurfaceError::OutOfRange { x, y }) => {
                warn!("Cut correction skipped at X{} Y{}", x, y);
                self.report(
                    CompensationError::OutOfScanRange { x, y }.to_string(),
                    effects,
                );
            }
            Err(e) => {
                warn!("Cut correction skipped: {}", e);
                self.report(e.to_string(), effects);
            }
        }
    }

    fn scan_snapshot(&mut self, effects: &mut Vec<Effect>) {
        if self.session.phase() != ScanPhase::Scanning {
            return;
        }

        let correction = if self.readiness.dz_valid {
            self.table.lookup(self.readiness.dz)
        } else {
            Err(CompensationError::NoCalibrationEntry {
                metric: self.readiness.dz,
            })
        };

        match self.session.capture(correction) {
            Ok(outcome) => self.captured(outcome, effects),
            Err(e @ ScanError::GridFull { .. }) => {
                warn!("Extra scan pause ignored: {}", e);
                self.report(e.to_string(), effects);
            }
            Err(e) => debug!("Snapshot dropped: {}", e),
        }
    }

    fn on_storage(&mut self, event: StorageEvent, effects: &mut Vec<Effect>) {
        match event {
            StorageEvent::SurfaceLoaded(surface) => self.load_surface(surface, effects),
            StorageEvent::PersistenceFailed(reason) => {
                warn!("Surface persistence failed: {}", reason);
                self.report(format!("Surface persistence failed: {}", reason), effects);
            }
            StorageEvent::SurfaceSaved => debug!("Surface saved"),
        }
    }

    fn load_surface(&mut self, surface: HeightSurface, effects: &mut Vec<Effect>) {
        let points = surface.len();
        match self.session.load(surface) {
            Ok(()) => {
                info!("Loaded last scan: {} points", points);
                self.report(format!("Loaded last scan: {} points", points), effects);
            }
            Err(e) => {
                warn!("Discarding loaded surface: {}", e);
                self.report(e.to_string(), effects);
            }
        }
    }

    fn leave_scan(&mut self, effects: &mut Vec<Effect>) {
        let next = self.readiness.derived_state();
        self.set_state(next, effects);
    }

    fn recompute_state(&mut self, effects: &mut Vec<Effect>) {
        if self.state.is_scan_owned() {
            debug!("Scan in progress, state stays {}", self.state);
            return;
        }
        let next = self.readiness.derived_state();
        self.set_state(next, effects);
    }

    fn set_state(&mut self, next: AutomationState, effects: &mut Vec<Effect>) {
        if next == self.state {
            return;
        }
        info!("Automation state: {} -> {}", self.state, next);
        self.state = next;
        self.guards.disarm_compensation();
        self.guards.disarm_cut();
        effects.push(Effect::Notify(Notification::StateChanged(next)));
    }

    fn report(&mut self, text: impl Into<String>, effects: &mut Vec<Effect>) {
        let text = text.into();
        self.message.clone_from(&text);
        effects.push(Effect::Notify(Notification::Message(text)));
    }

    /// Current automation state
    pub fn state(&self) -> AutomationState {
        self.state
    }

    /// Last-known readiness inputs
    pub fn readiness(&self) -> &ReadinessSnapshot {
        &self.readiness
    }

    /// Last status message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Height scan session
    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    /// Power throttle
    pub fn throttle(&self) -> &PowerThrottle {
        &self.throttle
    }

    /// Calibration table in use
    pub fn table(&self) -> &CalibrationTable {
        &self.table
    }

    /// Check if a cut correction awaits acknowledgment
    pub fn answer_pending(&self) -> bool {
        self.guards.answer_pending
    }
}

fn b_command(b: f32) -> String {
    format!("G90 G0 B{:.3}\n", b)
}
