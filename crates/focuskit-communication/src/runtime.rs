//! Async automation runtime
//!
//! Hosts an [`Automator`] on a tokio task. The loop selects between the
//! inbound event channel and the earliest pending deferred task, applies
//! each event, and executes the resulting effects through the collaborator
//! traits. Storage results and collaborator failures are fed back as events
//! before the next inbound event is read.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use focuskit_automation::{Automator, Effect, Notification, TimerQueue};
use focuskit_core::{
    AutomationEvent, MotionEvent, PlayerEvent, StorageEvent, SurfaceStore, TimerEvent,
};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::handle::AutomationHandle;
use crate::link::{MotionLink, ScanProgramPlayer};
use crate::listener::{AutomationListener, AutomationListenerHandle};
use crate::status::StatusSnapshot;

type ListenerMap = Arc<RwLock<HashMap<String, Arc<dyn AutomationListener>>>>;

enum Step {
    Event(Option<AutomationEvent>),
    Timers,
}

/// Event loop around the automator
pub struct AutomationRuntime {
    automator: Automator,
    link: Box<dyn MotionLink>,
    player: Box<dyn ScanProgramPlayer>,
    store: Box<dyn SurfaceStore>,
    timers: TimerQueue,
    pending: VecDeque<AutomationEvent>,
    listeners: ListenerMap,
    status: Arc<RwLock<StatusSnapshot>>,
    rx: mpsc::UnboundedReceiver<AutomationEvent>,
}

impl AutomationRuntime {
    /// Create a runtime and the handle that feeds it
    pub fn new(
        automator: Automator,
        link: Box<dyn MotionLink>,
        player: Box<dyn ScanProgramPlayer>,
        store: Box<dyn SurfaceStore>,
    ) -> (Self, AutomationHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let status = StatusSnapshot::capture(&automator);
        let runtime = Self {
            automator,
            link,
            player,
            store,
            timers: TimerQueue::new(),
            pending: VecDeque::new(),
            listeners: Arc::new(RwLock::new(HashMap::new())),
            status: Arc::new(RwLock::new(status)),
            rx,
        };
        (runtime, AutomationHandle::new(tx))
    }

    /// Register a listener for notifications
    pub fn register_listener(
        &mut self,
        listener: Arc<dyn AutomationListener>,
    ) -> AutomationListenerHandle {
        let id = Uuid::new_v4().to_string();
        let handle = AutomationListenerHandle(id.clone());
        self.listeners.write().insert(id, listener);
        handle
    }

    /// Remove a listener
    pub fn unregister_listener(&mut self, handle: AutomationListenerHandle) {
        let _ = self.listeners.write().remove(&handle.0);
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Shared status snapshot, refreshed after every event
    pub fn status(&self) -> Arc<RwLock<StatusSnapshot>> {
        self.status.clone()
    }

    /// The hosted automator
    pub fn automator(&self) -> &Automator {
        &self.automator
    }

    /// Number of pending deferred tasks
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Run until every handle is dropped and no deferred task remains
    pub async fn run(mut self) -> Automator {
        let origin = Instant::now();
        let mut open = true;
        info!("Automation runtime started");

        loop {
            let next_due = self.timers.next_due();
            if !open && next_due.is_none() {
                break;
            }
            let deadline = origin + next_due.unwrap_or_default();

            // Queued events go before timers that came due meanwhile
            let step = tokio::select! {
                biased;
                event = self.rx.recv(), if open => Step::Event(event),
                _ = tokio::time::sleep_until(deadline), if next_due.is_some() => Step::Timers,
            };

            match step {
                Step::Event(Some(event)) => self.handle_event(event, origin.elapsed()),
                Step::Event(None) => {
                    debug!("All handles dropped, draining {} timers", self.timers.len());
                    open = false;
                }
                Step::Timers => self.fire_due(origin.elapsed()),
            }
        }

        info!("Automation runtime stopped");
        self.automator
    }

    /// Apply one event at logical time `now`, then any follow-up events
    pub fn handle_event(&mut self, event: AutomationEvent, now: Duration) {
        self.pending.push_back(event);
        while let Some(event) = self.pending.pop_front() {
            let effects = self.automator.apply_event(event);
            for effect in effects {
                self.execute(effect, now);
            }
        }
        *self.status.write() = StatusSnapshot::capture(&self.automator);
    }

    /// Fire every deferred task due at logical time `now`
    pub fn fire_due(&mut self, now: Duration) {
        while let Some(timer) = self.timers.pop_due(now) {
            self.handle_event(AutomationEvent::Timer(timer), now);
        }
    }

    fn execute(&mut self, effect: Effect, now: Duration) {
        match effect {
            Effect::SendToMc(line) => {
                if let Err(e) = self.link.send(&line) {
                    self.link_failed(e.to_string());
                }
            }
            Effect::SendToMcWithAnswer(line) => {
                // no acknowledgment follows a failed send
                if let Err(e) = self.link.send_with_answer(&line) {
                    warn!("Motion link: {}", e);
                    self.pending.push_back(AutomationEvent::Motion(MotionEvent::SendFailed {
                        command: line.trim_end().to_string(),
                        reason: e.to_string(),
                    }));
                }
            }
            Effect::SetLaserPower(power) => {
                if let Err(e) = self.link.set_laser_power(power) {
                    self.link_failed(e.to_string());
                }
            }
            Effect::StartScanProgram(program) => {
                if let Err(e) = self.player.start(&program) {
                    warn!("Scan program did not start: {}", e);
                    self.pending
                        .push_back(AutomationEvent::Player(PlayerEvent::ProgramStopped));
                }
            }
            Effect::ContinueScan => {
                if let Err(e) = self.player.resume() {
                    warn!("Scan program did not resume: {}", e);
                    self.pending
                        .push_back(AutomationEvent::Player(PlayerEvent::ProgramStopped));
                }
            }
            Effect::StopScanProgram => {
                if let Err(e) = self.player.stop() {
                    warn!("Scan program did not stop: {}", e);
                }
            }
            Effect::Schedule { task, token, delay } => {
                self.timers.schedule(now, delay, TimerEvent { task, token });
            }
            Effect::SaveSurface(surface) => {
                let result = match self.store.save(&surface) {
                    Ok(()) => StorageEvent::SurfaceSaved,
                    Err(e) => StorageEvent::PersistenceFailed(e.to_string()),
                };
                self.pending.push_back(AutomationEvent::Storage(result));
            }
            Effect::LoadSurface => {
                let result = match self.store.load() {
                    Ok(surface) => StorageEvent::SurfaceLoaded(surface),
                    Err(e) => StorageEvent::PersistenceFailed(e.to_string()),
                };
                self.pending.push_back(AutomationEvent::Storage(result));
            }
            Effect::Notify(notification) => self.notify(notification),
        }
    }

    fn link_failed(&mut self, reason: String) {
        warn!("Motion link: {}", reason);
        self.notify(Notification::Message(reason));
    }

    fn notify(&self, notification: Notification) {
        info!("{}", notification);

        if tokio::runtime::Handle::try_current().is_err() {
            debug!("No async runtime, listeners skipped");
            return;
        }

        for listener in self.listeners.read().values().cloned() {
            let notification = notification.clone();
            tokio::spawn(async move {
                match notification {
                    Notification::StateChanged(state) => listener.on_state_changed(state).await,
                    Notification::Message(text) => listener.on_message(&text).await,
                    Notification::MissingEntryRequested { index } => {
                        listener.on_missing_entry(index).await
                    }
                    Notification::ScanProgress { captured, total } => {
                        listener.on_scan_progress(captured, total).await
                    }
                    Notification::PowerChanged(power) => listener.on_power_changed(power).await,
                }
            });
        }
    }
}
