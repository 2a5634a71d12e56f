//! Logical clock harness shared by the automation tests.

#![allow(dead_code)]

use std::time::Duration;

use focuskit_automation::{Automator, Effect, Notification, TimerQueue};
use focuskit_core::{
    AutomationEvent, CalibrationTable, CameraEvent, McStatus, MotionEvent, OperatorEvent,
    PlayerEvent, TimerEvent,
};
use focuskit_settings::Config;

/// Drives an automator with a manual clock
pub struct Harness {
    pub automator: Automator,
    pub timers: TimerQueue,
    pub now: Duration,
    pub log: Vec<Effect>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let table = CalibrationTable::from_pairs("test", &[(10.0, 5.0), (5.0, 0.0)])
            .expect("valid table");
        Self {
            automator: Automator::new(&config, table),
            timers: TimerQueue::new(),
            now: Duration::ZERO,
            log: Vec::new(),
        }
    }

    /// Apply an event and schedule the timers it requested
    pub fn send(&mut self, event: AutomationEvent) -> Vec<Effect> {
        let effects = self.automator.apply_event(event);
        for effect in &effects {
            if let Effect::Schedule { task, token, delay } = effect {
                self.timers.schedule(
                    self.now,
                    *delay,
                    TimerEvent {
                        task: *task,
                        token: *token,
                    },
                );
            }
        }
        self.log.extend(effects.iter().cloned());
        effects
    }

    /// Advance the clock, firing every timer that comes due
    pub fn advance(&mut self, by: Duration) -> Vec<Effect> {
        let target = self.now + by;
        let mut effects = Vec::new();
        while let Some(due) = self.timers.next_due() {
            if due > target {
                break;
            }
            self.now = due;
            if let Some(timer) = self.timers.pop_due(due) {
                effects.extend(self.send(AutomationEvent::Timer(timer)));
            }
        }
        self.now = target;
        effects
    }

    pub fn advance_ms(&mut self, ms: u64) -> Vec<Effect> {
        self.advance(Duration::from_millis(ms))
    }

    pub fn ready(&mut self) {
        self.send(camera(CameraEvent::DzValidChanged(true)));
        self.send(motion(MotionEvent::ConnectionChanged(true)));
        self.send(motion(MotionEvent::CoordsValidChanged(true)));
        self.send(operator(OperatorEvent::Enable(true)));
    }

    pub fn dz(&mut self, dz: f32) {
        self.send(camera(CameraEvent::DzChanged(dz)));
    }

    pub fn move_to(&mut self, x: f32, y: f32) -> Vec<Effect> {
        self.send(motion(MotionEvent::CoordsChanged {
            x,
            y,
            z: 0.0,
            b: 0.0,
        }))
    }

    pub fn status(&mut self, status: McStatus) -> Vec<Effect> {
        self.send(motion(MotionEvent::StateChanged(status)))
    }

    pub fn pause_at_sample(&mut self) -> Vec<Effect> {
        self.send(AutomationEvent::Player(PlayerEvent::PausedAtSample))
    }
}

pub fn camera(e: CameraEvent) -> AutomationEvent {
    AutomationEvent::Camera(e)
}

pub fn motion(e: MotionEvent) -> AutomationEvent {
    AutomationEvent::Motion(e)
}

pub fn operator(e: OperatorEvent) -> AutomationEvent {
    AutomationEvent::Operator(e)
}

pub fn player(e: PlayerEvent) -> AutomationEvent {
    AutomationEvent::Player(e)
}

pub fn commands(effects: &[Effect]) -> Vec<String> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::SendToMc(line) | Effect::SendToMcWithAnswer(line) => Some(line.clone()),
            _ => None,
        })
        .collect()
}

pub fn answered(effects: &[Effect]) -> Vec<String> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::SendToMcWithAnswer(line) => Some(line.clone()),
            _ => None,
        })
        .collect()
}

pub fn messages(effects: &[Effect]) -> Vec<String> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Notify(Notification::Message(text)) => Some(text.clone()),
            _ => None,
        })
        .collect()
}

pub fn powers(effects: &[Effect]) -> Vec<f32> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::SetLaserPower(p) => Some(*p),
            _ => None,
        })
        .collect()
}

pub fn count(effects: &[Effect], wanted: &Effect) -> usize {
    effects.iter().filter(|e| *e == wanted).count()
}
