use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use focuskit_automation::{Automator, ScanPhase};
use focuskit_communication::{
    AutomationListener, AutomationRuntime, LinkError, LinkResult, MotionLink, ScanProgramPlayer,
};
use focuskit_core::{
    AutomationEvent, AutomationState, CalibrationTable, CameraEvent, HeightSurface,
    JsonSurfaceStore, McStatus, MotionEvent, OperatorEvent, PlayerEvent, SurfaceError,
    SurfaceStore,
};
use focuskit_settings::Config;
use parking_lot::Mutex;

type Log = Arc<Mutex<Vec<String>>>;

struct RecordingLink {
    log: Log,
}

impl MotionLink for RecordingLink {
    fn send(&mut self, line: &str) -> LinkResult<()> {
        self.log.lock().push(line.to_string());
        Ok(())
    }

    fn send_with_answer(&mut self, line: &str) -> LinkResult<()> {
        self.log.lock().push(format!("answer:{}", line));
        Ok(())
    }

    fn set_laser_power(&mut self, power: f32) -> LinkResult<()> {
        self.log.lock().push(format!("power:{:.3}", power));
        Ok(())
    }
}

/// Rejects the first `failures` answer-required sends
struct FlakyLink {
    log: Log,
    failures: usize,
}

impl MotionLink for FlakyLink {
    fn send(&mut self, line: &str) -> LinkResult<()> {
        self.log.lock().push(line.to_string());
        Ok(())
    }

    fn send_with_answer(&mut self, line: &str) -> LinkResult<()> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(LinkError::SendFailed {
                command: line.trim_end().to_string(),
                reason: "serial write timed out".to_string(),
            });
        }
        self.log.lock().push(format!("answer:{}", line));
        Ok(())
    }

    fn set_laser_power(&mut self, _power: f32) -> LinkResult<()> {
        Ok(())
    }
}

struct RecordingPlayer {
    log: Log,
    fail_start: bool,
}

impl ScanProgramPlayer for RecordingPlayer {
    fn start(&mut self, _program: &str) -> LinkResult<()> {
        if self.fail_start {
            return Err(LinkError::Player("no program slot".to_string()));
        }
        self.log.lock().push("start".to_string());
        Ok(())
    }

    fn resume(&mut self) -> LinkResult<()> {
        self.log.lock().push("resume".to_string());
        Ok(())
    }

    fn stop(&mut self) -> LinkResult<()> {
        self.log.lock().push("stop".to_string());
        Ok(())
    }
}

struct FailingStore;

impl SurfaceStore for FailingStore {
    fn save(&mut self, _surface: &HeightSurface) -> Result<(), SurfaceError> {
        Err(SurfaceError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        )))
    }

    fn load(&mut self) -> Result<HeightSurface, SurfaceError> {
        Err(SurfaceError::Empty)
    }
}

struct Fixture {
    runtime: AutomationRuntime,
    link: Log,
    player: Log,
}

fn automator(config: &Config) -> Automator {
    let table = CalibrationTable::from_pairs("test", &[(10.0, 5.0), (5.0, 0.0)]).unwrap();
    Automator::new(config, table)
}

fn fixture(config: Config, store: Box<dyn SurfaceStore>, fail_start: bool) -> Fixture {
    let link = Log::default();
    let player = Log::default();
    let (runtime, _handle) = AutomationRuntime::new(
        automator(&config),
        Box::new(RecordingLink { log: link.clone() }),
        Box::new(RecordingPlayer {
            log: player.clone(),
            fail_start,
        }),
        store,
    );
    Fixture {
        runtime,
        link,
        player,
    }
}

fn ready_events() -> Vec<AutomationEvent> {
    vec![
        AutomationEvent::Camera(CameraEvent::DzValidChanged(true)),
        AutomationEvent::Camera(CameraEvent::DzChanged(7.5)),
        AutomationEvent::Motion(MotionEvent::ConnectionChanged(true)),
        AutomationEvent::Motion(MotionEvent::CoordsValidChanged(true)),
        AutomationEvent::Operator(OperatorEvent::Enable(true)),
    ]
}

fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

fn scan_request() -> AutomationEvent {
    AutomationEvent::Operator(OperatorEvent::ScanSurface {
        width: 10,
        height: 10,
        step: 10,
        left_offset: 0,
    })
}

#[test]
fn engraving_compensation_reaches_the_link() {
    let mut f = fixture(Config::default(), Box::new(FailingStore), false);
    for event in ready_events() {
        f.runtime.handle_event(event, Duration::ZERO);
    }
    for _ in 0..2 {
        f.runtime.handle_event(
            AutomationEvent::Motion(MotionEvent::StateChanged(McStatus::Paused)),
            Duration::ZERO,
        );
    }
    assert_eq!(f.runtime.pending_timers(), 1);

    f.runtime.fire_due(ms(1999));
    assert!(f.link.lock().is_empty());

    f.runtime.fire_due(ms(2000));
    assert_eq!(*f.link.lock(), vec!["G90 G0 B2.500\n", "M24\n"]);
    assert_eq!(f.runtime.status().read().message, "G90 G0 B2.500");
}

#[test]
fn completed_scan_is_persisted_and_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("machine").join("surface.json");

    let mut f = fixture(
        Config::default(),
        Box::new(JsonSurfaceStore::new(&path)),
        false,
    );
    for event in ready_events() {
        f.runtime.handle_event(event, Duration::ZERO);
    }
    f.runtime.handle_event(scan_request(), Duration::ZERO);
    assert_eq!(f.runtime.automator().state(), AutomationState::Scanning);

    let mut now = Duration::ZERO;
    for _ in 0..4 {
        f.runtime
            .handle_event(AutomationEvent::Player(PlayerEvent::PausedAtSample), now);
        now += ms(1000);
        f.runtime.fire_due(now);
    }
    f.runtime
        .handle_event(AutomationEvent::Player(PlayerEvent::ProgramStopped), now);

    assert!(path.exists());
    assert_eq!(
        *f.player.lock(),
        vec!["start", "resume", "resume", "resume", "resume"]
    );
    {
        let status = f.runtime.status();
        let status = status.read();
        assert_eq!(status.state, AutomationState::AutoEngraving);
        assert_eq!(status.scan_phase, ScanPhase::Complete);
        assert_eq!((status.captured, status.total), (4, 4));
    }

    let mut reloaded = fixture(
        Config::default(),
        Box::new(JsonSurfaceStore::new(&path)),
        false,
    );
    reloaded.runtime.handle_event(
        AutomationEvent::Operator(OperatorEvent::LoadLastScan),
        Duration::ZERO,
    );
    reloaded.runtime.handle_event(
        AutomationEvent::Operator(OperatorEvent::ApproveScan),
        Duration::ZERO,
    );

    let automator = reloaded.runtime.automator();
    assert!(automator.session().is_approved());
    assert!(automator.session().surface().is_sorted());
    assert_eq!(automator.session().surface().interpolate(5.0, 5.0).unwrap(), 2.5);
}

#[test]
fn player_start_failure_ends_the_scan() {
    let mut f = fixture(Config::default(), Box::new(FailingStore), true);
    for event in ready_events() {
        f.runtime.handle_event(event, Duration::ZERO);
    }
    f.runtime.handle_event(scan_request(), Duration::ZERO);

    let automator = f.runtime.automator();
    assert_eq!(automator.state(), AutomationState::AutoEngraving);
    assert_eq!(automator.session().phase(), ScanPhase::Cancelled);
}

#[test]
fn persistence_failure_is_reported() {
    let mut f = fixture(Config::default(), Box::new(FailingStore), false);
    for event in ready_events() {
        f.runtime.handle_event(event, Duration::ZERO);
    }
    f.runtime.handle_event(scan_request(), Duration::ZERO);
    for i in 0..4 {
        f.runtime.handle_event(
            AutomationEvent::Player(PlayerEvent::PausedAtSample),
            ms(i * 1000),
        );
        f.runtime.fire_due(ms(i * 1000 + 1000));
    }
    f.runtime
        .handle_event(AutomationEvent::Player(PlayerEvent::ProgramStopped), ms(5000));

    let status = f.runtime.status();
    let status = status.read();
    assert!(status.message.starts_with("Surface persistence failed"));
    assert_eq!(status.scan_phase, ScanPhase::Complete);
    assert_eq!(status.total, 4);
}

#[test]
fn failed_load_leaves_surface_untouched() {
    let mut f = fixture(Config::default(), Box::new(FailingStore), false);
    f.runtime.handle_event(
        AutomationEvent::Operator(OperatorEvent::LoadLastScan),
        Duration::ZERO,
    );
    let automator = f.runtime.automator();
    assert!(automator.session().surface().is_empty());
    assert!(automator.message().starts_with("Surface persistence failed"));
}

#[test]
fn failed_cut_correction_send_does_not_block_later_corrections() {
    let link = Log::default();
    let config = Config::default();
    let (mut runtime, _handle) = AutomationRuntime::new(
        automator(&config),
        Box::new(FlakyLink {
            log: link.clone(),
            failures: 1,
        }),
        Box::new(RecordingPlayer {
            log: Log::default(),
            fail_start: false,
        }),
        Box::new(FailingStore),
    );
    for event in ready_events() {
        runtime.handle_event(event, Duration::ZERO);
    }
    runtime.handle_event(scan_request(), Duration::ZERO);
    for i in 0..4 {
        runtime.handle_event(
            AutomationEvent::Player(PlayerEvent::PausedAtSample),
            ms(i * 1000),
        );
        runtime.fire_due(ms(i * 1000 + 1000));
    }
    runtime.handle_event(AutomationEvent::Player(PlayerEvent::ProgramStopped), ms(5000));
    runtime.handle_event(
        AutomationEvent::Operator(OperatorEvent::ApproveScan),
        ms(5000),
    );
    runtime.handle_event(
        AutomationEvent::Operator(OperatorEvent::SetCutMode(true)),
        ms(5000),
    );
    runtime.handle_event(
        AutomationEvent::Motion(MotionEvent::CoordsChanged {
            x: 5.0,
            y: 5.0,
            z: 0.0,
            b: 0.0,
        }),
        ms(5000),
    );
    assert_eq!(runtime.automator().state(), AutomationState::AutoCutting);

    runtime.handle_event(
        AutomationEvent::Motion(MotionEvent::StateChanged(McStatus::Playing)),
        ms(5000),
    );
    runtime.fire_due(ms(6000));
    assert!(!runtime.automator().answer_pending());
    assert!(link.lock().is_empty());
    assert!(runtime
        .status()
        .read()
        .message
        .starts_with("Correction G90 G0 B2.500 not sent"));

    let mut now = ms(6000);
    for _ in 0..3 {
        runtime.handle_event(
            AutomationEvent::Motion(MotionEvent::StateChanged(McStatus::Playing)),
            now,
        );
        now += ms(1000);
        runtime.fire_due(now);
    }
    assert_eq!(*link.lock(), vec!["answer:G90 G0 B2.500\n"]);
    assert!(runtime.automator().answer_pending());
}

struct TestListener {
    calls: Arc<tokio::sync::Mutex<Vec<String>>>,
}

#[async_trait]
impl AutomationListener for TestListener {
    async fn on_state_changed(&self, state: AutomationState) {
        self.calls.lock().await.push(format!("state:{:?}", state));
    }

    async fn on_message(&self, message: &str) {
        self.calls.lock().await.push(format!("message:{}", message));
    }
}

#[tokio::test]
async fn run_drains_timers_after_input_ends() {
    let mut config = Config::default();
    config.automation.engrave_delay_ms = 20;

    let link = Log::default();
    let (mut runtime, handle) = AutomationRuntime::new(
        automator(&config),
        Box::new(RecordingLink { log: link.clone() }),
        Box::new(RecordingPlayer {
            log: Log::default(),
            fail_start: false,
        }),
        Box::new(FailingStore),
    );

    let listener = Arc::new(TestListener {
        calls: Arc::new(tokio::sync::Mutex::new(Vec::new())),
    });
    let calls = listener.calls.clone();
    let _registration = runtime.register_listener(listener);
    assert_eq!(runtime.listener_count(), 1);

    let task = tokio::spawn(runtime.run());

    for event in ready_events() {
        handle.send(event).unwrap();
    }
    handle.mc_state_changed(McStatus::Paused).unwrap();
    handle.mc_state_changed(McStatus::Paused).unwrap();
    drop(handle);

    let automator = task.await.unwrap();
    assert_eq!(automator.state(), AutomationState::AutoEngraving);
    assert_eq!(*link.lock(), vec!["G90 G0 B2.500\n", "M24\n"]);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let calls = calls.lock().await;
    assert!(calls.iter().any(|c| c == "state:AutoEngraving"));
    assert!(calls.iter().any(|c| c == "message:G90 G0 B2.500"));
}

#[tokio::test]
async fn unregistered_listener_is_removed() {
    let (mut runtime, _handle) = AutomationRuntime::new(
        automator(&Config::default()),
        Box::new(RecordingLink {
            log: Log::default(),
        }),
        Box::new(RecordingPlayer {
            log: Log::default(),
            fail_start: false,
        }),
        Box::new(FailingStore),
    );
    let registration = runtime.register_listener(Arc::new(TestListener {
        calls: Arc::new(tokio::sync::Mutex::new(Vec::new())),
    }));
    runtime.unregister_listener(registration);
    assert_eq!(runtime.listener_count(), 0);
}
