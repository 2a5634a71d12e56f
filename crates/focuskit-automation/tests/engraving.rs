mod common;

use common::*;
use focuskit_automation::Effect;
use focuskit_core::{AutomationState, McStatus, OperatorEvent};
use focuskit_settings::Config;

fn paused_at(h: &mut Harness, x: f32, y: f32) -> Vec<Effect> {
    h.move_to(x, y);
    let mut effects = h.status(McStatus::Paused);
    effects.extend(h.status(McStatus::Paused));
    effects
}

#[test]
fn stable_pause_sends_one_compensation() {
    let mut h = Harness::new();
    h.ready();
    h.dz(7.5);
    assert_eq!(h.automator.state(), AutomationState::AutoEngraving);

    h.move_to(100.0, 50.0);
    let first = h.status(McStatus::Paused);
    assert!(first.is_empty(), "first pause only records the position");
    h.status(McStatus::Paused);

    assert!(commands(&h.advance_ms(1999)).is_empty());
    let fired = h.advance_ms(1);
    assert_eq!(commands(&fired), vec!["G90 G0 B2.500\n", "M24\n"]);
    assert_eq!(h.automator.message(), "G90 G0 B2.500");
}

#[test]
fn repeated_pause_reports_arm_once() {
    let mut h = Harness::new();
    h.ready();
    h.dz(7.5);
    paused_at(&mut h, 10.0, 10.0);
    for _ in 0..5 {
        h.status(McStatus::Paused);
    }

    let fired = h.advance_ms(10_000);
    assert_eq!(commands(&fired).len(), 2);
}

#[test]
fn unstable_position_does_not_arm() {
    let mut h = Harness::new();
    h.ready();
    h.dz(7.5);

    for i in 0..4 {
        h.move_to(i as f32, 0.0);
        h.status(McStatus::Paused);
    }
    assert!(commands(&h.advance_ms(5000)).is_empty());
}

#[test]
fn flapping_status_never_double_fires() {
    let mut h = Harness::new();
    h.ready();
    h.dz(7.5);
    paused_at(&mut h, 10.0, 10.0);

    h.advance_ms(500);
    h.status(McStatus::Playing);
    h.status(McStatus::Paused);

    let fired = h.advance_ms(1600);
    assert!(commands(&fired).is_empty(), "old task was disarmed by Playing");

    let fired = h.advance_ms(1000);
    assert_eq!(commands(&fired), vec!["G90 G0 B2.500\n", "M24\n"]);
    assert!(commands(&h.advance_ms(10_000)).is_empty());
}

#[test]
fn playing_rearms_for_next_pause() {
    let mut h = Harness::new();
    h.ready();
    h.dz(7.5);
    paused_at(&mut h, 10.0, 10.0);
    h.advance_ms(2000);

    h.status(McStatus::Playing);
    h.dz(10.0 - 0.5);
    paused_at(&mut h, 20.0, 10.0);
    let fired = h.advance_ms(2000);
    assert_eq!(commands(&fired)[0], "G90 G0 B4.500\n");
}

#[test]
fn missing_calibration_entry_reports_without_motion() {
    let mut h = Harness::new();
    h.ready();
    h.dz(20.0);
    paused_at(&mut h, 10.0, 10.0);

    let fired = h.advance_ms(2000);
    assert!(commands(&fired).is_empty());
    assert_eq!(
        messages(&fired),
        vec!["No entry in calibration table for dz=20".to_string()]
    );
}

#[test]
fn disabling_before_fire_suppresses_compensation() {
    let mut h = Harness::new();
    h.ready();
    h.dz(7.5);
    paused_at(&mut h, 10.0, 10.0);
    h.send(operator(OperatorEvent::Enable(false)));
    assert_eq!(h.automator.state(), AutomationState::Disabled);

    assert!(commands(&h.advance_ms(5000)).is_empty());
}

#[test]
fn b_offset_and_report_only_mode() {
    let mut config = Config::default();
    config.automation.b_offset = 1.0;
    config.automation.auto_send_b = false;
    let mut h = Harness::with_config(config);
    h.ready();
    h.dz(7.5);
    paused_at(&mut h, 10.0, 10.0);

    let fired = h.advance_ms(2000);
    assert!(commands(&fired).is_empty());
    assert_eq!(messages(&fired), vec!["G90 G0 B3.500".to_string()]);
}

#[test]
fn cut_mode_pause_does_not_compensate() {
    let mut h = Harness::new();
    h.ready();
    h.send(operator(OperatorEvent::SetCutMode(true)));
    h.dz(7.5);
    paused_at(&mut h, 10.0, 10.0);
    assert!(commands(&h.advance_ms(5000)).is_empty());
}
