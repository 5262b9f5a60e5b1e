//! Relative moves, stop and calibration round trips.

use super::common::{Rig, wait_until};
use gantry_common::hal::types::{Axis, Direction};
use gantry_common::motion::command::{IntentKind, MotionIntent};
use gantry_motion::MotionError;
use std::time::Duration;

#[test]
fn move_and_reverse_returns_to_start() {
    let rig = Rig::start();
    rig.coordinator.home().unwrap();
    let before = rig.coordinator.shared().positions();
    let carriage_before = [rig.gantry.distance(Axis::X), rig.gantry.distance(Axis::Y)];

    rig.coordinator.move_to(250, 130).unwrap();
    assert_eq!(rig.coordinator.shared().positions(), [before[0] + 250, before[1] + 130]);

    rig.coordinator.move_to(-250, -130).unwrap();
    assert_eq!(rig.coordinator.shared().positions(), before);
    assert_eq!(
        [rig.gantry.distance(Axis::X), rig.gantry.distance(Axis::Y)],
        carriage_before
    );
}

#[test]
fn zero_move_returns_immediately() {
    let rig = Rig::start();
    rig.coordinator.home().unwrap();
    rig.coordinator.move_to(0, 0).unwrap();
    assert_eq!(rig.coordinator.shared().positions(), [0, 0]);
}

#[test]
fn move_before_home_is_rejected() {
    let rig = Rig::start();
    assert!(matches!(
        rig.coordinator.move_to(10, 10),
        Err(MotionError::NotReferenced)
    ));
    assert_eq!(rig.coordinator.shared().stats().bursts, 0);
}

#[test]
fn move_into_endstop_aborts() {
    let rig = Rig::start();
    rig.coordinator.home().unwrap();

    let err = rig.coordinator.move_to(-100_000, 0).unwrap_err();

    assert!(matches!(err, MotionError::Aborted(_)));
    let at_abort = rig.coordinator.position(Axis::X);
    assert!(at_abort < 0);
    assert!(at_abort > -100_000);
    assert!(wait_until(Duration::from_secs(2), || {
        !rig.coordinator.shared().endstops.is_backoff_active(Axis::X)
    }));
    // The aborted move left the back-off running.
    assert!(rig.coordinator.position(Axis::X) > at_abort);
}

#[test]
fn step_failure_aborts_move_without_counting() {
    let rig = Rig::start();
    rig.coordinator.home().unwrap();
    rig.gantry.inject_step_fault(Axis::Y);

    let err = rig.coordinator.move_to(0, 100).unwrap_err();

    assert!(matches!(err, MotionError::Hal(_)));
    assert_eq!(rig.coordinator.position(Axis::Y), 0);
}

#[test]
fn stop_all_clears_intents_within_one_tick() {
    let rig = Rig::start();
    rig.coordinator
        .issue_intent(Axis::X, IntentKind::Continuous(Direction::Forward));
    rig.coordinator
        .issue_intent(Axis::Y, IntentKind::StepOnce(Direction::Forward));

    assert!(wait_until(Duration::from_secs(1), || {
        rig.coordinator.position(Axis::X) > 0
    }));
    rig.coordinator.stop_all();

    let status = rig.coordinator.status();
    assert!(status.axes.iter().all(|a| a.intent == MotionIntent::Idle));

    // At most the burst in flight lands after the stop.
    let tick = Duration::from_millis(rig.config.motion.max_tick_latency_ms);
    std::thread::sleep(tick);
    let settled = rig.coordinator.position(Axis::X);
    std::thread::sleep(tick * 3);
    assert_eq!(rig.coordinator.position(Axis::X), settled);
}

#[test]
fn continuous_toggle_stops_on_second_press() {
    let rig = Rig::start();
    let kind = IntentKind::Continuous(Direction::Forward);
    rig.coordinator.issue_intent(Axis::Y, kind);
    assert!(wait_until(Duration::from_secs(1), || {
        rig.coordinator.position(Axis::Y) >= 40
    }));
    rig.coordinator.issue_intent(Axis::Y, kind);
    assert_eq!(
        rig.coordinator.shared().register.intent(Axis::Y),
        MotionIntent::Idle
    );
}

#[test]
fn calibration_round_trip() {
    let rig = Rig::start();
    rig.coordinator.save_calibration("default", 120, 80).unwrap();
    assert_eq!(rig.coordinator.load_calibration("default").unwrap(), (120, 80));
}

#[test]
fn save_current_position_after_jog() {
    let rig = Rig::start();
    rig.coordinator.home().unwrap();
    rig.coordinator.move_to(60, 40).unwrap();

    assert_eq!(rig.coordinator.save_current_position("house").unwrap(), (60, 40));
    assert_eq!(rig.coordinator.load_calibration("house").unwrap(), (60, 40));
}
