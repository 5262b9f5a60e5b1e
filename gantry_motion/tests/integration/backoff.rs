//! Endstop press scenarios: deterministic ticks and repeated presses.

use super::common::{RecordingDriver, Rig, wait_until};
use gantry_common::hal::config::MachineConfig;
use gantry_common::hal::driver::AxisDriver;
use gantry_common::hal::types::{Axis, Direction, EndstopEdge};
use gantry_common::motion::command::{MotionCommand, MotionIntent};
use gantry_common::motion::config::MotionConfig;
use gantry_motion::endstop::EdgeReaction;
use gantry_motion::{MotionScheduler, SharedMotionState};
use std::sync::Arc;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(10);

#[test]
fn press_on_tick_five_runs_exactly_one_backoff() {
    let motion = MotionConfig {
        backoff_duration_ms: 50,
        ..Default::default()
    };
    let shared = Arc::new(SharedMotionState::new(
        [Direction::Backward, Direction::Backward],
        motion.backoff_duration(),
    ));
    let (x, _) = RecordingDriver::new();
    let (y, y_bursts) = RecordingDriver::new();
    let drivers: [Box<dyn AxisDriver>; 2] = [Box::new(x), Box::new(y)];
    let mut scheduler = MotionScheduler::new(
        Arc::clone(&shared),
        drivers,
        &MachineConfig::default(),
        &motion,
    );

    shared
        .register
        .apply(MotionCommand::ToggleContinuous(Axis::Y, Direction::Backward));
    for _ in 1..=4 {
        scheduler.tick(TICK);
    }
    assert_eq!(shared.position(Axis::Y), -80);

    // Tick 5: the switch closes while the axis is driving into it.
    assert_eq!(
        shared.on_edge(Axis::Y, EndstopEdge::Pressed),
        EdgeReaction::BackoffRequested
    );
    scheduler.tick(TICK);

    // Tick 6: continuous flag gone, back-off driving away.
    assert!(!shared.register.intent(Axis::Y).is_continuous(Direction::Backward));
    scheduler.tick(TICK);
    assert!(shared.endstops.is_pressed(Axis::Y));
    assert_eq!(shared.backoff.started(), 1);

    // Bouncing switch during the back-off.
    for _ in 0..5 {
        assert_eq!(
            shared.on_edge(Axis::Y, EndstopEdge::Pressed),
            EdgeReaction::Suppressed
        );
    }

    let mut ticks = 0;
    while shared.endstops.is_pressed(Axis::Y) {
        assert_eq!(shared.backoff.completed(), 0);
        scheduler.tick(TICK);
        ticks += 1;
        assert!(ticks < 100, "back-off never finished");
    }

    assert_eq!(shared.backoff.started(), 1);
    assert_eq!(shared.backoff.completed(), 1);
    assert!(!shared.endstops.is_backoff_active(Axis::Y));
    assert_eq!(shared.register.intent(Axis::Y), MotionIntent::Idle);

    let bursts = y_bursts.lock().clone();
    let away: Vec<_> = bursts.iter().filter(|(d, _)| *d == Direction::Forward).collect();
    assert_eq!(bursts.iter().filter(|(d, _)| *d == Direction::Backward).count(), 4);
    assert!(!away.is_empty());
    // Nothing toward the switch after the press.
    assert!(bursts[4..].iter().all(|(d, _)| *d == Direction::Forward));
}

#[test]
fn stop_during_backoff_halts_the_axis() {
    let motion = MotionConfig {
        backoff_duration_ms: 100,
        ..Default::default()
    };
    let shared = Arc::new(SharedMotionState::new(
        [Direction::Backward, Direction::Backward],
        motion.backoff_duration(),
    ));
    let (x, x_bursts) = RecordingDriver::new();
    let (y, y_bursts) = RecordingDriver::new();
    let drivers: [Box<dyn AxisDriver>; 2] = [Box::new(x), Box::new(y)];
    let mut scheduler = MotionScheduler::new(
        Arc::clone(&shared),
        drivers,
        &MachineConfig::default(),
        &motion,
    );

    shared.on_edge(Axis::Y, EndstopEdge::Pressed);
    scheduler.tick(TICK);
    scheduler.tick(TICK);
    let before = y_bursts.lock().len();
    assert_eq!(before, 2);

    // Operator stop, then the other carriage trips its switch.
    shared.register.apply(MotionCommand::StopAll);
    assert_eq!(
        shared.on_edge(Axis::X, EndstopEdge::Pressed),
        EdgeReaction::BackoffRequested
    );
    for _ in 0..5 {
        scheduler.tick(TICK);
    }

    assert_eq!(y_bursts.lock().len(), before);
    assert_eq!(shared.register.intent(Axis::Y), MotionIntent::Idle);
    // X backs off on its own.
    assert!(x_bursts.lock().iter().all(|(d, _)| *d == Direction::Forward));
    assert!(!x_bursts.lock().is_empty());

    while scheduler.backoff_running(Axis::X) || scheduler.backoff_running(Axis::Y) {
        scheduler.tick(TICK);
    }
    assert_eq!(shared.backoff.completed(), 2);
    assert_eq!(y_bursts.lock().len(), before);
}

#[test]
fn rapid_presses_queue_a_single_backoff() {
    let shared = Arc::new(SharedMotionState::new(
        [Direction::Backward, Direction::Backward],
        Duration::from_millis(300),
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    shared.on_edge(Axis::X, EndstopEdge::Pressed);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(shared.backoff.drain_requests().len(), 1);
    assert_eq!(shared.endstops.press_events(Axis::X), 400);
    assert_eq!(shared.endstops.suppressed_presses(Axis::X), 399);
}

#[test]
fn press_storm_on_running_rig_backs_off_once() {
    let rig = Rig::start();
    let shared = rig.coordinator.shared();

    for _ in 0..20 {
        shared.on_edge(Axis::X, EndstopEdge::Pressed);
    }
    assert!(wait_until(Duration::from_secs(2), || {
        !shared.endstops.is_backoff_active(Axis::X)
    }));

    assert_eq!(shared.backoff.started(), 1);
    assert_eq!(shared.backoff.completed(), 1);
    assert!(!shared.endstops.is_pressed(Axis::X));
    // Driven away from the switch.
    assert!(rig.coordinator.position(Axis::X) > 0);
}

#[test]
fn release_does_not_resume_motion() {
    let rig = Rig::start();
    let shared = rig.coordinator.shared();
    shared
        .register
        .apply(MotionCommand::ToggleContinuous(Axis::Y, Direction::Forward));

    shared.on_edge(Axis::Y, EndstopEdge::Pressed);
    shared.on_edge(Axis::Y, EndstopEdge::Released);
    assert!(wait_until(Duration::from_secs(2), || {
        !shared.endstops.is_backoff_active(Axis::Y)
    }));

    assert_eq!(shared.register.intent(Axis::Y), MotionIntent::Idle);
    assert_eq!(shared.register.intent(Axis::X), MotionIntent::Idle);
}
