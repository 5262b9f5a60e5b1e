//! Homing against the simulated carriages.

use super::common::Rig;
use gantry_common::hal::types::Axis;
use gantry_motion::HomingError;
use gantry_motion::error::HomingLimit;
use gantry_motion::homing::HomingPhase;

#[test]
fn home_zeroes_both_axes_and_releases_endstops() {
    let rig = Rig::start();

    rig.coordinator.home().unwrap();

    let status = rig.coordinator.status();
    assert!(status.referenced);
    assert_eq!(rig.coordinator.position(Axis::X), 0);
    assert_eq!(rig.coordinator.position(Axis::Y), 0);
    for axis in Axis::ALL {
        assert!(!rig.coordinator.shared().endstops.is_pressed(axis));
        assert!(!rig.coordinator.shared().endstops.is_backoff_active(axis));
        // Zero sits just outside the switch after the back-off.
        assert!(rig.gantry.distance(axis) > 0);
    }
    assert_eq!(status.backoffs_started, 2);
    assert_eq!(status.backoffs_completed, 2);
}

#[test]
fn home_twice_reaches_the_same_reference() {
    let rig = Rig::start();
    rig.coordinator.home().unwrap();
    rig.coordinator.move_to(150, 90).unwrap();

    rig.coordinator.home().unwrap();
    assert_eq!(rig.coordinator.shared().positions(), [0, 0]);
    assert!(rig.coordinator.is_referenced());
}

#[test]
fn home_from_a_closed_switch() {
    let rig = Rig::start_with(|config| config.machine.simulation.start_offset_y = 0);

    rig.coordinator.home().unwrap();

    assert_eq!(rig.coordinator.shared().positions(), [0, 0]);
    assert!(!rig.coordinator.shared().endstops.is_pressed(Axis::Y));
    assert!(rig.gantry.distance(Axis::Y) > 0);
}

#[test]
fn home_without_press_fails_with_travel_bound() {
    let rig = Rig::start_with(|config| {
        config.machine.simulation.start_offset_y = 50_000;
        config.homing.max_travel_steps = 100;
    });

    let err = rig.coordinator.home().unwrap_err();

    assert!(matches!(
        err,
        HomingError::Timeout {
            axis: Axis::Y,
            phase: HomingPhase::Approach,
            limit: HomingLimit::Travel(100),
        }
    ));
    assert!(!rig.coordinator.is_referenced());
    assert!(!rig.coordinator.shared().register.snapshot().has_work());
}

#[test]
fn home_after_shutdown_is_rejected() {
    let rig = Rig::start();
    rig.coordinator.shutdown().unwrap();
    assert!(matches!(rig.coordinator.home(), Err(HomingError::NotRunning)));
}
