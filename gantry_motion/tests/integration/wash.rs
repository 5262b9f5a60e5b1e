//! Wash cycle on the simulated rig.

use super::common::Rig;
use gantry_common::hal::types::Axis;
use gantry_hal::PeripheralCommand;
use gantry_hal::peripheral::SimulatedPeripherals;
use gantry_motion::{CalibrationError, CycleError, WashCycleOrchestrator, WorkCycleLog};

fn orchestrator<'a>(
    rig: &'a Rig,
    peripherals: &SimulatedPeripherals,
) -> WashCycleOrchestrator<'a, gantry_motion::MotionCoordinator> {
    WashCycleOrchestrator::new(
        &rig.coordinator,
        Box::new(peripherals.clone()),
        WorkCycleLog::new(&rig.config.storage.cycle_log),
        rig.config.wash.clone(),
    )
}

#[test]
fn full_cycle_ends_homed_and_logged() {
    let rig = Rig::start();
    rig.coordinator.save_calibration("default", 120, 80).unwrap();
    let peripherals = SimulatedPeripherals::new();
    let wash = orchestrator(&rig, &peripherals);

    let report = wash.run_cycle().unwrap();

    assert!(report.log_written);
    assert_eq!(
        peripherals.history(),
        vec![
            PeripheralCommand::PumpSoap,
            PeripheralCommand::Rotate,
            PeripheralCommand::PumpWater
        ]
    );
    assert_eq!(rig.coordinator.shared().positions(), [0, 0]);
    assert!(rig.coordinator.is_referenced());

    let entries = WorkCycleLog::new(&rig.config.storage.cycle_log).entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].outcome, "completed");
}

#[test]
fn cycle_visits_park_position() {
    let rig = Rig::start_with(|config| config.wash.park_label = Some("house".to_string()));
    rig.coordinator.save_calibration("default", 60, 40).unwrap();
    rig.coordinator.save_calibration("house", 25, 15).unwrap();
    let peripherals = SimulatedPeripherals::new();

    orchestrator(&rig, &peripherals).run_cycle().unwrap();

    assert_eq!(rig.coordinator.shared().positions(), [25, 15]);
}

#[test]
fn missing_calibration_aborts_without_motion() {
    let rig = Rig::start();
    let start = [rig.gantry.distance(Axis::X), rig.gantry.distance(Axis::Y)];
    let peripherals = SimulatedPeripherals::new();

    let err = orchestrator(&rig, &peripherals).run_cycle().unwrap_err();

    assert!(matches!(
        err,
        CycleError::Calibration(CalibrationError::NotFound(_))
    ));
    assert_eq!(
        [rig.gantry.distance(Axis::X), rig.gantry.distance(Axis::Y)],
        start
    );
    assert_eq!(rig.coordinator.shared().positions(), [0, 0]);
    assert_eq!(rig.coordinator.shared().backoff.started(), 0);
    assert!(peripherals.history().is_empty());

    let entries = WorkCycleLog::new(&rig.config.storage.cycle_log).entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].outcome.contains("not found"));
}
