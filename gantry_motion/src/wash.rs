//! Wash-cycle orchestrator.
//!
//! Composes homing, relative moves and peripheral commands into one work
//! cycle:
//!
//! ```text
//!   preflight: load calibration (x, y) [+ park position]
//!   home -> move (0, y) -> pump_soap -> move (x, 0) -> rotate
//!        -> move (-x, 0) -> pump_water -> home [-> move (park)]
//! ```
//!
//! Calibration records are read before the first motion, so a missing or
//! broken record aborts the cycle without moving anything. Any later step
//! failure stops all motion and disables the drivers. In every case a log
//! entry is appended; a log write error is reported but never turns a
//! completed cycle into a failed one.

use crate::coordinator::MotionCoordinator;
use crate::cycle_log::{CycleOutcome, WorkCycleLog, WorkCycleLogEntry, timestamp_now};
use crate::error::{CalibrationError, CycleError, HomingError, MotionError};
use gantry_common::motion::config::WashConfig;
use gantry_hal::{PeripheralCommand, PeripheralLink};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

/// Motion capabilities needed by the wash cycle.
pub trait GantryMotion {
    /// Home both axes.
    fn home(&self) -> Result<(), HomingError>;
    /// Relative move, blocking.
    fn move_to(&self, dx: i64, dy: i64) -> Result<(), MotionError>;
    /// Read a calibration record.
    fn load_calibration(&self, label: &str) -> Result<(i64, i64), CalibrationError>;
    /// Clear every intent.
    fn stop_all(&self);
    /// De-energise both drivers.
    fn disable_drivers(&self) -> Result<(), MotionError>;
}

impl GantryMotion for MotionCoordinator {
    fn home(&self) -> Result<(), HomingError> {
        MotionCoordinator::home(self)
    }

    fn move_to(&self, dx: i64, dy: i64) -> Result<(), MotionError> {
        MotionCoordinator::move_to(self, dx, dy)
    }

    fn load_calibration(&self, label: &str) -> Result<(i64, i64), CalibrationError> {
        MotionCoordinator::load_calibration(self, label)
    }

    fn stop_all(&self) {
        MotionCoordinator::stop_all(self)
    }

    fn disable_drivers(&self) -> Result<(), MotionError> {
        MotionCoordinator::disable_drivers(self)
    }
}

/// One step of the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WashStep {
    /// Drive to the reference.
    Home,
    /// Relative move.
    Move(i64, i64),
    /// Peripheral actuation.
    Actuate(PeripheralCommand),
}

impl fmt::Display for WashStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WashStep::Home => f.write_str("home"),
            WashStep::Move(dx, dy) => write!(f, "move ({dx}, {dy})"),
            WashStep::Actuate(command) => write!(f, "actuate {command}"),
        }
    }
}

/// Result of a completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Start time (local).
    pub start_time: String,
    /// End time (local).
    pub end_time: String,
    /// Steps executed, in order.
    pub steps: Vec<WashStep>,
    /// Whether the log entry was written.
    pub log_written: bool,
}

/// Runs wash cycles on a [`GantryMotion`] and a peripheral link.
pub struct WashCycleOrchestrator<'a, M: GantryMotion + ?Sized> {
    motion: &'a M,
    peripherals: Mutex<Box<dyn PeripheralLink>>,
    log: WorkCycleLog,
    config: WashConfig,
    busy: AtomicBool,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<'a, M: GantryMotion + ?Sized> WashCycleOrchestrator<'a, M> {
    /// Create an orchestrator.
    pub fn new(
        motion: &'a M,
        peripherals: Box<dyn PeripheralLink>,
        log: WorkCycleLog,
        config: WashConfig,
    ) -> Self {
        Self {
            motion,
            peripherals: Mutex::new(peripherals),
            log,
            config,
            busy: AtomicBool::new(false),
        }
    }

    /// Whether a cycle is in progress.
    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Send one peripheral command outside a cycle.
    pub fn actuate(&self, command: &PeripheralCommand) -> Result<Vec<String>, CycleError> {
        command.validate()?;
        let lines = self.peripherals.lock().send(command)?;
        for line in &lines {
            info!("Peripheral: {}", line);
        }
        Ok(lines)
    }

    /// Run one complete wash cycle.
    ///
    /// Rejected with `CycleError::AlreadyRunning` while another cycle runs.
    pub fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Wash cycle requested while one is running, ignored");
            return Err(CycleError::AlreadyRunning);
        }
        let _guard = BusyGuard(&self.busy);

        let start_time = timestamp_now();
        info!("Wash cycle started");
        let mut steps = Vec::new();

        let result = self
            .preflight()
            .and_then(|plan| self.execute(&plan, &mut steps).map_err(|e| self.abort(e)));

        let end_time = timestamp_now();
        let outcome = match &result {
            Ok(()) => CycleOutcome::Completed,
            Err(e) => CycleOutcome::Aborted(e.to_string()),
        };
        let entry = WorkCycleLogEntry::new(start_time.clone(), end_time.clone(), &outcome);
        let log_written = match self.log.append(&entry) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to append to {}: {}", self.log.path().display(), e);
                false
            }
        };

        match result {
            Ok(()) => {
                info!("Wash cycle completed ({} steps)", steps.len());
                Ok(CycleReport {
                    start_time,
                    end_time,
                    steps,
                    log_written,
                })
            }
            Err(e) => {
                error!("Wash cycle aborted: {}", e);
                Err(e)
            }
        }
    }

    fn preflight(&self) -> Result<Vec<WashStep>, CycleError> {
        let label = &self.config.calibration_label;
        let (x, y) = self.motion.load_calibration(label)?;
        let park = match &self.config.park_label {
            Some(park) => Some(self.motion.load_calibration(park)?),
            None => None,
        };

        let mut plan = vec![
            WashStep::Home,
            WashStep::Move(0, y),
            WashStep::Actuate(PeripheralCommand::PumpSoap),
            WashStep::Move(x, 0),
            WashStep::Actuate(PeripheralCommand::Rotate),
            WashStep::Move(-x, 0),
            WashStep::Actuate(PeripheralCommand::PumpWater),
            WashStep::Home,
        ];
        if let Some((px, py)) = park {
            plan.push(WashStep::Move(px, py));
        }
        Ok(plan)
    }

    fn execute(&self, plan: &[WashStep], done: &mut Vec<WashStep>) -> Result<(), CycleError> {
        for (n, step) in plan.iter().enumerate() {
            info!("Wash step {}/{}: {}", n + 1, plan.len(), step);
            match step {
                WashStep::Home => self.motion.home()?,
                WashStep::Move(dx, dy) => self.motion.move_to(*dx, *dy)?,
                WashStep::Actuate(command) => {
                    self.actuate(command)?;
                }
            }
            done.push(step.clone());
        }
        Ok(())
    }

    fn abort(&self, err: CycleError) -> CycleError {
        warn!("Stopping all motion after failure: {}", err);
        self.motion.stop_all();
        if let Err(e) = self.motion.disable_drivers() {
            warn!("Failed to disable drivers: {}", e);
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_common::hal::driver::HalError;
    use gantry_hal::peripheral::SimulatedPeripherals;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Home,
        Move(i64, i64),
        Load(String),
        StopAll,
        Disable,
    }

    #[derive(Default)]
    struct FakeGantry {
        calls: Mutex<Vec<Call>>,
        records: HashMap<String, (i64, i64)>,
        fail_move: Option<(i64, i64)>,
    }

    impl FakeGantry {
        fn with_default(x: i64, y: i64) -> Self {
            let mut records = HashMap::new();
            records.insert("default".to_string(), (x, y));
            Self {
                records,
                ..Default::default()
            }
        }

        fn motion_calls(&self) -> Vec<Call> {
            self.calls
                .lock()
                .iter()
                .filter(|c| matches!(c, Call::Home | Call::Move(..)))
                .cloned()
                .collect()
        }
    }

    impl GantryMotion for FakeGantry {
        fn home(&self) -> Result<(), HomingError> {
            self.calls.lock().push(Call::Home);
            Ok(())
        }

        fn move_to(&self, dx: i64, dy: i64) -> Result<(), MotionError> {
            self.calls.lock().push(Call::Move(dx, dy));
            if self.fail_move == Some((dx, dy)) {
                return Err(MotionError::Aborted("endstop x pressed during move".to_string()));
            }
            Ok(())
        }

        fn load_calibration(&self, label: &str) -> Result<(i64, i64), CalibrationError> {
            self.calls.lock().push(Call::Load(label.to_string()));
            self.records
                .get(label)
                .copied()
                .ok_or_else(|| CalibrationError::NotFound(label.to_string()))
        }

        fn stop_all(&self) {
            self.calls.lock().push(Call::StopAll);
        }

        fn disable_drivers(&self) -> Result<(), MotionError> {
            self.calls.lock().push(Call::Disable);
            Ok(())
        }
    }

    fn orchestrator<'a>(
        gantry: &'a FakeGantry,
        peripherals: &SimulatedPeripherals,
        dir: &TempDir,
        config: WashConfig,
    ) -> WashCycleOrchestrator<'a, FakeGantry> {
        WashCycleOrchestrator::new(
            gantry,
            Box::new(peripherals.clone()),
            WorkCycleLog::new(dir.path().join("wash.jsonl")),
            config,
        )
    }

    #[test]
    fn full_cycle_order() {
        let dir = TempDir::new().unwrap();
        let gantry = FakeGantry::with_default(120, 80);
        let peripherals = SimulatedPeripherals::new();
        let wash = orchestrator(&gantry, &peripherals, &dir, WashConfig::default());

        let report = wash.run_cycle().unwrap();

        assert_eq!(
            gantry.motion_calls(),
            vec![
                Call::Home,
                Call::Move(0, 80),
                Call::Move(120, 0),
                Call::Move(-120, 0),
                Call::Home
            ]
        );
        assert_eq!(
            peripherals.history(),
            vec![
                PeripheralCommand::PumpSoap,
                PeripheralCommand::Rotate,
                PeripheralCommand::PumpWater
            ]
        );
        assert_eq!(report.steps.len(), 8);
        assert!(report.log_written);

        let entries = WorkCycleLog::new(dir.path().join("wash.jsonl")).entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].outcome, "completed");
    }

    #[test]
    fn park_position_is_visited_last() {
        let dir = TempDir::new().unwrap();
        let mut gantry = FakeGantry::with_default(10, 20);
        gantry.records.insert("house".to_string(), (5, 6));
        let peripherals = SimulatedPeripherals::new();
        let config = WashConfig {
            park_label: Some("house".to_string()),
            ..Default::default()
        };
        let wash = orchestrator(&gantry, &peripherals, &dir, config);

        wash.run_cycle().unwrap();
        assert_eq!(gantry.motion_calls().last(), Some(&Call::Move(5, 6)));
    }

    #[test]
    fn missing_calibration_aborts_before_motion() {
        let dir = TempDir::new().unwrap();
        let gantry = FakeGantry::default();
        let peripherals = SimulatedPeripherals::new();
        let wash = orchestrator(&gantry, &peripherals, &dir, WashConfig::default());

        let err = wash.run_cycle().unwrap_err();

        assert!(matches!(
            err,
            CycleError::Calibration(CalibrationError::NotFound(_))
        ));
        assert_eq!(*gantry.calls.lock(), vec![Call::Load("default".to_string())]);
        assert!(peripherals.history().is_empty());
        let entries = WorkCycleLog::new(dir.path().join("wash.jsonl")).entries().unwrap();
        assert!(entries[0].outcome.starts_with("aborted: "));
    }

    #[test]
    fn failed_move_stops_and_disables() {
        let dir = TempDir::new().unwrap();
        let mut gantry = FakeGantry::with_default(120, 80);
        gantry.fail_move = Some((120, 0));
        let peripherals = SimulatedPeripherals::new();
        let wash = orchestrator(&gantry, &peripherals, &dir, WashConfig::default());

        let err = wash.run_cycle().unwrap_err();

        assert!(matches!(err, CycleError::Motion(MotionError::Aborted(_))));
        let calls = gantry.calls.lock().clone();
        assert_eq!(&calls[calls.len() - 2..], &[Call::StopAll, Call::Disable]);
        assert_eq!(peripherals.history(), vec![PeripheralCommand::PumpSoap]);
        assert!(!wash.is_running());
    }

    #[test]
    fn peripheral_failure_aborts() {
        let dir = TempDir::new().unwrap();
        let gantry = FakeGantry::with_default(1, 1);
        let peripherals = SimulatedPeripherals::new();
        peripherals.fail_next();
        let wash = orchestrator(&gantry, &peripherals, &dir, WashConfig::default());

        let err = wash.run_cycle().unwrap_err();
        assert!(matches!(err, CycleError::Peripheral(HalError::CommunicationError(_))));
        assert!(gantry.calls.lock().contains(&Call::Disable));
    }

    #[test]
    fn log_failure_does_not_fail_cycle() {
        let dir = TempDir::new().unwrap();
        // A directory where the log file should be.
        std::fs::create_dir_all(dir.path().join("wash.jsonl")).unwrap();
        let gantry = FakeGantry::with_default(1, 1);
        let peripherals = SimulatedPeripherals::new();
        let wash = orchestrator(&gantry, &peripherals, &dir, WashConfig::default());

        let report = wash.run_cycle().unwrap();
        assert!(!report.log_written);
    }

    #[test]
    fn second_cycle_is_rejected_while_running() {
        let dir = TempDir::new().unwrap();
        let gantry = FakeGantry::with_default(1, 1);
        let peripherals = SimulatedPeripherals::new();
        let wash = orchestrator(&gantry, &peripherals, &dir, WashConfig::default());

        wash.busy.store(true, Ordering::SeqCst);
        assert!(matches!(wash.run_cycle(), Err(CycleError::AlreadyRunning)));
        assert!(gantry.calls.lock().is_empty());

        wash.busy.store(false, Ordering::SeqCst);
        assert!(wash.run_cycle().is_ok());
    }
}
