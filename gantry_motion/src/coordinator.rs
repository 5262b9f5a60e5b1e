//! Motion coordinator.
//!
//! Owns the hardware of both axes, the shared motion state and the scheduler
//! thread, and exposes the operations used by the CLI and the wash cycle:
//!
//! | Operation                 | Blocking | Needs running scheduler |
//! |---------------------------|----------|-------------------------|
//! | `issue_intent` / `stop_*` | no       | no (takes effect on start) |
//! | `home`                    | yes      | yes                     |
//! | `move_to`                 | yes      | yes, and a completed `home` |
//! | `save_*` / `load_*`       | file I/O | no                      |
//!
//! Every operation takes `&self`; the coordinator can be shared between the
//! operator context and the wash-cycle sequencer.

use crate::calibration::{CalibrationRecord, CalibrationStore};
use crate::endstop::EndstopPhase;
use crate::error::{CalibrationError, HomingError, MotionError};
use crate::homing::HomingProtocol;
use crate::intent::TravelOutcome;
use crate::scheduler::{MotionScheduler, SchedulerRequest, SchedulerStats};
use crate::state::SharedMotionState;
use gantry_common::config::GantryConfig;
use gantry_common::consts::AXIS_COUNT;
use gantry_common::hal::driver::{EndstopSensor, HalError};
use gantry_common::hal::types::{Axis, Direction};
use gantry_common::motion::command::{IntentKind, MotionCommand, MotionIntent};
use gantry_hal::{DriverRegistry, Hardware};
use parking_lot::Mutex;
use serde::Serialize;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{error, info, warn};

/// Upper bound for a request served by the scheduler thread.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Observable state of one axis.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AxisStatus {
    /// Axis.
    pub axis: Axis,
    /// Position counter [steps].
    pub position: i64,
    /// Pending intent.
    pub intent: MotionIntent,
    /// Endstop phase.
    pub endstop: EndstopPhase,
    /// Physical switch level from the last edge.
    pub switch_closed: bool,
}

/// Snapshot returned by [`MotionCoordinator::status`].
#[derive(Debug, Clone, Serialize)]
pub struct MotionStatus {
    /// X and Y.
    pub axes: [AxisStatus; AXIS_COUNT],
    /// Whether the counters refer to the homed zero.
    pub referenced: bool,
    /// Whether the scheduler thread runs.
    pub running: bool,
    /// Back-offs started since bring-up.
    pub backoffs_started: u64,
    /// Back-offs finished since bring-up.
    pub backoffs_completed: u64,
    /// Scheduler tick statistics.
    pub scheduler: SchedulerStats,
}

/// Two-axis motion coordinator.
pub struct MotionCoordinator {
    shared: Arc<SharedMotionState>,
    scheduler: Mutex<Option<MotionScheduler>>,
    worker: Mutex<Option<JoinHandle<MotionScheduler>>>,
    endstops: Mutex<Vec<Box<dyn EndstopSensor>>>,
    calibration: CalibrationStore,
    homing: HomingProtocol,
    poll: Duration,
}

impl MotionCoordinator {
    /// Bring up the backend named in `[machine].driver` from the builtin
    /// registry.
    pub fn from_config(config: &GantryConfig) -> Result<Self, HalError> {
        let registry = DriverRegistry::with_builtin();
        let hardware = registry.create(&config.machine.driver, &config.machine)?;
        Self::new(config, hardware)
    }

    /// Configure the drivers, arm both endstops and build the scheduler.
    ///
    /// The scheduler is not started; call [`start`](Self::start).
    pub fn new(config: &GantryConfig, hardware: Hardware) -> Result<Self, HalError> {
        let limit: [Direction; AXIS_COUNT] =
            Axis::ALL.map(|axis| config.machine.axis(axis).limit_direction);
        let shared = Arc::new(SharedMotionState::new(limit, config.motion.backoff_duration()));

        let [x, y] = hardware.into_axes();
        let mut drivers = [x.driver, y.driver];
        let mut endstops = vec![x.endstop, y.endstop];

        for axis in Axis::ALL {
            let mode = config.machine.axis(axis).step_mode;
            drivers[axis.index()].configure(mode).map_err(|e| {
                HalError::InitFailed(format!("axis {axis}: {e}"))
            })?;

            let state = Arc::clone(&shared);
            endstops[axis.index()].on_edge(Box::new(move |edge| {
                state.on_edge(axis, edge);
            }))?;
        }

        let scheduler = MotionScheduler::new(
            Arc::clone(&shared),
            drivers,
            &config.machine,
            &config.motion,
        );
        info!(
            "Motion coordinator ready (backend '{}', burst {} steps)",
            config.machine.driver, config.motion.burst_steps
        );

        Ok(Self {
            shared,
            scheduler: Mutex::new(Some(scheduler)),
            worker: Mutex::new(None),
            endstops: Mutex::new(endstops),
            calibration: CalibrationStore::new(&config.storage.calibration_dir),
            homing: HomingProtocol::new(&config.homing, limit, config.motion.poll_interval()),
            poll: config.motion.poll_interval(),
        })
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    /// Spawn the scheduler thread. No-op if it already runs.
    pub fn start(&self) -> Result<(), MotionError> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }
        let scheduler = self.scheduler.lock().take().ok_or_else(|| {
            MotionError::Hal(HalError::InitFailed("scheduler unavailable".to_string()))
        })?;

        let running = self.shared.running_flag();
        running.store(true, Ordering::SeqCst);
        let handle = std::thread::Builder::new()
            .name("gantry-scheduler".to_string())
            .spawn(move || scheduler.run(&running))
            .map_err(|e| {
                self.shared.running_flag().store(false, Ordering::SeqCst);
                MotionError::Hal(HalError::InitFailed(format!("scheduler thread: {e}")))
            })?;
        *worker = Some(handle);
        Ok(())
    }

    /// Stop all motion, stop the scheduler thread and disable the drivers.
    ///
    /// The scheduler is kept, so `start()` may be called again.
    pub fn shutdown(&self) -> Result<(), MotionError> {
        self.shared.register.apply(MotionCommand::StopAll);
        self.shared.running_flag().store(false, Ordering::SeqCst);

        let Some(handle) = self.worker.lock().take() else {
            if let Some(scheduler) = self.scheduler.lock().as_mut() {
                scheduler.disable_all();
            }
            return Ok(());
        };
        match handle.join() {
            Ok(scheduler) => {
                *self.scheduler.lock() = Some(scheduler);
                info!("Motion coordinator shut down");
                Ok(())
            }
            Err(_) => {
                error!("Scheduler thread panicked");
                Err(MotionError::Hal(HalError::CommunicationError(
                    "scheduler thread panicked".to_string(),
                )))
            }
        }
    }

    /// Whether the scheduler thread runs.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Flag that keeps the scheduler loop alive.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.shared.running_flag()
    }

    /// Shared motion state.
    pub fn shared(&self) -> &Arc<SharedMotionState> {
        &self.shared
    }

    // ─── Intents ────────────────────────────────────────────────────

    /// Post an operator intent.
    pub fn issue_intent(&self, axis: Axis, kind: IntentKind) {
        self.shared.register.apply(kind.command(axis));
    }

    /// Clear the intent of one axis.
    pub fn stop_axis(&self, axis: Axis) {
        self.shared.register.apply(MotionCommand::StopAxis(axis));
    }

    /// Clear every intent. Effective within one tick.
    pub fn stop_all(&self) {
        self.shared.register.apply(MotionCommand::StopAll);
    }

    /// De-energise both drivers.
    pub fn disable_drivers(&self) -> Result<(), MotionError> {
        if self.shared.is_running() {
            if self
                .shared
                .submit_and_wait(SchedulerRequest::DisableDrivers, self.poll, REQUEST_TIMEOUT)
                || !self.shared.is_running()
            {
                // A scheduler that stopped meanwhile disabled on exit.
                return Ok(());
            }
            return Err(MotionError::Aborted(
                "scheduler did not serve the disable request".to_string(),
            ));
        }
        if let Some(scheduler) = self.scheduler.lock().as_mut() {
            scheduler.disable_all();
        }
        Ok(())
    }

    // ─── Blocking motion ────────────────────────────────────────────

    /// Home both axes. On failure all motion is stopped, the drivers are
    /// disabled and the position stays unknown.
    pub fn home(&self) -> Result<(), HomingError> {
        if !self.shared.is_running() {
            return Err(HomingError::NotRunning);
        }
        let result = self.homing.run(&self.shared);
        if let Err(e) = &result {
            error!("Homing failed: {}", e);
            self.stop_all();
            if let Err(e) = self.disable_drivers() {
                warn!("Failed to disable drivers after homing failure: {}", e);
            }
        }
        result
    }

    /// Move relative to the current position and block until both axes
    /// arrived.
    ///
    /// Fails with `MotionError::Aborted` if an endstop trips or the travel
    /// is cancelled; the position then reflects only the executed bursts.
    pub fn move_to(&self, dx: i64, dy: i64) -> Result<(), MotionError> {
        if !self.shared.is_running() {
            return Err(MotionError::NotRunning);
        }
        if !self.shared.is_referenced() {
            return Err(MotionError::NotReferenced);
        }
        if let Some(axis) = self.shared.endstops.any_pressed() {
            return Err(MotionError::Aborted(format!("endstop {axis} is pressed")));
        }

        self.shared.take_fault();
        let deltas = [dx, dy];
        let mut pending = [false; AXIS_COUNT];
        for axis in Axis::ALL {
            self.shared.register.take_travel_outcome(axis);
            let delta = deltas[axis.index()];
            if delta != 0 {
                pending[axis.index()] = true;
                self.shared.register.apply(MotionCommand::Travel(
                    axis,
                    Direction::of_delta(delta),
                    delta.unsigned_abs(),
                ));
            }
        }
        info!("Moving by ({}, {}) from {:?}", dx, dy, self.shared.positions());

        loop {
            if !self.shared.is_running() {
                self.stop_all();
                return Err(MotionError::NotRunning);
            }
            if let Some((axis, e)) = self.shared.take_fault() {
                self.stop_all();
                warn!("Move aborted, axis {} failed to step", axis);
                return Err(e.into());
            }
            // StopAll came from the edge handler; another one would halt the back-off.
            if let Some(axis) = self.shared.endstops.any_pressed() {
                return Err(self.endstop_abort(axis));
            }

            for axis in Axis::ALL {
                if !pending[axis.index()] {
                    continue;
                }
                match self.shared.register.take_travel_outcome(axis) {
                    Some(TravelOutcome::Completed) => pending[axis.index()] = false,
                    Some(TravelOutcome::Aborted { remaining }) => {
                        if let Some((_, e)) = self.shared.take_fault() {
                            self.stop_all();
                            return Err(e.into());
                        }
                        if let Some(pressed) = self.shared.endstops.any_pressed() {
                            return Err(self.endstop_abort(pressed));
                        }
                        self.stop_all();
                        return Err(MotionError::Aborted(format!(
                            "travel of axis {axis} cancelled with {remaining} steps left"
                        )));
                    }
                    None => {}
                }
            }
            if !pending.iter().any(|p| *p) {
                info!("Move complete at {:?}", self.shared.positions());
                return Ok(());
            }
            std::thread::sleep(self.poll);
        }
    }

    fn endstop_abort(&self, axis: Axis) -> MotionError {
        warn!("Move aborted, endstop {} pressed", axis);
        MotionError::Aborted(format!("endstop {axis} pressed during move"))
    }

    // ─── Calibration ────────────────────────────────────────────────

    /// Calibration store.
    pub fn calibration(&self) -> &CalibrationStore {
        &self.calibration
    }

    /// Persist `(x, y)` under `label`.
    pub fn save_calibration(&self, label: &str, x: i64, y: i64) -> io::Result<()> {
        self.calibration.save(label, x, y)
    }

    /// Read the record `label`.
    pub fn load_calibration(&self, label: &str) -> Result<(i64, i64), CalibrationError> {
        let CalibrationRecord { x, y, .. } = self.calibration.load(label)?;
        info!("Calibration '{}' loaded: x={} y={}", label, x, y);
        Ok((x, y))
    }

    /// Persist the live position counters under `label`.
    pub fn save_current_position(&self, label: &str) -> io::Result<(i64, i64)> {
        if !self.shared.is_referenced() {
            warn!("Saving '{}' while the axes are not referenced", label);
        }
        let [x, y] = self.shared.positions();
        self.calibration.save(label, x, y)?;
        Ok((x, y))
    }

    // ─── Status ─────────────────────────────────────────────────────

    /// Position counter of `axis`.
    pub fn position(&self, axis: Axis) -> i64 {
        self.shared.position(axis)
    }

    /// Whether the counters refer to the homed zero.
    pub fn is_referenced(&self) -> bool {
        self.shared.is_referenced()
    }

    /// Snapshot of positions, intents, endstops and statistics.
    pub fn status(&self) -> MotionStatus {
        let intents = self.shared.register.snapshot();
        MotionStatus {
            axes: Axis::ALL.map(|axis| AxisStatus {
                axis,
                position: self.shared.position(axis),
                intent: intents.intent(axis),
                endstop: self.shared.endstops.phase(axis),
                switch_closed: self.shared.endstops.is_switch_closed(axis),
            }),
            referenced: self.shared.is_referenced(),
            running: self.shared.is_running(),
            backoffs_started: self.shared.backoff.started(),
            backoffs_completed: self.shared.backoff.completed(),
            scheduler: self.shared.stats(),
        }
    }
}

impl Drop for MotionCoordinator {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("{}", e);
        }
        for endstop in self.endstops.lock().iter_mut() {
            if let Err(e) = endstop.close() {
                warn!("{}", e);
            }
        }
    }
}
