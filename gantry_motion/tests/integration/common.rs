//! Shared fixtures: a fast simulated rig and a recording driver.

use gantry_common::config::GantryConfig;
use gantry_common::hal::driver::{AxisDriver, HalError};
use gantry_common::hal::types::{Direction, StepMode};
use gantry_hal::drivers::simulation::SimulatedGantry;
use gantry_motion::MotionCoordinator;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Configuration with short debounce, back-off and step delay.
pub fn fast_config(dir: &TempDir) -> GantryConfig {
    let mut config = GantryConfig::default();
    for axis in [&mut config.machine.x, &mut config.machine.y] {
        axis.step_delay_us = 20;
        axis.endstop.debounce_ms = 1;
        axis.endstop.poll_interval_us = 200;
    }
    config.machine.simulation.start_offset_x = 300;
    config.machine.simulation.start_offset_y = 200;
    config.machine.simulation.overtravel_steps = 400;
    config.motion.idle_interval_ms = 2;
    config.motion.backoff_duration_ms = 60;
    config.motion.poll_interval_ms = 1;
    config.homing.timeout_ms = 5_000;
    config.homing.max_travel_steps = 20_000;
    config.storage.calibration_dir = dir.path().join("calibration");
    config.storage.cycle_log = dir.path().join("wash.jsonl");
    config
}

/// Simulated gantry with a running coordinator.
pub struct Rig {
    pub dir: TempDir,
    pub config: GantryConfig,
    pub gantry: SimulatedGantry,
    pub coordinator: MotionCoordinator,
}

impl Rig {
    pub fn start() -> Self {
        Self::start_with(|_| {})
    }

    pub fn start_with(tweak: impl FnOnce(&mut GantryConfig)) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = fast_config(&dir);
        tweak(&mut config);
        config.validate().unwrap();

        let gantry = SimulatedGantry::new(&config.machine);
        let hardware = gantry.hardware(&config.machine);
        let coordinator = MotionCoordinator::new(&config, hardware).unwrap();
        coordinator.start().unwrap();
        Self {
            dir,
            config,
            gantry,
            coordinator,
        }
    }
}

pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// Driver that records every burst and never fails.
pub struct RecordingDriver {
    pub bursts: Arc<Mutex<Vec<(Direction, u32)>>>,
    steps: u64,
    enabled: bool,
}

impl RecordingDriver {
    pub fn new() -> (Self, Arc<Mutex<Vec<(Direction, u32)>>>) {
        let bursts = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                bursts: Arc::clone(&bursts),
                steps: 0,
                enabled: false,
            },
            bursts,
        )
    }
}

impl AxisDriver for RecordingDriver {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn configure(&mut self, _mode: StepMode) -> Result<(), HalError> {
        Ok(())
    }

    fn step(&mut self, direction: Direction, count: u32) -> Result<(), HalError> {
        self.enabled = true;
        self.steps += u64::from(count);
        self.bursts.lock().push((direction, count));
        Ok(())
    }

    fn disable(&mut self) -> Result<(), HalError> {
        self.enabled = false;
        Ok(())
    }

    fn step_count(&self) -> u64 {
        self.steps
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
