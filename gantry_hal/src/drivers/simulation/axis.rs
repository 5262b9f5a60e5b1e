//! Simulated stepper driver.

use super::gantry::SimulatedGantry;
use gantry_common::hal::config::AxisConfig;
use gantry_common::hal::driver::{AxisDriver, HalError};
use gantry_common::hal::types::{Axis, Direction, StepMode, StepModeControl};
use std::time::Duration;
use tracing::{debug, info};

/// `AxisDriver` moving one carriage of a [`SimulatedGantry`].
///
/// With a non-zero `step_delay_us` a burst takes as long as the real pulse
/// train would (two half periods per pulse).
pub struct SimulatedAxis {
    axis: Axis,
    gantry: SimulatedGantry,
    step_delay: Duration,
    control: StepModeControl,
    mode: StepMode,
    enabled: bool,
    steps: u64,
}

impl SimulatedAxis {
    /// Create the driver of `axis`.
    pub fn new(axis: Axis, gantry: SimulatedGantry, config: &AxisConfig) -> Self {
        Self {
            axis,
            gantry,
            step_delay: config.step_delay(),
            control: config.step_mode_control,
            mode: config.step_mode,
            enabled: false,
            steps: 0,
        }
    }

    /// Micro-step mode currently applied.
    pub fn mode(&self) -> StepMode {
        self.mode
    }
}

impl AxisDriver for SimulatedAxis {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn configure(&mut self, mode: StepMode) -> Result<(), HalError> {
        self.mode = mode;
        match self.control {
            StepModeControl::Software => {
                info!(
                    "Simulated axis {}: step mode {:?}, pins {:?}",
                    self.axis,
                    mode,
                    mode.mode_pins()
                );
            }
            StepModeControl::Hardware => {
                info!(
                    "Simulated axis {}: step mode {:?} set by board switches",
                    self.axis, mode
                );
            }
        }
        Ok(())
    }

    fn step(&mut self, direction: Direction, count: u32) -> Result<(), HalError> {
        if count == 0 {
            return Ok(());
        }
        if !self.enabled {
            debug!("Simulated axis {} enabled", self.axis);
            self.enabled = true;
        }
        if !self.step_delay.is_zero() {
            std::thread::sleep(self.step_delay * 2 * count);
        }
        self.gantry.apply(self.axis, direction, count)?;
        self.steps += u64::from(count);
        Ok(())
    }

    fn disable(&mut self) -> Result<(), HalError> {
        if self.enabled {
            debug!("Simulated axis {} disabled", self.axis);
        }
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
